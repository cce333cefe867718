//! Transaction lifecycle engine.
//!
//! # Data Flow
//! ```text
//! send(to, amount, speed)
//!     → builder.rs (validate recipient/amount, estimate gas, fee quote)
//!     → submitter.rs (nonce, sign, encode, broadcast)
//!     → ledger.rs (pending record persisted before returning)
//!     → monitor (settles pending records from receipts)
//! ```
//!
//! # Design Decisions
//! - Amounts are integer wei inside this module; `units.rs` converts at the
//!   edge
//! - Gas estimation failures keep their own error so callers can fall back
//!   to a manual gas limit
//! - Records are merged, never overwritten, and terminal statuses stick

pub mod builder;
pub mod ledger;
pub mod submitter;
pub mod types;
pub mod units;

pub use builder::{parse_address, quote_from_base_fee, total_cost, TransferBuilder};
pub use ledger::TransactionLedger;
pub use submitter::Submitter;
pub use types::{
    GasQuote, GasSpeed, GasTier, RecordUpdate, TransactionRecord, TransferRequest, TxStatus,
};
pub use units::{format_ether, parse_ether};
