//! Status monitor.
//!
//! # Data Flow
//! ```text
//! interval tick / check_one(hash)
//!     → ledger.pending()
//!     → ChainClient::get_receipt (one record at a time)
//!     → ledger.apply_receipt (pending → success | failed, once)
//!     → events.rs: StatusChange(record, old_status)
//!                  BalanceUpdate(record)   (success only)
//! ```
//!
//! # Design Decisions
//! - Start/stop are idempotent; stop never waits on an in-flight tick
//! - A generation counter keeps a stale tick from acting after stop
//! - Per-record and per-subscriber failures are logged, never propagated

pub mod events;
pub mod status;

pub use events::{Callback, EventKind, MonitorEvent, SubscriberError, SubscriptionId};
pub use status::StatusMonitor;
