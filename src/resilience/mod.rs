//! Resilience helpers.
//!
//! # Data Flow
//! ```text
//! Receipt polling (ChainClient::wait_for_receipt):
//!     → backoff.rs (exponential delay with jitter between polls)
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline (see blockchain::client)
//! - Jittered backoff keeps many waiters from polling in lockstep

pub mod backoff;
