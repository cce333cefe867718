//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Stop signalling (shutdown.rs):
//!     owner calls trigger() → every subscribed task's recv() resolves
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → CLI stops the status monitor and exits
//! ```
//!
//! # Design Decisions
//! - Background tasks select on their stop receiver next to their work
//! - Triggering never waits for a task to finish

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
