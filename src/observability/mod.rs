//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters and gauges)
//!
//! Consumers:
//!     → stderr (pretty or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Fields over interpolated strings so logs stay machine-parseable
//! - Secrets never reach either sink; secret holders redact their `Debug`
//! - Metric updates are cheap no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
