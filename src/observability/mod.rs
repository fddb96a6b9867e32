//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, the operational channel)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout / stderr (log aggregation)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Log lines never carry the secret or sensitive header values
//! - Metrics are cheap (atomic increments) and off by default

pub mod logging;
pub mod metrics;
