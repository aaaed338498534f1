//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Engine and sanitizer produce:
//!     → tracing events (structured fields: keys, reasons, generations)
//!     → metrics.rs (round outcomes, rejected-key counters)
//!
//! Consumers:
//!     → Log aggregation (stdout via tracing-subscriber)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Metric updates are cheap counter increments; recording is safe from
//!   inside the engine's write-locked round
//! - Rejected keys are counted by rejection category, never by key name,
//!   to keep label cardinality bounded

pub mod metrics;
