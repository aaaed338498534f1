//! Dynamic broker reconfiguration engine.
//!
//! Resolves one effective configuration from layered sources, detects which
//! settings actually changed, and drives live subsystems through a
//! two-phase validate/apply protocol without restarting the process.

pub mod codec;
pub mod engine;
pub mod errors;
pub mod keys;
pub mod layers;
pub mod observability;
pub mod pools;
pub mod registry;
pub mod sanitize;
pub mod schema;
pub mod topics;
pub mod watcher;

pub use engine::{DynamicConfigEngine, EffectiveConfig, RecomputeMode};
pub use errors::{ConfigurationError, InvalidConfigError, RejectionReason};
pub use layers::{ConfigLayer, Props};
pub use registry::{Reconfigurable, WholeConfigReconfigurable};
pub use schema::BrokerSettings;
