//! Error types for the dynamic reconfiguration engine.
//!
//! # Design Decisions
//! - Two kinds only: `InvalidConfigError` for rejectable input (bad values,
//!   wrong scope, failed cross-subsystem validation) and `ConfigurationError`
//!   for programming errors caught at registration time
//! - Every `InvalidConfigError` variant carries the offending keys or values
//!   so administrative callers can surface a precise rejection
//! - Notification-path callers log these errors and keep the prior state;
//!   admission-path callers propagate them to the administrator

use std::fmt;
use thiserror::Error;

/// Category under which the sanitizer rejected a key.
///
/// Categories are checked in declaration order; a key is rejected under the
/// first category that matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionReason {
    /// Key is not in the dynamically-updatable set.
    NotDynamic,
    /// Security-sensitive key supplied without a listener scope.
    SecurityWithoutScope,
    /// Per-instance-only key supplied in a cluster-default update.
    PerInstanceOnly,
    /// Value failed per-key schema validation.
    SchemaInvalid,
}

impl RejectionReason {
    /// Stable label used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::NotDynamic => "non_dynamic",
            RejectionReason::SecurityWithoutScope => "security_without_scope",
            RejectionReason::PerInstanceOnly => "per_instance_only",
            RejectionReason::SchemaInvalid => "schema_invalid",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A proposed configuration was rejected.
#[derive(Debug, Error)]
pub enum InvalidConfigError {
    /// One or more keys fell into a sanitizer rejection category.
    #[error("keys rejected ({reason}): {keys:?}")]
    RejectedKeys {
        reason: RejectionReason,
        keys: Vec<String>,
    },

    /// A single value failed schema validation.
    #[error("invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// A registered reconfigurable vetoed the candidate configuration.
    #[error("validation failed in '{member}': {message}")]
    MemberValidation { member: String, message: String },

    /// A pool resize request fell outside the bounded-change window.
    #[error(
        "resize of '{key}' from {current} to {requested} rejected: \
         new size must be positive and within [half, double] of the current size"
    )]
    ResizeOutOfBounds {
        key: String,
        current: usize,
        requested: i64,
    },

    /// A sensitive key may only be persisted at per-instance scope.
    #[error("sensitive key '{key}' may only be stored at per-instance scope")]
    SensitiveAtDefaultScope { key: String },

    /// A stored sensitive value could not be decoded.
    #[error("stored value for '{key}' is not a valid encoded secret")]
    UndecodableStoredValue { key: String },
}

/// A reconfigurable was registered for keys the engine does not recognize
/// as dynamically updatable. This is a wiring bug, not a runtime condition.
#[derive(Debug, Error)]
#[error("reconfigurable '{member}' declares non-dynamic keys: {keys:?}")]
pub struct ConfigurationError {
    pub member: String,
    pub keys: Vec<String>,
}
