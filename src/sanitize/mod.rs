//! Sanitizer for proposed dynamic configuration.
//!
//! # Responsibilities
//! - Filter a proposed flat map down to dynamically-updatable,
//!   correctly-scoped, schema-valid entries
//! - Report exactly what was rejected and under which category
//!
//! # Design Decisions
//! - Rejection categories run in a fixed order (non-dynamic → unscoped
//!   security → per-instance-only at default scope → schema-invalid), each
//!   removing its keys before the next check runs
//! - Schema validation is attempted in bulk first and retried key-by-key on
//!   failure, so one bad key never discards an otherwise-valid batch
//! - Two modes share the categorization: `sanitize` degrades gracefully
//!   (drop and log, for values recovered from storage) while
//!   `validate_for_apply` fails loudly (for explicit update requests)

use tracing::warn;

use crate::errors::{InvalidConfigError, RejectionReason};
use crate::keys;
use crate::layers::Props;
use crate::observability::metrics;
use crate::schema;

/// One rejected key and the category it fell into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub key: String,
    pub reason: RejectionReason,
}

/// Result of sanitizing a proposed map.
#[derive(Debug, Default)]
pub struct SanitizeOutcome {
    pub cleaned: Props,
    pub rejections: Vec<Rejection>,
}

/// Sanitize `candidate` in ignore mode: invalid entries are dropped,
/// logged, and counted, never raised.
pub fn sanitize(candidate: &Props, per_instance_scope: bool) -> SanitizeOutcome {
    let outcome = categorize(candidate, per_instance_scope);
    for rejection in &outcome.rejections {
        warn!(
            key = %rejection.key,
            reason = %rejection.reason,
            "Dropping rejected dynamic config key"
        );
        metrics::record_rejected_key(rejection.reason);
    }
    outcome
}

/// Strict-mode sanitization for the admission path: fails with
/// `InvalidConfigError` when any rejection category is non-empty.
pub fn validate_for_apply(
    candidate: &Props,
    per_instance_scope: bool,
) -> Result<(), InvalidConfigError> {
    let outcome = categorize(candidate, per_instance_scope);
    if let Some(first) = outcome.rejections.first() {
        let reason = first.reason;
        let keys = outcome
            .rejections
            .iter()
            .filter(|r| r.reason == reason)
            .map(|r| r.key.clone())
            .collect();
        return Err(InvalidConfigError::RejectedKeys { reason, keys });
    }
    Ok(())
}

fn categorize(candidate: &Props, per_instance_scope: bool) -> SanitizeOutcome {
    let mut cleaned = candidate.clone();
    let mut rejections = Vec::new();

    let mut reject_if = |cleaned: &mut Props, reason: RejectionReason, pred: &dyn Fn(&str) -> bool| {
        let rejected: Vec<String> = cleaned.keys().filter(|k| pred(k.as_str())).cloned().collect();
        for key in rejected {
            cleaned.remove(&key);
            rejections.push(Rejection { key, reason });
        }
    };

    // 1. Non-dynamic keys are never updatable.
    reject_if(&mut cleaned, RejectionReason::NotDynamic, &|k| {
        !keys::is_dynamic(k)
    });

    // 2. Security-sensitive keys must carry a listener scope.
    reject_if(&mut cleaned, RejectionReason::SecurityWithoutScope, &|k| {
        keys::is_security_key(k) && keys::parse_scoped(k).is_none()
    });

    // 3. Instance-identifying keys cannot be defaulted cluster-wide.
    if !per_instance_scope {
        reject_if(&mut cleaned, RejectionReason::PerInstanceOnly, &|k| {
            keys::is_per_instance_only(k) || keys::parse_scoped(k).is_some()
        });
    }

    // 4. Schema validation: bulk first, per-key retry on failure.
    if schema::validate_props(&cleaned).is_err() {
        let invalid: Vec<String> = cleaned
            .iter()
            .filter(|(k, v)| schema::validate_value(k.as_str(), v.as_str()).is_err())
            .map(|(k, _)| k.clone())
            .collect();
        for key in invalid {
            cleaned.remove(&key);
            rejections.push(Rejection {
                key,
                reason: RejectionReason::SchemaInvalid,
            });
        }
    }

    SanitizeOutcome { cleaned, rejections }
}
