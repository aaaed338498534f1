//! Layered configuration resolution.
//!
//! # Data Flow
//! ```text
//! STATIC (startup props, immutable)
//!     → override with DYNAMIC_DEFAULT (cluster-wide, mutable)
//!     → override with DYNAMIC_PER_INSTANCE (this node, mutable)
//!     → merged flat map (effective raw props)
//! ```
//!
//! # Design Decisions
//! - Overriding a key first purges every unscoped synonym of that key from
//!   the weaker layers, so the merged map never carries two members of a
//!   synonym group that disagree
//! - Synonym purging runs before any insert of the overriding layer, which
//!   makes the result independent of that layer's own iteration order
//! - Scoped variants are excluded from purging: a scoped override for one
//!   listener must not erase the unscoped base setting

use std::collections::HashMap;

use crate::keys::synonyms_of;

/// A flat string-keyed configuration map.
pub type Props = HashMap<String, String>;

/// Ranked configuration layers, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigLayer {
    /// Compiled-in defaults (live in `BrokerSettings::default`).
    Default,
    /// Process startup configuration, immutable for the process lifetime.
    Static,
    /// Cluster-wide dynamic override.
    DynamicDefault,
    /// Instance-specific dynamic override, highest precedence.
    DynamicPerInstance,
}

/// Merge the three runtime layers into one effective flat map.
pub fn merge(static_props: &Props, dynamic_default: &Props, dynamic_per_instance: &Props) -> Props {
    let mut merged = static_props.clone();
    apply_override(&mut merged, dynamic_default, ConfigLayer::DynamicDefault);
    apply_override(&mut merged, dynamic_per_instance, ConfigLayer::DynamicPerInstance);
    merged
}

fn apply_override(base: &mut Props, overrides: &Props, layer: ConfigLayer) {
    // Purge weaker-layer synonyms of every overriding key before inserting
    // anything, so same-layer synonym pairs cannot purge each other.
    for key in overrides.keys() {
        for synonym in synonyms_of(key, false) {
            if base.remove(&synonym).is_some() && synonym != *key {
                tracing::debug!(
                    key = %key,
                    purged = %synonym,
                    layer = ?layer,
                    "Synonym superseded by higher-precedence layer"
                );
            }
        }
    }
    for (key, value) in overrides {
        base.insert(key.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> Props {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_layer_precedence() {
        let merged = merge(
            &props(&[("log.segment.bytes", "1024"), ("message.max.bytes", "100000")]),
            &props(&[("log.segment.bytes", "2048")]),
            &props(&[("log.segment.bytes", "4096")]),
        );
        assert_eq!(merged["log.segment.bytes"], "4096");
        assert_eq!(merged["message.max.bytes"], "100000");
    }

    #[test]
    fn test_synonym_purged_across_layers() {
        // ms form in STATIC, hours form in DYNAMIC_DEFAULT: the hours form
        // wins and the ms form leaves no trace.
        let merged = merge(
            &props(&[("log.retention.ms", "1000")]),
            &props(&[("log.retention.hours", "24")]),
            &Props::new(),
        );
        assert_eq!(merged.get("log.retention.ms"), None);
        assert_eq!(merged["log.retention.hours"], "24");

        // A per-instance hours value supersedes the cluster default.
        let merged = merge(
            &props(&[("log.retention.ms", "1000")]),
            &props(&[("log.retention.hours", "24")]),
            &props(&[("log.retention.hours", "48")]),
        );
        assert_eq!(merged["log.retention.hours"], "48");
    }

    #[test]
    fn test_scoped_override_keeps_unscoped_base() {
        let merged = merge(
            &props(&[("ssl.keystore.location", "/etc/default.ks")]),
            &Props::new(),
            &props(&[("listener.INTERNAL.ssl.keystore.location", "/etc/internal.ks")]),
        );
        assert_eq!(merged["ssl.keystore.location"], "/etc/default.ks");
        assert_eq!(
            merged["listener.INTERNAL.ssl.keystore.location"],
            "/etc/internal.ks"
        );
    }

    #[test]
    fn test_same_layer_synonyms_both_survive_purge() {
        // Purging must not be sensitive to the overriding layer's own
        // iteration order: both group members land in the merged map.
        let merged = merge(
            &props(&[("log.retention.ms", "1000")]),
            &props(&[("log.retention.ms", "2000"), ("log.retention.hours", "1")]),
            &Props::new(),
        );
        assert_eq!(merged["log.retention.ms"], "2000");
        assert_eq!(merged["log.retention.hours"], "1");
    }
}
