//! Config key tables and key algebra.
//!
//! # Responsibilities
//! - Declare which keys are dynamically updatable, per-instance-only,
//!   static-only, or security-sensitive
//! - Resolve synonym groups (synonyms.rs)
//! - Parse listener-scoped key names (scoped.rs)
//!
//! # Design Decisions
//! - All key families are fixed declarative tables, built into lookup sets
//!   once at first use; no string matching is re-derived per call
//! - Scoped keys are dynamic iff their unscoped base key is dynamic
//! - Sensitivity is a property of the base key name (`*.password`), so a
//!   scoped password key is sensitive too

pub mod scoped;
pub mod synonyms;

use std::collections::HashSet;
use std::sync::OnceLock;

pub use scoped::{parse_scoped, scoped_key, ScopedKey};
pub use synonyms::synonyms_of;

/// Keys fixed for the process lifetime; never accepted dynamically.
pub const STATIC_ONLY_KEYS: &[&str] = &["node.id", "cluster.id", "log.dirs"];

/// Keys that identify one instance; rejected in cluster-default updates.
pub const PER_INSTANCE_ONLY_KEYS: &[&str] = &["listeners", "advertised.listeners"];

/// Security-sensitive family: dynamically updatable only in listener-scoped
/// form (`listener.<name>.<base>`).
pub const SECURITY_KEYS: &[&str] = &[
    "ssl.keystore.location",
    "ssl.keystore.password",
    "ssl.key.password",
    "ssl.truststore.location",
    "ssl.truststore.password",
];

/// Thread-pool sizing keys, consumed by whole-config reconfigurables.
pub const THREAD_POOL_KEYS: &[&str] = &[
    "num.network.threads",
    "num.io.threads",
    "background.threads",
];

/// Broker-level log configuration keys, consumed by the per-topic cascade.
pub const LOG_KEYS: &[&str] = &[
    "log.retention.ms",
    "log.retention.hours",
    "log.roll.ms",
    "log.roll.hours",
    "log.segment.bytes",
    "log.cleanup.policy",
    "message.max.bytes",
    "log.flush.interval.ms",
];

fn dynamic_set() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| {
        let mut set = HashSet::new();
        set.extend(THREAD_POOL_KEYS);
        set.extend(LOG_KEYS);
        set.extend(SECURITY_KEYS);
        set.extend(PER_INSTANCE_ONLY_KEYS);
        set
    })
}

/// Whether `key` (unscoped or listener-scoped) may change at runtime.
pub fn is_dynamic(key: &str) -> bool {
    match parse_scoped(key) {
        Some(scoped) => dynamic_set().contains(scoped.base.as_str()),
        None => dynamic_set().contains(key),
    }
}

/// Whether `key` belongs to the security-sensitive family, ignoring any
/// listener scope.
pub fn is_security_key(key: &str) -> bool {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    let set = SET.get_or_init(|| SECURITY_KEYS.iter().copied().collect());
    match parse_scoped(key) {
        Some(scoped) => set.contains(scoped.base.as_str()),
        None => set.contains(key),
    }
}

/// Whether `key` may only be set per instance, never as a cluster default.
pub fn is_per_instance_only(key: &str) -> bool {
    PER_INSTANCE_ONLY_KEYS.contains(&key)
}

/// Whether the value behind `key` is a secret that must be encoded at rest.
pub fn is_sensitive(key: &str) -> bool {
    let base = match parse_scoped(key) {
        Some(scoped) => scoped.base,
        None => key.to_string(),
    };
    base.ends_with(".password")
}
