//! Synonym groups: key names denoting the same logical setting at
//! different units or precedence.
//!
//! # Design Decisions
//! - Groups are a fixed declarative table; the key-to-group index is built
//!   once and reused for every lookup
//! - The first member of a group is the most authoritative form (the
//!   millisecond form wins over the coarser hour form)
//! - `synonyms_of` is total: unknown keys resolve to themselves

use std::collections::HashMap;
use std::sync::OnceLock;

use super::scoped::parse_scoped;

/// Declarative synonym groups, most authoritative form first.
const SYNONYM_GROUPS: &[&[&str]] = &[
    &["log.retention.ms", "log.retention.hours"],
    &["log.roll.ms", "log.roll.hours"],
];

fn group_index() -> &'static HashMap<&'static str, &'static [&'static str]> {
    static INDEX: OnceLock<HashMap<&'static str, &'static [&'static str]>> = OnceLock::new();
    INDEX.get_or_init(|| {
        let mut index = HashMap::new();
        for group in SYNONYM_GROUPS {
            for key in *group {
                index.insert(*key, *group);
            }
        }
        index
    })
}

/// Ordered list of keys equivalent to `key`, most authoritative first.
///
/// When `include_scoped_variant` is true and `key` is listener-scoped, the
/// result also contains the unscoped base key (and its synonyms), so a
/// scoped setting can shadow its unscoped counterpart.
pub fn synonyms_of(key: &str, include_scoped_variant: bool) -> Vec<String> {
    if let Some(group) = group_index().get(key) {
        return group.iter().map(|k| (*k).to_string()).collect();
    }
    if include_scoped_variant {
        if let Some(scoped) = parse_scoped(key) {
            let mut result = vec![key.to_string()];
            match group_index().get(scoped.base.as_str()) {
                Some(group) => result.extend(group.iter().map(|k| (*k).to_string())),
                None => result.push(scoped.base),
            }
            return result;
        }
    }
    vec![key.to_string()]
}
