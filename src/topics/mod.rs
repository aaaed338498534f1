//! Per-topic configuration cascade.
//!
//! # Data Flow
//! ```text
//! broker-level log.* values change
//!     → translate to topic-level default keys
//!     → for every live topic:
//!         effective = new cluster defaults ⊕ that topic's own overrides
//!     → push recomputed effective config to the topic
//! ```
//!
//! # Design Decisions
//! - A default change cascades into every dependent topic without
//!   clobbering topic-specific overrides
//! - Topic state lives in a concurrent map; topics are created and removed
//!   independently of reconfiguration rounds
//! - The hour form of retention is converted to milliseconds during
//!   translation, so topics only ever see `retention.ms`

use std::collections::HashSet;
use std::sync::RwLock;

use dashmap::DashMap;

use crate::errors::InvalidConfigError;
use crate::layers::Props;
use crate::registry::Reconfigurable;
use crate::schema;

const MS_PER_HOUR: i64 = 3_600_000;

/// Broker-level key and the per-topic key it defaults.
const TOPIC_KEY_MAP: &[(&str, &str)] = &[
    ("log.retention.ms", "retention.ms"),
    ("log.segment.bytes", "segment.bytes"),
    ("log.cleanup.policy", "cleanup.policy"),
    ("message.max.bytes", "max.message.bytes"),
    ("log.flush.interval.ms", "flush.ms"),
];

#[derive(Debug, Clone, Default)]
struct TopicState {
    /// This topic's own overrides, in topic-level key form.
    overrides: Props,
    /// Last pushed effective configuration.
    effective: Props,
}

/// Value-scoped reconfigurable cascading broker log defaults into every
/// live topic's effective configuration.
pub struct TopicConfigManager {
    defaults: RwLock<Props>,
    topics: DashMap<String, TopicState>,
}

impl TopicConfigManager {
    pub fn new() -> Self {
        Self {
            defaults: RwLock::new(Props::new()),
            topics: DashMap::new(),
        }
    }

    /// Track a topic with its own overrides (topic-level keys).
    pub fn create_topic(&self, name: impl Into<String>, overrides: Props) {
        let defaults = self.defaults.read().expect("topic defaults lock poisoned");
        let effective = merged(&defaults, &overrides);
        self.topics
            .insert(name.into(), TopicState { overrides, effective });
    }

    pub fn remove_topic(&self, name: &str) {
        self.topics.remove(name);
    }

    /// The effective configuration last pushed to `name`.
    pub fn effective_config(&self, name: &str) -> Option<Props> {
        self.topics.get(name).map(|state| state.effective.clone())
    }

    /// Translate broker-level values into topic-level default keys.
    fn topic_defaults(broker_values: &Props) -> Props {
        let mut defaults = Props::new();
        for (broker_key, topic_key) in TOPIC_KEY_MAP {
            if let Some(value) = broker_values.get(*broker_key) {
                defaults.insert((*topic_key).to_string(), value.clone());
            }
        }
        // Hour-form retention only contributes when the ms form is absent.
        if !defaults.contains_key("retention.ms") {
            if let Some(hours) = broker_values.get("log.retention.hours") {
                if let Ok(hours) = hours.parse::<i64>() {
                    let ms = if hours < 0 {
                        Some(-1)
                    } else {
                        hours.checked_mul(MS_PER_HOUR)
                    };
                    match ms {
                        Some(ms) => {
                            defaults.insert("retention.ms".to_string(), ms.to_string());
                        }
                        None => tracing::warn!(
                            hours,
                            "Dropping retention hours that overflow the millisecond range"
                        ),
                    }
                }
            }
        }
        defaults
    }

    fn recompute_all(&self, defaults: &Props) {
        for mut entry in self.topics.iter_mut() {
            entry.effective = merged(defaults, &entry.overrides);
        }
    }
}

fn merged(defaults: &Props, overrides: &Props) -> Props {
    let mut effective = defaults.clone();
    for (key, value) in overrides {
        effective.insert(key.clone(), value.clone());
    }
    effective
}

impl Default for TopicConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Reconfigurable for TopicConfigManager {
    fn name(&self) -> &str {
        "topic-config"
    }

    fn reconfigurable_keys(&self) -> HashSet<String> {
        TOPIC_KEY_MAP
            .iter()
            .map(|(broker_key, _)| (*broker_key).to_string())
            .chain(std::iter::once("log.retention.hours".to_string()))
            .collect()
    }

    fn validate(&self, new_values: &Props) -> Result<(), InvalidConfigError> {
        for (key, value) in new_values {
            schema::validate_value(key, value)?;
        }
        Ok(())
    }

    fn apply(&self, _old_values: &Props, new_values: &Props) -> Result<(), InvalidConfigError> {
        let defaults = Self::topic_defaults(new_values);
        {
            let mut stored = self.defaults.write().expect("topic defaults lock poisoned");
            *stored = defaults.clone();
        }
        self.recompute_all(&defaults);
        tracing::info!(
            defaults = defaults.len(),
            topics = self.topics.len(),
            "Cascaded log defaults into live topics"
        );
        Ok(())
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
    fn test_default_change_cascades_without_clobbering_overrides() {
        let manager = TopicConfigManager::new();
        manager.create_topic("events", props(&[("retention.ms", "1000")]));
        manager.create_topic("audit", Props::new());

        manager
            .apply(
                &Props::new(),
                &props(&[
                    ("log.retention.ms", "604800000"),
                    ("log.segment.bytes", "1048576"),
                ]),
            )
            .unwrap();

        let events = manager.effective_config("events").unwrap();
        // The topic's own override survives the new default.
        assert_eq!(events["retention.ms"], "1000");
        assert_eq!(events["segment.bytes"], "1048576");

        let audit = manager.effective_config("audit").unwrap();
        assert_eq!(audit["retention.ms"], "604800000");
    }

    #[test]
    fn test_hours_form_translated_to_ms() {
        let manager = TopicConfigManager::new();
        manager.create_topic("events", Props::new());

        manager
            .apply(&Props::new(), &props(&[("log.retention.hours", "24")]))
            .unwrap();

        let events = manager.effective_config("events").unwrap();
        assert_eq!(events["retention.ms"], (24 * MS_PER_HOUR).to_string());
    }

    #[test]
    fn test_overflowing_hours_dropped_from_defaults() {
        let manager = TopicConfigManager::new();
        manager.create_topic("events", Props::new());

        manager
            .apply(
                &Props::new(),
                &props(&[("log.retention.hours", "4000000000000")]),
            )
            .unwrap();

        let events = manager.effective_config("events").unwrap();
        assert!(!events.contains_key("retention.ms"));
    }

    #[test]
    fn test_new_topic_sees_current_defaults() {
        let manager = TopicConfigManager::new();
        manager
            .apply(&Props::new(), &props(&[("log.segment.bytes", "2048")]))
            .unwrap();

        manager.create_topic("late", Props::new());
        let late = manager.effective_config("late").unwrap();
        assert_eq!(late["segment.bytes"], "2048");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let manager = TopicConfigManager::new();
        assert!(manager
            .validate(&props(&[("log.segment.bytes", "tiny")]))
            .is_err());
        assert!(manager
            .validate(&props(&[("log.segment.bytes", "1048576")]))
            .is_ok());
    }
}
