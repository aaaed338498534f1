//! Configuration schema: per-key types and the typed broker snapshot.
//!
//! # Responsibilities
//! - Validate a single key/value pair against the fixed schema
//! - Build a fully-typed `BrokerSettings` snapshot from a merged flat map
//!
//! # Design Decisions
//! - Scoped keys are validated against their unscoped base key's schema
//! - Unknown keys are ignored during the typed build (they belong to
//!   value-scoped consumers) but fail explicit per-key validation
//! - The millisecond form of a synonym group is authoritative; the hour
//!   form is converted only when the millisecond form is absent

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::Serialize;

use crate::errors::InvalidConfigError;
use crate::keys::parse_scoped;

const MS_PER_HOUR: i64 = 3_600_000;

/// Value type of a configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigType {
    Int,
    Long,
    Bool,
    Str,
    List,
    Password,
}

/// Schema entry for one key.
#[derive(Debug, Clone, Copy)]
pub struct KeySchema {
    pub config_type: ConfigType,
    /// Lower bound for numeric types.
    pub min: Option<i64>,
    /// Allowed values (or list elements); empty means unconstrained.
    pub allowed: &'static [&'static str],
}

const fn numeric(config_type: ConfigType, min: i64) -> KeySchema {
    KeySchema {
        config_type,
        min: Some(min),
        allowed: &[],
    }
}

const fn plain(config_type: ConfigType) -> KeySchema {
    KeySchema {
        config_type,
        min: None,
        allowed: &[],
    }
}

fn schema_table() -> &'static HashMap<&'static str, KeySchema> {
    static TABLE: OnceLock<HashMap<&'static str, KeySchema>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = HashMap::new();
        table.insert("num.network.threads", numeric(ConfigType::Int, 1));
        table.insert("num.io.threads", numeric(ConfigType::Int, 1));
        table.insert("background.threads", numeric(ConfigType::Int, 1));
        // -1 means unlimited retention.
        table.insert("log.retention.ms", numeric(ConfigType::Long, -1));
        table.insert("log.retention.hours", numeric(ConfigType::Int, -1));
        table.insert("log.roll.ms", numeric(ConfigType::Long, 1));
        table.insert("log.roll.hours", numeric(ConfigType::Int, 1));
        table.insert("log.segment.bytes", numeric(ConfigType::Long, 1024));
        table.insert(
            "log.cleanup.policy",
            KeySchema {
                config_type: ConfigType::List,
                min: None,
                allowed: &["delete", "compact"],
            },
        );
        table.insert("message.max.bytes", numeric(ConfigType::Int, 0));
        table.insert("log.flush.interval.ms", numeric(ConfigType::Long, 0));
        table.insert("listeners", plain(ConfigType::List));
        table.insert("advertised.listeners", plain(ConfigType::List));
        table.insert("node.id", numeric(ConfigType::Int, 0));
        table.insert("cluster.id", plain(ConfigType::Str));
        table.insert("log.dirs", plain(ConfigType::List));
        table.insert("ssl.keystore.location", plain(ConfigType::Str));
        table.insert("ssl.keystore.password", plain(ConfigType::Password));
        table.insert("ssl.key.password", plain(ConfigType::Password));
        table.insert("ssl.truststore.location", plain(ConfigType::Str));
        table.insert("ssl.truststore.password", plain(ConfigType::Password));
        table
    })
}

/// Look up the schema for `key`, translating scoped keys to their base.
pub fn schema_of(key: &str) -> Option<KeySchema> {
    let base = match parse_scoped(key) {
        Some(scoped) => scoped.base,
        None => key.to_string(),
    };
    schema_table().get(base.as_str()).copied()
}

/// Validate one key/value pair in isolation.
pub fn validate_value(key: &str, value: &str) -> Result<(), InvalidConfigError> {
    let schema = schema_of(key).ok_or_else(|| InvalidConfigError::InvalidValue {
        key: key.to_string(),
        message: "unknown configuration key".to_string(),
    })?;

    let invalid = |message: String| InvalidConfigError::InvalidValue {
        key: key.to_string(),
        message,
    };

    match schema.config_type {
        ConfigType::Int | ConfigType::Long => {
            let parsed: i64 = value
                .parse()
                .map_err(|_| invalid(format!("'{value}' is not an integer")))?;
            if let Some(min) = schema.min {
                if parsed < min {
                    return Err(invalid(format!("{parsed} is below the minimum {min}")));
                }
            }
        }
        ConfigType::Bool => {
            value
                .parse::<bool>()
                .map_err(|_| invalid(format!("'{value}' is not a boolean")))?;
        }
        ConfigType::Str | ConfigType::Password => {
            if !schema.allowed.is_empty() && !schema.allowed.contains(&value) {
                return Err(invalid(format!(
                    "'{value}' is not one of {:?}",
                    schema.allowed
                )));
            }
        }
        ConfigType::List => {
            for element in value.split(',').map(str::trim) {
                if element.is_empty() {
                    return Err(invalid("empty list element".to_string()));
                }
                if !schema.allowed.is_empty() && !schema.allowed.contains(&element) {
                    return Err(invalid(format!(
                        "'{element}' is not one of {:?}",
                        schema.allowed
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Validate a whole flat map; fails on the first invalid entry.
pub fn validate_props(props: &HashMap<String, String>) -> Result<(), InvalidConfigError> {
    for (key, value) in props {
        validate_value(key, value)?;
    }
    Ok(())
}

/// The fully-typed configuration snapshot built from a merged flat map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrokerSettings {
    pub network_threads: usize,
    pub io_threads: usize,
    pub background_threads: usize,
    pub log_retention_ms: i64,
    pub log_roll_ms: i64,
    pub log_segment_bytes: i64,
    pub log_cleanup_policy: String,
    pub message_max_bytes: i64,
    pub log_flush_interval_ms: i64,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            network_threads: 3,
            io_threads: 8,
            background_threads: 10,
            log_retention_ms: 7 * 24 * MS_PER_HOUR,
            log_roll_ms: 7 * 24 * MS_PER_HOUR,
            log_segment_bytes: 1024 * 1024 * 1024,
            log_cleanup_policy: "delete".to_string(),
            message_max_bytes: 1024 * 1024,
            log_flush_interval_ms: i64::MAX,
        }
    }
}

impl BrokerSettings {
    /// Build the typed snapshot from merged raw props.
    ///
    /// Values for known keys are parsed and range-checked; any failure
    /// invalidates the whole candidate.
    pub fn from_props(props: &HashMap<String, String>) -> Result<Self, InvalidConfigError> {
        let defaults = Self::default();
        Ok(Self {
            network_threads: parse_long(props, "num.network.threads")?
                .unwrap_or(defaults.network_threads as i64) as usize,
            io_threads: parse_long(props, "num.io.threads")?
                .unwrap_or(defaults.io_threads as i64) as usize,
            background_threads: parse_long(props, "background.threads")?
                .unwrap_or(defaults.background_threads as i64) as usize,
            log_retention_ms: ms_or_hours(
                props,
                "log.retention.ms",
                "log.retention.hours",
                defaults.log_retention_ms,
            )?,
            log_roll_ms: ms_or_hours(props, "log.roll.ms", "log.roll.hours", defaults.log_roll_ms)?,
            log_segment_bytes: parse_long(props, "log.segment.bytes")?
                .unwrap_or(defaults.log_segment_bytes),
            log_cleanup_policy: match props.get("log.cleanup.policy") {
                Some(policy) => {
                    validate_value("log.cleanup.policy", policy)?;
                    policy.clone()
                }
                None => defaults.log_cleanup_policy,
            },
            message_max_bytes: parse_long(props, "message.max.bytes")?
                .unwrap_or(defaults.message_max_bytes),
            log_flush_interval_ms: parse_long(props, "log.flush.interval.ms")?
                .unwrap_or(defaults.log_flush_interval_ms),
        })
    }
}

fn parse_long(
    props: &HashMap<String, String>,
    key: &str,
) -> Result<Option<i64>, InvalidConfigError> {
    match props.get(key) {
        Some(value) => {
            validate_value(key, value)?;
            // validate_value already proved this parses.
            Ok(Some(value.parse().map_err(|_| {
                InvalidConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("'{value}' is not an integer"),
                }
            })?))
        }
        None => Ok(None),
    }
}

/// Resolve a ms/hours synonym pair, preferring the millisecond form.
fn ms_or_hours(
    props: &HashMap<String, String>,
    ms_key: &str,
    hours_key: &str,
    default: i64,
) -> Result<i64, InvalidConfigError> {
    if let Some(ms) = parse_long(props, ms_key)? {
        return Ok(ms);
    }
    if let Some(hours) = parse_long(props, hours_key)? {
        if hours < 0 {
            return Ok(-1);
        }
        return hours
            .checked_mul(MS_PER_HOUR)
            .ok_or_else(|| InvalidConfigError::InvalidValue {
                key: hours_key.to_string(),
                message: format!("{hours} hours overflows the millisecond range"),
            });
    }
    Ok(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_value_types() {
        assert!(validate_value("num.io.threads", "8").is_ok());
        assert!(validate_value("num.io.threads", "0").is_err());
        assert!(validate_value("num.io.threads", "many").is_err());
        assert!(validate_value("log.cleanup.policy", "compact,delete").is_ok());
        assert!(validate_value("log.cleanup.policy", "shred").is_err());
        assert!(validate_value("no.such.key", "1").is_err());
    }

    #[test]
    fn test_scoped_key_uses_base_schema() {
        assert!(validate_value("listener.INTERNAL.ssl.keystore.location", "/etc/ks").is_ok());
        assert!(validate_value("listener.INTERNAL.bogus.key", "x").is_err());
    }

    #[test]
    fn test_from_props_prefers_ms_over_hours() {
        let mut props = HashMap::new();
        props.insert("log.retention.ms".to_string(), "1000".to_string());
        props.insert("log.retention.hours".to_string(), "24".to_string());
        let settings = BrokerSettings::from_props(&props).unwrap();
        assert_eq!(settings.log_retention_ms, 1000);
    }

    #[test]
    fn test_from_props_converts_hours() {
        let mut props = HashMap::new();
        props.insert("log.retention.hours".to_string(), "24".to_string());
        let settings = BrokerSettings::from_props(&props).unwrap();
        assert_eq!(settings.log_retention_ms, 24 * MS_PER_HOUR);
    }

    #[test]
    fn test_from_props_rejects_hours_overflowing_ms_range() {
        let mut props = HashMap::new();
        props.insert(
            "log.retention.hours".to_string(),
            "4000000000000".to_string(),
        );
        let err = BrokerSettings::from_props(&props).unwrap_err();
        assert!(matches!(
            err,
            InvalidConfigError::InvalidValue { ref key, .. } if key == "log.retention.hours"
        ));
    }

    #[test]
    fn test_from_props_rejects_bad_value() {
        let mut props = HashMap::new();
        props.insert("num.network.threads".to_string(), "-2".to_string());
        assert!(BrokerSettings::from_props(&props).is_err());
    }

    #[test]
    fn test_from_props_ignores_unknown_and_scoped_keys() {
        let mut props = HashMap::new();
        props.insert("some.plugin.key".to_string(), "x".to_string());
        props.insert(
            "listener.INTERNAL.ssl.keystore.location".to_string(),
            "/etc/ks".to_string(),
        );
        let settings = BrokerSettings::from_props(&props).unwrap();
        assert_eq!(settings, BrokerSettings::default());
    }
}
