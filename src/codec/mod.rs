//! Sensitive-value codec for stored configuration.
//!
//! # Responsibilities
//! - Reversibly encode secret values before they are persisted in the
//!   coordination store
//! - Refuse to encode a sensitive key at cluster-default scope: secrets are
//!   only persisted per instance
//!
//! # Design Decisions
//! - Base64 is an encoding, not encryption; stronger protection of stored
//!   secrets is the storage collaborator's concern
//! - Non-sensitive values pass through both directions untouched

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::errors::InvalidConfigError;
use crate::keys;

/// Encode one sensitive value for persistence.
pub fn encode_value(value: &str) -> String {
    STANDARD.encode(value.as_bytes())
}

/// Decode one stored sensitive value.
pub fn decode_value(key: &str, stored: &str) -> Result<String, InvalidConfigError> {
    let bytes = STANDARD
        .decode(stored)
        .map_err(|_| InvalidConfigError::UndecodableStoredValue { key: key.to_string() })?;
    String::from_utf8(bytes)
        .map_err(|_| InvalidConfigError::UndecodableStoredValue { key: key.to_string() })
}

/// Prepare `props` for persistence, encoding sensitive values.
///
/// Fails when a sensitive key is present and the target is not the
/// per-instance store: secrets cannot be defaulted cluster-wide.
pub fn encode_for_storage(
    props: &HashMap<String, String>,
    per_instance_scope: bool,
) -> Result<HashMap<String, String>, InvalidConfigError> {
    let mut stored = HashMap::with_capacity(props.len());
    for (key, value) in props {
        if keys::is_sensitive(key) {
            if !per_instance_scope {
                return Err(InvalidConfigError::SensitiveAtDefaultScope { key: key.clone() });
            }
            stored.insert(key.clone(), encode_value(value));
        } else {
            stored.insert(key.clone(), value.clone());
        }
    }
    Ok(stored)
}

/// Restore raw props from their stored form, decoding sensitive values.
pub fn decode_from_storage(
    stored: &HashMap<String, String>,
) -> Result<HashMap<String, String>, InvalidConfigError> {
    let mut props = HashMap::with_capacity(stored.len());
    for (key, value) in stored {
        if keys::is_sensitive(key) {
            props.insert(key.clone(), decode_value(key, value)?);
        } else {
            props.insert(key.clone(), value.clone());
        }
    }
    Ok(props)
}
