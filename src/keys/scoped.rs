//! Listener-scoped key names.
//!
//! A scoped key restricts a setting to one named listener:
//! `listener.<listener-name>.<base-key>`. The base key may itself contain
//! dots, so only the first segment after the prefix names the listener.

/// Prefix that marks a key as listener-scoped.
pub const LISTENER_PREFIX: &str = "listener.";

/// A parsed listener-scoped key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedKey {
    /// Listener name the setting is restricted to.
    pub listener: String,
    /// The unscoped base key.
    pub base: String,
}

/// Parse `key` as a listener-scoped key, if it matches the pattern.
pub fn parse_scoped(key: &str) -> Option<ScopedKey> {
    let rest = key.strip_prefix(LISTENER_PREFIX)?;
    let (listener, base) = rest.split_once('.')?;
    if listener.is_empty() || base.is_empty() {
        return None;
    }
    Some(ScopedKey {
        listener: listener.to_string(),
        base: base.to_string(),
    })
}

/// Build the scoped form of `base` for `listener`.
pub fn scoped_key(listener: &str, base: &str) -> String {
    format!("{LISTENER_PREFIX}{listener}.{base}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scoped() {
        let scoped = parse_scoped("listener.INTERNAL.ssl.keystore.password").unwrap();
        assert_eq!(scoped.listener, "INTERNAL");
        assert_eq!(scoped.base, "ssl.keystore.password");
    }

    #[test]
    fn test_parse_rejects_non_scoped() {
        // "listeners" shares a prefix but is not a scoped key.
        assert!(parse_scoped("listeners").is_none());
        assert!(parse_scoped("log.retention.ms").is_none());
        assert!(parse_scoped("listener.").is_none());
        assert!(parse_scoped("listener.INTERNAL").is_none());
    }

    #[test]
    fn test_round_trip() {
        let key = scoped_key("EXTERNAL", "ssl.key.password");
        let scoped = parse_scoped(&key).unwrap();
        assert_eq!(scoped.listener, "EXTERNAL");
        assert_eq!(scoped.base, "ssl.key.password");
    }
}
