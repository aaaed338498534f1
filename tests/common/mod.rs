//! Shared helpers: programmable fake reconfigurables.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use broker_reconfig::errors::InvalidConfigError;
use broker_reconfig::layers::Props;
use broker_reconfig::registry::{Reconfigurable, WholeConfigReconfigurable};
use broker_reconfig::schema::BrokerSettings;

/// Value-scoped fake recording every validate/apply call.
pub struct RecordingReconfigurable {
    name: String,
    keys: Vec<String>,
    scope: Option<String>,
    pub fail_validation: AtomicBool,
    pub fail_apply: AtomicBool,
    pub validate_calls: AtomicU32,
    pub apply_calls: AtomicU32,
    pub last_applied: Mutex<Option<(Props, Props)>>,
}

impl RecordingReconfigurable {
    pub fn new(name: &str, keys: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            keys: keys.iter().map(|k| k.to_string()).collect(),
            scope: None,
            fail_validation: AtomicBool::new(false),
            fail_apply: AtomicBool::new(false),
            validate_calls: AtomicU32::new(0),
            apply_calls: AtomicU32::new(0),
            last_applied: Mutex::new(None),
        })
    }

    pub fn with_scope(name: &str, scope: &str, keys: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            keys: keys.iter().map(|k| k.to_string()).collect(),
            scope: Some(scope.to_string()),
            fail_validation: AtomicBool::new(false),
            fail_apply: AtomicBool::new(false),
            validate_calls: AtomicU32::new(0),
            apply_calls: AtomicU32::new(0),
            last_applied: Mutex::new(None),
        })
    }

    pub fn validate_count(&self) -> u32 {
        self.validate_calls.load(Ordering::SeqCst)
    }

    pub fn apply_count(&self) -> u32 {
        self.apply_calls.load(Ordering::SeqCst)
    }

    pub fn last_applied_new(&self) -> Option<Props> {
        self.last_applied
            .lock()
            .unwrap()
            .as_ref()
            .map(|(_, new)| new.clone())
    }
}

impl Reconfigurable for RecordingReconfigurable {
    fn name(&self) -> &str {
        &self.name
    }

    fn reconfigurable_keys(&self) -> HashSet<String> {
        self.keys.iter().cloned().collect()
    }

    fn listener_scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    fn validate(&self, _new_values: &Props) -> Result<(), InvalidConfigError> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_validation.load(Ordering::SeqCst) {
            return Err(InvalidConfigError::InvalidValue {
                key: self.keys[0].clone(),
                message: "vetoed by test member".to_string(),
            });
        }
        Ok(())
    }

    fn apply(&self, old_values: &Props, new_values: &Props) -> Result<(), InvalidConfigError> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_applied.lock().unwrap() = Some((old_values.clone(), new_values.clone()));
        if self.fail_apply.load(Ordering::SeqCst) {
            return Err(InvalidConfigError::InvalidValue {
                key: self.keys[0].clone(),
                message: "apply failed in test member".to_string(),
            });
        }
        Ok(())
    }
}

/// Whole-config fake recording snapshots it was applied with.
pub struct RecordingWholeConfig {
    name: String,
    keys: Vec<String>,
    pub fail_validation: AtomicBool,
    pub validate_calls: AtomicU32,
    pub apply_calls: AtomicU32,
    pub last_applied: Mutex<Option<(BrokerSettings, BrokerSettings)>>,
}

impl RecordingWholeConfig {
    pub fn new(name: &str, keys: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            keys: keys.iter().map(|k| k.to_string()).collect(),
            fail_validation: AtomicBool::new(false),
            validate_calls: AtomicU32::new(0),
            apply_calls: AtomicU32::new(0),
            last_applied: Mutex::new(None),
        })
    }

    pub fn validate_count(&self) -> u32 {
        self.validate_calls.load(Ordering::SeqCst)
    }

    pub fn apply_count(&self) -> u32 {
        self.apply_calls.load(Ordering::SeqCst)
    }
}

impl WholeConfigReconfigurable for RecordingWholeConfig {
    fn name(&self) -> &str {
        &self.name
    }

    fn reconfigurable_keys(&self) -> HashSet<String> {
        self.keys.iter().cloned().collect()
    }

    fn validate(&self, _candidate: &BrokerSettings) -> Result<(), InvalidConfigError> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_validation.load(Ordering::SeqCst) {
            return Err(InvalidConfigError::InvalidValue {
                key: self.keys[0].clone(),
                message: "vetoed by test member".to_string(),
            });
        }
        Ok(())
    }

    fn apply(
        &self,
        old: &BrokerSettings,
        new: &BrokerSettings,
    ) -> Result<(), InvalidConfigError> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_applied.lock().unwrap() = Some((old.clone(), new.clone()));
        Ok(())
    }
}

/// Flat props literal.
pub fn props(pairs: &[(&str, &str)]) -> Props {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
