//! Registry of live reconfigurable subsystems.
//!
//! # Responsibilities
//! - Hold value-scoped and whole-config-scoped reconfigurables
//! - Validate at registration that every declared key is dynamic
//!
//! # Design Decisions
//! - Two collections, matching the two argument shapes: value-scoped
//!   members see resolved flat values, whole-config members see full typed
//!   before/after snapshots
//! - The listener-scope capability is an optional method on the
//!   value-scoped trait; dispatch branches on whether it is exposed
//! - Mutation happens under the engine's exclusive lock; the registry
//!   itself is plain data

use std::collections::HashSet;
use std::sync::Arc;

use crate::errors::{ConfigurationError, InvalidConfigError};
use crate::keys;
use crate::layers::Props;
use crate::schema::BrokerSettings;

/// A subsystem reacting to changes of a declared key set, observed as
/// resolved flat values.
pub trait Reconfigurable: Send + Sync {
    /// Stable name for logs and errors.
    fn name(&self) -> &str;

    /// The exact keys this member reacts to (unscoped base form).
    fn reconfigurable_keys(&self) -> HashSet<String>;

    /// Listener scope restricting this member's view, if any. A scoped
    /// member observes `listener.<scope>.<key>` shadowing the unscoped key.
    fn listener_scope(&self) -> Option<&str> {
        None
    }

    /// Veto or accept the candidate values for this member's keys.
    fn validate(&self, new_values: &Props) -> Result<(), InvalidConfigError>;

    /// Apply validated values. Failures are logged by the coordinator, not
    /// propagated to the update's caller.
    fn apply(&self, old_values: &Props, new_values: &Props) -> Result<(), InvalidConfigError>;
}

/// A subsystem needing cross-key context, observed as full typed snapshots.
pub trait WholeConfigReconfigurable: Send + Sync {
    fn name(&self) -> &str;

    fn reconfigurable_keys(&self) -> HashSet<String>;

    fn validate(&self, candidate: &BrokerSettings) -> Result<(), InvalidConfigError>;

    fn apply(
        &self,
        old: &BrokerSettings,
        new: &BrokerSettings,
    ) -> Result<(), InvalidConfigError>;
}

/// Holder for all registered reconfigurables.
#[derive(Default)]
pub struct Registry {
    value_scoped: Vec<Arc<dyn Reconfigurable>>,
    whole_config: Vec<Arc<dyn WholeConfigReconfigurable>>,
}

impl Registry {
    /// Register a value-scoped member.
    ///
    /// Fails when the member declares a key outside the dynamic set; that
    /// is a wiring bug surfaced at startup.
    pub fn register(&mut self, member: Arc<dyn Reconfigurable>) -> Result<(), ConfigurationError> {
        check_keys(member.name(), &member.reconfigurable_keys())?;
        self.value_scoped.push(member);
        Ok(())
    }

    /// Register a whole-config member. Whole-config members are wired once
    /// at startup and are not designed to be removed.
    pub fn register_whole_config(
        &mut self,
        member: Arc<dyn WholeConfigReconfigurable>,
    ) -> Result<(), ConfigurationError> {
        check_keys(member.name(), &member.reconfigurable_keys())?;
        self.whole_config.push(member);
        Ok(())
    }

    /// Remove a value-scoped member, matched by identity.
    pub fn unregister(&mut self, member: &Arc<dyn Reconfigurable>) {
        self.value_scoped.retain(|m| !Arc::ptr_eq(m, member));
    }

    pub fn value_scoped(&self) -> &[Arc<dyn Reconfigurable>] {
        &self.value_scoped
    }

    pub fn whole_config(&self) -> &[Arc<dyn WholeConfigReconfigurable>] {
        &self.whole_config
    }
}

fn check_keys(name: &str, declared: &HashSet<String>) -> Result<(), ConfigurationError> {
    let mut unknown: Vec<String> = declared
        .iter()
        .filter(|k| !keys::is_dynamic(k))
        .cloned()
        .collect();
    if unknown.is_empty() {
        Ok(())
    } else {
        unknown.sort();
        Err(ConfigurationError {
            member: name.to_string(),
            keys: unknown,
        })
    }
}
