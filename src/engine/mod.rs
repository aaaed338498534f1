//! Reconfiguration coordinator: the two-phase validate/apply engine.
//!
//! # Data Flow
//! ```text
//! update notification / admin request (raw flat map)
//!     → sanitize (ignore or strict mode)
//!     → replace the targeted dynamic layer wholesale
//!     → merge layers (synonym-precedence removal)
//!     → build typed candidate snapshot
//!     → diff against current effective props
//!     → dispatch list: members whose view of the diff is non-empty
//!     → validate pass (all members, abort-all on any failure)
//!     → apply pass (best effort per member)
//!     → atomic commit of the new effective configuration
//! ```
//!
//! # Round States
//! ```text
//! IDLE → MERGING → DIFFING → (empty diff: IDLE, unchanged)
//!      → VALIDATING → (reject: IDLE, unchanged)
//!      → APPLYING → COMMITTED → IDLE
//! ```
//! There is no partial-commit state: either the round aborts before any
//! apply call, or every dispatched member is asked to apply before commit.
//!
//! # Design Decisions
//! - One readers-writer lock guards the dynamic layers, the current
//!   effective configuration, and the registry; the whole round runs under
//!   the write lock, so at most one round's validate/apply dispatch is ever
//!   in flight
//! - `validate`/`apply` calls into members run while the write lock is
//!   held: a slow or hanging member stalls all configuration reads until
//!   the round finishes. Accepted trade-off, correctness over liveness;
//!   there is no timeout or cancellation of an in-progress round
//! - The effective configuration is never mutated in place; commit swaps
//!   the `Arc`, so readers holding a snapshot keep a consistent view
//! - Notification-path failures are logged and leave the prior state in
//!   force; admission-path failures propagate to the caller

use std::sync::{Arc, RwLock};

use tracing::{debug, error, info};

use crate::codec;
use crate::errors::{ConfigurationError, InvalidConfigError};
use crate::keys::scoped_key;
use crate::layers::{self, Props};
use crate::observability::metrics;
use crate::registry::{Reconfigurable, Registry, WholeConfigReconfigurable};
use crate::sanitize;
use crate::schema::BrokerSettings;

/// Whether a round stops after validation or commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecomputeMode {
    /// Run merge, diff, and the full validation pass, then discard the
    /// candidate. Used by the admission path; never mutates state.
    ValidateOnly,
    /// Validate, apply, and commit the candidate.
    Commit,
}

/// The merged, typed configuration currently in force.
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    /// Merged raw props (layer-originated values, not compiled defaults).
    pub props: Props,
    /// Typed snapshot built from `props`.
    pub settings: BrokerSettings,
    /// Monotonic commit counter, bumped on every successful round.
    pub generation: u64,
}

struct EngineState {
    static_props: Props,
    dynamic_default: Props,
    dynamic_per_instance: Props,
    current: Arc<EffectiveConfig>,
    registry: Registry,
}

/// The dynamic-reconfiguration engine. One instance per process, owned by
/// the top-level server object and shared by handle.
pub struct DynamicConfigEngine {
    node_id: String,
    state: RwLock<EngineState>,
}

impl DynamicConfigEngine {
    /// Build the engine from the immutable startup configuration.
    ///
    /// Fails when the static props alone do not form a valid typed
    /// configuration.
    pub fn new(node_id: impl Into<String>, static_props: Props) -> Result<Self, InvalidConfigError> {
        let settings = BrokerSettings::from_props(&static_props)?;
        let current = Arc::new(EffectiveConfig {
            props: static_props.clone(),
            settings,
            generation: 0,
        });
        Ok(Self {
            node_id: node_id.into(),
            state: RwLock::new(EngineState {
                static_props,
                dynamic_default: Props::new(),
                dynamic_per_instance: Props::new(),
                current,
                registry: Registry::default(),
            }),
        })
    }

    /// The node id this engine answers per-instance notifications for.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Snapshot of the effective configuration currently in force.
    pub fn current_effective(&self) -> Arc<EffectiveConfig> {
        self.state.read().expect("engine lock poisoned").current.clone()
    }

    /// Snapshot of the last-applied cluster-default dynamic layer.
    pub fn dynamic_default_layer(&self) -> Props {
        self.state
            .read()
            .expect("engine lock poisoned")
            .dynamic_default
            .clone()
    }

    /// Snapshot of the last-applied per-instance dynamic layer.
    pub fn per_instance_layer(&self) -> Props {
        self.state
            .read()
            .expect("engine lock poisoned")
            .dynamic_per_instance
            .clone()
    }

    /// Register a value-scoped reconfigurable.
    pub fn register(&self, member: Arc<dyn Reconfigurable>) -> Result<(), ConfigurationError> {
        self.state
            .write()
            .expect("engine lock poisoned")
            .registry
            .register(member)
    }

    /// Register a whole-config reconfigurable.
    pub fn register_whole_config(
        &self,
        member: Arc<dyn WholeConfigReconfigurable>,
    ) -> Result<(), ConfigurationError> {
        self.state
            .write()
            .expect("engine lock poisoned")
            .registry
            .register_whole_config(member)
    }

    /// Remove a value-scoped reconfigurable.
    pub fn unregister(&self, member: &Arc<dyn Reconfigurable>) {
        self.state
            .write()
            .expect("engine lock poisoned")
            .registry
            .unregister(member);
    }

    /// Admission check for a proposed update, before it is persisted
    /// anywhere. Strict sanitization plus a validate-only round; always
    /// side-effect-free.
    pub fn validate_proposed(
        &self,
        proposed: &Props,
        per_instance_scope: bool,
    ) -> Result<(), InvalidConfigError> {
        sanitize::validate_for_apply(proposed, per_instance_scope)?;

        let mut state = self.state.write().expect("engine lock poisoned");
        let (dynamic_default, dynamic_per_instance) = if per_instance_scope {
            (state.dynamic_default.clone(), proposed.clone())
        } else {
            (proposed.clone(), state.dynamic_per_instance.clone())
        };
        Self::run_round(
            &mut state,
            &dynamic_default,
            &dynamic_per_instance,
            RecomputeMode::ValidateOnly,
        )
        .map(|_| ())
    }

    /// Replace the cluster-default dynamic layer and reconfigure.
    ///
    /// Ignore-on-error: bad entries are dropped by the sanitizer and any
    /// round failure leaves the prior layer and configuration in force.
    pub fn update_dynamic_default_layer(&self, proposed: &Props) {
        let mut state = self.state.write().expect("engine lock poisoned");
        let cleaned = sanitize::sanitize(proposed, false).cleaned;
        let previous = std::mem::replace(&mut state.dynamic_default, cleaned);
        let dynamic_default = state.dynamic_default.clone();
        let dynamic_per_instance = state.dynamic_per_instance.clone();
        if let Err(e) = Self::run_round(
            &mut state,
            &dynamic_default,
            &dynamic_per_instance,
            RecomputeMode::Commit,
        ) {
            error!(
                error = %e,
                proposed = ?proposed,
                "Dynamic default update rejected; keeping current configuration"
            );
            state.dynamic_default = previous;
        }
    }

    /// Replace the per-instance dynamic layer and reconfigure.
    /// Same ignore-on-error policy as the default layer.
    pub fn update_per_instance_layer(&self, proposed: &Props) {
        let mut state = self.state.write().expect("engine lock poisoned");
        let cleaned = sanitize::sanitize(proposed, true).cleaned;
        let previous = std::mem::replace(&mut state.dynamic_per_instance, cleaned);
        let dynamic_default = state.dynamic_default.clone();
        let dynamic_per_instance = state.dynamic_per_instance.clone();
        if let Err(e) = Self::run_round(
            &mut state,
            &dynamic_default,
            &dynamic_per_instance,
            RecomputeMode::Commit,
        ) {
            error!(
                error = %e,
                proposed = ?proposed,
                "Per-instance update rejected; keeping current configuration"
            );
            state.dynamic_per_instance = previous;
        }
    }

    /// Notification from the coordination-store watcher: the cluster-wide
    /// dynamic defaults changed. Never propagates errors.
    pub fn notify_dynamic_default_changed(&self, stored: &Props) {
        match codec::decode_from_storage(stored) {
            Ok(props) => self.update_dynamic_default_layer(&props),
            Err(e) => error!(
                error = %e,
                "Ignoring stored dynamic defaults that failed to decode"
            ),
        }
    }

    /// Notification that one instance's stored configuration changed.
    /// Notifications addressed to a different node are ignored.
    pub fn notify_per_instance_changed(&self, instance_id: &str, stored: &Props) {
        if instance_id != self.node_id {
            debug!(
                instance_id = %instance_id,
                "Ignoring per-instance update for a different node"
            );
            return;
        }
        match codec::decode_from_storage(stored) {
            Ok(props) => self.update_per_instance_layer(&props),
            Err(e) => error!(
                error = %e,
                "Ignoring stored per-instance config that failed to decode"
            ),
        }
    }

    /// One reconfiguration round over the given dynamic layers.
    ///
    /// Holds the caller's write guard for the whole round; mutates
    /// `state.current` only in `Commit` mode and only after every
    /// dispatched member was asked to apply.
    fn run_round(
        state: &mut EngineState,
        dynamic_default: &Props,
        dynamic_per_instance: &Props,
        mode: RecomputeMode,
    ) -> Result<Arc<EffectiveConfig>, InvalidConfigError> {
        let current = state.current.clone();

        // MERGING
        let merged = layers::merge(&state.static_props, dynamic_default, dynamic_per_instance);
        let candidate = BrokerSettings::from_props(&merged)?;

        // DIFFING: key-wise value inequality against the current effective
        // props, regardless of which layer produced either value.
        let changed = diff_keys(&current.props, &merged);
        if changed.is_empty() {
            metrics::record_round("noop");
            return Ok(current);
        }

        // Dispatch list. A scoped member's intersection is computed against
        // its own scoped-plus-base view, not the raw global diff.
        let whole: Vec<Arc<dyn WholeConfigReconfigurable>> = state
            .registry
            .whole_config()
            .iter()
            .filter(|m| m.reconfigurable_keys().iter().any(|k| changed.contains(k)))
            .cloned()
            .collect();

        let mut value: Vec<(Arc<dyn Reconfigurable>, Props, Props)> = Vec::new();
        for member in state.registry.value_scoped() {
            let old_view = member_view(member.as_ref(), &current.props);
            let new_view = member_view(member.as_ref(), &merged);
            if old_view != new_view {
                value.push((member.clone(), old_view, new_view));
            }
        }

        // VALIDATING: all members first; any failure aborts before any
        // apply call, even on members that already validated. Admission
        // checks are routine rejections, not aborted rounds, so only
        // commit-mode failures count against the abort metric.
        let record_abort = || {
            if mode == RecomputeMode::Commit {
                metrics::record_round("aborted");
            }
        };
        for member in &whole {
            member.validate(&candidate).map_err(|e| {
                record_abort();
                InvalidConfigError::MemberValidation {
                    member: member.name().to_string(),
                    message: e.to_string(),
                }
            })?;
        }
        for (member, _, new_view) in &value {
            member.validate(new_view).map_err(|e| {
                record_abort();
                InvalidConfigError::MemberValidation {
                    member: member.name().to_string(),
                    message: e.to_string(),
                }
            })?;
        }

        if mode == RecomputeMode::ValidateOnly {
            return Ok(current);
        }

        // APPLYING: best effort per member. A failure here is logged with
        // full context but does not roll back other members or the commit;
        // apply is assumed effectively infallible after validation.
        for member in &whole {
            if let Err(e) = member.apply(&current.settings, &candidate) {
                error!(
                    member = member.name(),
                    error = %e,
                    "Apply failed after successful validation"
                );
            }
        }
        for (member, old_view, new_view) in &value {
            if let Err(e) = member.apply(old_view, new_view) {
                error!(
                    member = member.name(),
                    error = %e,
                    changed = ?changed_view_keys(old_view, new_view),
                    "Apply failed after successful validation"
                );
            }
        }

        // COMMITTED
        let committed = Arc::new(EffectiveConfig {
            props: merged,
            settings: candidate,
            generation: current.generation + 1,
        });
        state.current = committed.clone();
        metrics::record_round("committed");
        metrics::record_generation(committed.generation);
        info!(
            generation = committed.generation,
            changed_keys = changed.len(),
            dispatched = whole.len() + value.len(),
            "Reconfiguration committed"
        );
        Ok(committed)
    }
}

/// Keys whose resolved value differs between two flat maps.
fn diff_keys(before: &Props, after: &Props) -> Vec<String> {
    let mut changed = Vec::new();
    for (key, value) in before {
        if after.get(key) != Some(value) {
            changed.push(key.clone());
        }
    }
    for key in after.keys() {
        if !before.contains_key(key) {
            changed.push(key.clone());
        }
    }
    changed
}

/// A member's view of `props`: its declared keys, with the member's
/// listener-scoped variant shadowing the unscoped base value.
fn member_view(member: &dyn Reconfigurable, props: &Props) -> Props {
    let mut view = Props::new();
    for key in member.reconfigurable_keys() {
        let resolved = match member.listener_scope() {
            Some(scope) => props
                .get(&scoped_key(scope, &key))
                .or_else(|| props.get(&key)),
            None => props.get(&key),
        };
        if let Some(value) = resolved {
            view.insert(key, value.clone());
        }
    }
    view
}

fn changed_view_keys(old_view: &Props, new_view: &Props) -> Vec<String> {
    diff_keys(old_view, new_view)
}
