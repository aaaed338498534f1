//! Bounded thread-pool resizing.
//!
//! # Responsibilities
//! - Validate proposed pool sizes against the live sizes before any resize
//! - Resize only pools whose configured size actually changed
//!
//! # State Transitions
//! ```text
//! validate: new <= 0            → reject
//!           new < half current  → reject
//!           new > double current→ reject
//!           new == current      → accept (no-op)
//! apply:    resize each pool whose size changed
//! ```
//!
//! # Design Decisions
//! - The half/double window bounds the blast radius of a single dynamic
//!   update on live pool sizing; reaching a far target takes several steps
//! - Unchanged pools are never touched: resizing is disruptive

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::errors::InvalidConfigError;
use crate::registry::WholeConfigReconfigurable;
use crate::schema::BrokerSettings;

/// A live pool whose worker count can change at runtime.
pub trait SizedPool: Send + Sync {
    fn current_size(&self) -> usize;
    fn resize(&self, new_size: usize);
}

/// Minimal pool handle tracking its size; real worker management lives in
/// the owning subsystem.
pub struct WorkerPool {
    name: String,
    size: AtomicUsize,
}

impl WorkerPool {
    pub fn new(name: impl Into<String>, size: usize) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            size: AtomicUsize::new(size),
        })
    }
}

impl SizedPool for WorkerPool {
    fn current_size(&self) -> usize {
        self.size.load(Ordering::SeqCst)
    }

    fn resize(&self, new_size: usize) {
        let old = self.size.swap(new_size, Ordering::SeqCst);
        info!(pool = %self.name, old_size = old, new_size, "Resized worker pool");
    }
}

/// Whole-config reconfigurable managing the sized thread-pool family.
pub struct ThreadPoolResizer {
    pools: Vec<(String, Arc<dyn SizedPool>)>,
}

impl ThreadPoolResizer {
    pub fn new() -> Self {
        Self { pools: Vec::new() }
    }

    /// Bind a config key to the pool it sizes.
    pub fn with_pool(mut self, key: impl Into<String>, pool: Arc<dyn SizedPool>) -> Self {
        self.pools.push((key.into(), pool));
        self
    }

    fn requested(settings: &BrokerSettings, key: &str) -> Option<i64> {
        match key {
            "num.network.threads" => Some(settings.network_threads as i64),
            "num.io.threads" => Some(settings.io_threads as i64),
            "background.threads" => Some(settings.background_threads as i64),
            _ => None,
        }
    }
}

impl Default for ThreadPoolResizer {
    fn default() -> Self {
        Self::new()
    }
}

impl WholeConfigReconfigurable for ThreadPoolResizer {
    fn name(&self) -> &str {
        "thread-pools"
    }

    fn reconfigurable_keys(&self) -> HashSet<String> {
        self.pools.iter().map(|(key, _)| key.clone()).collect()
    }

    fn validate(&self, candidate: &BrokerSettings) -> Result<(), InvalidConfigError> {
        for (key, pool) in &self.pools {
            let Some(requested) = Self::requested(candidate, key) else {
                continue;
            };
            let current = pool.current_size();
            if requested == current as i64 {
                continue;
            }
            // Saturating arithmetic: an absurd requested size must reject,
            // never wrap.
            let out_of_bounds = requested <= 0
                || requested.saturating_mul(2) < current as i64
                || requested > (current as i64).saturating_mul(2);
            if out_of_bounds {
                return Err(InvalidConfigError::ResizeOutOfBounds {
                    key: key.clone(),
                    current,
                    requested,
                });
            }
        }
        Ok(())
    }

    fn apply(
        &self,
        _old: &BrokerSettings,
        new: &BrokerSettings,
    ) -> Result<(), InvalidConfigError> {
        for (key, pool) in &self.pools {
            let Some(requested) = Self::requested(new, key) else {
                continue;
            };
            if requested != pool.current_size() as i64 {
                pool.resize(requested as usize);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resizer_with(size: usize) -> (ThreadPoolResizer, Arc<WorkerPool>) {
        let pool = WorkerPool::new("io", size);
        let resizer =
            ThreadPoolResizer::new().with_pool("num.io.threads", pool.clone() as Arc<dyn SizedPool>);
        (resizer, pool)
    }

    fn candidate(io_threads: usize) -> BrokerSettings {
        BrokerSettings {
            io_threads,
            ..BrokerSettings::default()
        }
    }

    #[test]
    fn test_bounded_resize_window() {
        let (resizer, _pool) = resizer_with(10);

        // Below half of the live size.
        assert!(resizer.validate(&candidate(3)).is_err());
        // No change is trivially accepted.
        assert!(resizer.validate(&candidate(10)).is_ok());
        // Inside the window.
        assert!(resizer.validate(&candidate(5)).is_ok());
        assert!(resizer.validate(&candidate(15)).is_ok());
        assert!(resizer.validate(&candidate(20)).is_ok());
        // Above double.
        assert!(resizer.validate(&candidate(25)).is_err());
    }

    #[test]
    fn test_extreme_size_rejected_without_wrapping() {
        let (resizer, pool) = resizer_with(8);
        let err = resizer
            .validate(&candidate(i64::MAX as usize))
            .unwrap_err();
        assert!(matches!(err, InvalidConfigError::ResizeOutOfBounds { .. }));
        assert_eq!(pool.current_size(), 8);
    }

    #[test]
    fn test_zero_size_rejected() {
        let (resizer, _pool) = resizer_with(10);
        let err = resizer.validate(&candidate(0)).unwrap_err();
        assert!(matches!(err, InvalidConfigError::ResizeOutOfBounds { .. }));
    }

    #[test]
    fn test_apply_skips_unchanged_pools() {
        let network = WorkerPool::new("network", 3);
        let io = WorkerPool::new("io", 8);
        let resizer = ThreadPoolResizer::new()
            .with_pool("num.network.threads", network.clone() as Arc<dyn SizedPool>)
            .with_pool("num.io.threads", io.clone() as Arc<dyn SizedPool>);

        let old = BrokerSettings::default();
        let new = BrokerSettings {
            io_threads: 12,
            ..BrokerSettings::default()
        };
        resizer.apply(&old, &new).unwrap();

        assert_eq!(network.current_size(), 3);
        assert_eq!(io.current_size(), 12);
    }
}
