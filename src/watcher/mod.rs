//! Coordination-store watcher for dynamic configuration.
//!
//! # Data Flow
//! ```text
//! store directory
//!     ├── cluster.json      (cluster-wide dynamic defaults)
//!     └── <node-id>.json    (this node's per-instance overrides)
//!
//! file change detected
//!     → read & parse stored props (JSON string map)
//!     → engine notification entry point (decode + sanitize + recompute)
//! ```
//!
//! # Design Decisions
//! - A failed read or parse logs and keeps the current configuration; the
//!   watcher never crashes the process over a bad store write
//! - Stored files are replaced wholesale by writers, so every change event
//!   triggers a full re-read, never an incremental patch

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;

use crate::engine::DynamicConfigEngine;

/// Stored dynamic defaults file name.
pub const CLUSTER_FILE: &str = "cluster.json";

/// Error reading a stored configuration file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Read a stored props file: a flat JSON object of string values.
pub fn read_stored_props(path: &Path) -> Result<HashMap<String, String>, StoreError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Watches the coordination-store directory and drives the engine's
/// notification path.
pub struct ConfigStoreWatcher {
    store_dir: PathBuf,
    engine: Arc<DynamicConfigEngine>,
}

impl ConfigStoreWatcher {
    pub fn new(store_dir: impl Into<PathBuf>, engine: Arc<DynamicConfigEngine>) -> Self {
        Self {
            store_dir: store_dir.into(),
            engine,
        }
    }

    /// Start watching in a background thread.
    ///
    /// The returned watcher must be kept alive for events to flow.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let engine = self.engine;
        let node_file = format!("{}.json", engine.node_id());

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !event.kind.is_modify() && !event.kind.is_create() {
                        return;
                    }
                    for path in &event.paths {
                        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                            continue;
                        };
                        if name == CLUSTER_FILE {
                            Self::deliver(path, |props| {
                                engine.notify_dynamic_default_changed(props);
                            });
                        } else if name == node_file {
                            Self::deliver(path, |props| {
                                engine.notify_per_instance_changed(engine.node_id(), props);
                            });
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.store_dir, RecursiveMode::NonRecursive)?;

        tracing::info!(store_dir = ?self.store_dir, "Config store watcher started");
        Ok(watcher)
    }

    fn deliver(path: &Path, notify: impl FnOnce(&HashMap<String, String>)) {
        tracing::info!(path = ?path, "Stored config change detected, reloading...");
        match read_stored_props(path) {
            Ok(props) => notify(&props),
            Err(e) => {
                tracing::error!(
                    path = ?path,
                    error = %e,
                    "Failed to reload stored config. Keeping current configuration."
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_read_stored_props() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"log.segment.bytes": "1048576"}}"#).unwrap();

        let props = read_stored_props(file.path()).unwrap();
        assert_eq!(props["log.segment.bytes"], "1048576");
    }

    #[test]
    fn test_read_stored_props_rejects_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            read_stored_props(file.path()),
            Err(StoreError::Parse(_))
        ));
    }
}
