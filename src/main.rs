//! Broker dynamic-configuration daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────┐
//!                    │            RECONFIGURATION ENGINE                │
//!                    │                                                  │
//!  coordination      │  ┌─────────┐   ┌──────────┐   ┌──────────────┐  │
//!  store change ─────┼─▶│ watcher │──▶│ sanitize │──▶│    layers    │  │
//!                    │  └─────────┘   └──────────┘   │    merge     │  │
//!                    │                               └──────┬───────┘  │
//!                    │                                      ▼          │
//!                    │  ┌─────────────────────────────────────────────┐│
//!                    │  │ engine: diff → validate all → apply all →   ││
//!                    │  │         atomic commit of effective config   ││
//!                    │  └──────┬───────────────────────┬──────────────┘│
//!                    │         ▼                       ▼               │
//!                    │  ┌─────────────┐        ┌──────────────┐        │
//!                    │  │ pools       │        │ topics       │        │
//!                    │  │ (resize)    │        │ (cascade)    │        │
//!                    │  └─────────────┘        └──────────────┘        │
//!                    │                                                  │
//!                    │  cross-cutting: keys/synonyms, schema, codec,    │
//!                    │                 observability                    │
//!                    └──────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use broker_reconfig::engine::DynamicConfigEngine;
use broker_reconfig::pools::{SizedPool, ThreadPoolResizer, WorkerPool};
use broker_reconfig::registry::Reconfigurable;
use broker_reconfig::topics::TopicConfigManager;
use broker_reconfig::watcher::ConfigStoreWatcher;

#[derive(Parser)]
#[command(name = "broker-reconfig")]
#[command(about = "Dynamic reconfiguration engine daemon", long_about = None)]
struct Args {
    /// Static startup configuration (TOML, flat string map).
    #[arg(short, long, default_value = "broker.toml")]
    config: PathBuf,

    /// Directory holding stored dynamic configuration.
    #[arg(long, default_value = "config-store")]
    store_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "broker_reconfig=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("broker-reconfig v0.1.0 starting");

    let args = Args::parse();
    let static_props = load_static_props(&args.config)?;
    let node_id = static_props
        .get("node.id")
        .cloned()
        .unwrap_or_else(|| "0".to_string());

    if let Some(addr) = static_props.get("metrics.address") {
        match addr.parse() {
            Ok(addr) => broker_reconfig::observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(metrics_address = %addr, "Failed to parse metrics address"),
        }
    }

    let engine = Arc::new(DynamicConfigEngine::new(node_id.clone(), static_props)?);
    let settings = engine.current_effective().settings.clone();

    tracing::info!(
        node_id = %node_id,
        network_threads = settings.network_threads,
        io_threads = settings.io_threads,
        "Configuration loaded"
    );

    // Wire the live subsystems that support dynamic reconfiguration.
    let resizer = ThreadPoolResizer::new()
        .with_pool(
            "num.network.threads",
            WorkerPool::new("network", settings.network_threads) as Arc<dyn SizedPool>,
        )
        .with_pool(
            "num.io.threads",
            WorkerPool::new("io", settings.io_threads) as Arc<dyn SizedPool>,
        )
        .with_pool(
            "background.threads",
            WorkerPool::new("background", settings.background_threads) as Arc<dyn SizedPool>,
        );
    engine.register_whole_config(Arc::new(resizer))?;

    let topics = Arc::new(TopicConfigManager::new());
    engine.register(topics as Arc<dyn Reconfigurable>)?;

    // Keep the watcher handle alive for the process lifetime.
    let _watcher = ConfigStoreWatcher::new(&args.store_dir, engine.clone()).run()?;

    tracing::info!(store_dir = ?args.store_dir, "Watching for dynamic configuration");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Load the static startup layer: a TOML document flattened into the
/// engine's string-keyed map. TOML parses an unquoted dotted key like
/// `log.segment.bytes` as nested tables, so tables are flattened back into
/// dotted keys.
fn load_static_props(path: &PathBuf) -> Result<HashMap<String, String>, Box<dyn std::error::Error>> {
    if !path.exists() {
        tracing::warn!(path = ?path, "No static config file; starting from defaults");
        return Ok(HashMap::new());
    }
    let content = std::fs::read_to_string(path)?;
    let table: toml::Table = toml::from_str(&content)?;

    let mut props = HashMap::new();
    flatten_table(&mut props, "", table);
    Ok(props)
}

fn flatten_table(props: &mut HashMap<String, String>, prefix: &str, table: toml::Table) {
    for (key, value) in table {
        let full_key = if prefix.is_empty() {
            key
        } else {
            format!("{prefix}.{key}")
        };
        let rendered = match value {
            toml::Value::String(s) => s,
            toml::Value::Integer(i) => i.to_string(),
            toml::Value::Float(f) => f.to_string(),
            toml::Value::Boolean(b) => b.to_string(),
            toml::Value::Table(nested) => {
                flatten_table(props, &full_key, nested);
                continue;
            }
            other => {
                tracing::warn!(key = %full_key, value = ?other, "Skipping non-scalar static config value");
                continue;
            }
        };
        props.insert(full_key, rendered);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dotted_keys_flatten_to_flat_props() {
        let table: toml::Table = toml::from_str(
            r#"
            node.id = 3
            log.segment.bytes = 4096
            log.cleanup.policy = "delete"
            "listeners" = "PLAINTEXT://:9092"
            "#,
        )
        .unwrap();
        let mut props = HashMap::new();
        flatten_table(&mut props, "", table);

        assert_eq!(props["node.id"], "3");
        assert_eq!(props["log.segment.bytes"], "4096");
        assert_eq!(props["log.cleanup.policy"], "delete");
        assert_eq!(props["listeners"], "PLAINTEXT://:9092");
    }
}
