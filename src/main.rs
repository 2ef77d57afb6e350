//! appconfig-sync command line client.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌───────────────────────────── SyncOrchestrator ─────────────────────────────┐
//!   │                                                                             │
//!   │  init/set_context ──▶ bootstrap ──▶ ConfigCache ◀── readers / evaluation    │
//!   │                         │  ▲              ▲                                 │
//!   │            remote fetch │  │ file         │ publish                         │
//!   │                         ▼  │              │                                 │
//!   │              RemoteConfigFetcher ◀── refresh loop ◀── LiveUpdateChannel     │
//!   │                                           │                                 │
//!   │                                           ▼                                 │
//!   │                              LocalSnapshotStore, ChangeNotifier             │
//!   └─────────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use appconfig_sync::config::{load_config, ClientConfig};
use appconfig_sync::observability::{logging::init_logging, metrics::init_metrics};
use appconfig_sync::{ContextOptions, EntityAttributes, SyncOrchestrator};

#[derive(Parser)]
#[command(name = "appconfig-sync")]
#[command(about = "Sync and evaluate remotely managed feature flags", long_about = None)]
struct Cli {
    /// TOML client configuration.
    #[arg(short, long, default_value = "appconfig.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List features in the current snapshot
    Features,
    /// List properties in the current snapshot
    Properties,
    /// Evaluate one feature (or property) for an entity
    Evaluate {
        #[arg(long, conflicts_with = "property", required_unless_present = "property")]
        feature: Option<String>,
        #[arg(long)]
        property: Option<String>,
        #[arg(long)]
        entity: String,
        /// Entity attribute as key=value; repeatable. Values parse as JSON when possible.
        #[arg(long = "attr", value_parser = parse_attribute)]
        attrs: Vec<(String, serde_json::Value)>,
    },
    /// Stay connected and log every configuration update until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    init_logging(config.observability.log_format);
    tracing::info!(config = %cli.config.display(), "appconfig-sync starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let client = connect(&config).await?;

    match cli.command {
        Commands::Features => {
            let mut features: Vec<_> = client.get_features().into_values().collect();
            features.sort_by(|a, b| a.id.cmp(&b.id));
            for f in features {
                println!(
                    "{}\t{}\tenabled={}\ton={}\toff={}\trules={}",
                    f.id,
                    f.data_type.as_str(),
                    f.enabled,
                    f.enabled_value,
                    f.disabled_value,
                    f.segment_rules.len()
                );
            }
        }
        Commands::Properties => {
            let mut properties: Vec<_> = client.get_properties().into_values().collect();
            properties.sort_by(|a, b| a.id.cmp(&b.id));
            for p in properties {
                println!(
                    "{}\t{}\tvalue={}\trules={}",
                    p.id,
                    p.data_type.as_str(),
                    p.value,
                    p.segment_rules.len()
                );
            }
        }
        Commands::Evaluate {
            feature,
            property,
            entity,
            attrs,
        } => {
            let attributes: EntityAttributes = attrs.into_iter().collect();
            let (kind, id, value) = match (feature, property) {
                (Some(id), _) => {
                    let value = client.feature_value(&id, &entity, &attributes)?;
                    ("feature", id, value)
                }
                (None, Some(id)) => {
                    let value = client.property_value(&id, &entity, &attributes)?;
                    ("property", id, value)
                }
                (None, None) => {
                    client.shutdown().await;
                    return Err("either --feature or --property is required".into());
                }
            };
            match value {
                Some(value) => println!("{value}"),
                None => {
                    let state = client.state();
                    client.shutdown().await;
                    return Err(format!("{kind} '{id}' not found (state: {state})").into());
                }
            }
        }
        Commands::Watch => {
            client.subscribe(|| tracing::info!("Configuration updated"));
            appconfig_sync::lifecycle::signals::wait_for_signal().await;
        }
    }

    client.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn connect(config: &ClientConfig) -> Result<SyncOrchestrator, Box<dyn std::error::Error>> {
    let client = SyncOrchestrator::from_client_config(config)?;
    client.init(&config.service.region, &config.service.guid, &config.service.apikey)?;

    let context = &config.context;
    client
        .set_context(
            &context.collection_id,
            &context.environment_id,
            ContextOptions {
                config_file: context.config_file.clone(),
                live_update: context.live_update,
                watch_config_file: context.watch_config_file,
            },
        )
        .await?;

    tracing::info!(
        state = %client.state(),
        features = client.get_features().len(),
        properties = client.get_properties().len(),
        "Context ready"
    );
    Ok(client)
}

fn parse_attribute(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    if key.is_empty() {
        return Err("attribute name must not be empty".to_string());
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
