use anyhow::{bail, Context, Result};
use attn_runtime::RuntimeConfig;
use config::{Config, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// CLI settings: logging plus the runtime genesis.
///
/// Read from an optional TOML/JSON file, then overlaid with `ATTN__*`
/// environment variables (`ATTN__LOG_LEVEL=debug`,
/// `ATTN__RUNTIME__MAX_SUPPLY=...`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    pub log_format: String,
    pub runtime: RuntimeConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            if !path.exists() {
                bail!("Configuration file {} not found", path.display());
            }
            builder = builder.add_source(ConfigFile::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix("ATTN")
                .separator("__")
                .try_parsing(true),
        );

        let raw: serde_json::Value = builder
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("failed to parse configuration")?;
        serde_json::from_value(raw).context("invalid configuration")
    }
}

pub fn init_logging(config: &AppConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}
