// src/core/config_manager.rs
//! Server and scraper settings: `config.yaml` when present, then environment
//! variable overrides.

use crate::mention_scan::SessionConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub export_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub port: u16,
    pub expand_settle_ms: u64,
    pub scroll_settle_ms: u64,
    pub page_settle_ms: u64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            export_path: PathBuf::from("exports"),
            snapshot_path: PathBuf::from("snapshots"),
            port: 5000,
            expand_settle_ms: 500,
            scroll_settle_ms: 5000,
            page_settle_ms: 3000,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    local: EnvironmentConfig,
    #[serde(default)]
    production: EnvironmentConfig,
}

#[derive(Debug, Clone)]
pub struct ConfigManager {
    pub environment_name: String,
    pub environment: EnvironmentConfig,
}

impl ConfigManager {
    pub fn load() -> Result<Self> {
        let environment_name = Self::environment_name();
        info!("Loading configuration for environment: {}", environment_name);

        let config_path = PathBuf::from("config.yaml");
        let mut environment = if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).context("Failed to read config.yaml")?;
            Self::from_yaml(&content, &environment_name)?
        } else {
            EnvironmentConfig::default()
        };

        Self::apply_overrides(&mut environment, |key| std::env::var(key).ok())?;

        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        environment.export_path = resolve_path(&current_dir, &environment.export_path);
        environment.snapshot_path = resolve_path(&current_dir, &environment.snapshot_path);

        Ok(Self {
            environment_name,
            environment,
        })
    }

    fn environment_name() -> String {
        std::env::var("MENTION_SCRAPER_ENV")
            .or_else(|_| std::env::var("ENVIRONMENT"))
            .unwrap_or_else(|_| "local".to_string())
    }

    fn from_yaml(content: &str, environment_name: &str) -> Result<EnvironmentConfig> {
        let file: ConfigFile =
            serde_yaml::from_str(content).context("Failed to parse config.yaml")?;
        Ok(match environment_name {
            "production" => file.production,
            _ => file.local,
        })
    }

    fn apply_overrides(
        environment: &mut EnvironmentConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<()> {
        if let Some(dir) = lookup("SCRAPER_EXPORT_DIR") {
            environment.export_path = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("SCRAPER_SNAPSHOT_DIR") {
            environment.snapshot_path = PathBuf::from(dir);
        }
        if let Some(port) = lookup("ROCKET_PORT") {
            environment.port = port
                .parse()
                .map_err(|_| anyhow::anyhow!("ROCKET_PORT must be a valid port number"))?;
        }
        if let Some(ms) = lookup("SCRAPER_SETTLE_MS") {
            environment.expand_settle_ms = parse_millis("SCRAPER_SETTLE_MS", &ms)?;
        }
        if let Some(ms) = lookup("SCRAPER_SCROLL_SETTLE_MS") {
            environment.scroll_settle_ms = parse_millis("SCRAPER_SCROLL_SETTLE_MS", &ms)?;
        }
        if let Some(ms) = lookup("SCRAPER_PAGE_SETTLE_MS") {
            environment.page_settle_ms = parse_millis("SCRAPER_PAGE_SETTLE_MS", &ms)?;
        }
        Ok(())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            expand_settle: Duration::from_millis(self.environment.expand_settle_ms),
            scroll_settle: Duration::from_millis(self.environment.scroll_settle_ms),
            page_settle: Duration::from_millis(self.environment.page_settle_ms),
            ..SessionConfig::default()
        }
    }

    pub async fn ensure_directories(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.environment.export_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to create directory: {}",
                    self.environment.export_path.display()
                )
            })
    }
}

fn parse_millis(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .with_context(|| format!("{} must be a number of milliseconds", key))
}

fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
