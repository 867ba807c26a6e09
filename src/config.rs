use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::step::SaveSettings;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub flow: FlowConfig,
    pub ui: UiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub paths: PathsConfig,
    #[serde(default)]
    pub preferences: PreferencesConfig,
}

/// The onboarding flow presented by `run` and `walk`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Title of the first page
    pub title: String,
    /// Options offered on the first page (at least two)
    pub options: Vec<String>,
    /// Simulated latency of saving the favorite (default: 1000)
    #[serde(default = "default_save_delay_ms")]
    pub save_delay_ms: u64,
    /// When set, every save fails with this reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulate_save_failure: Option<String>,
}

fn default_save_delay_ms() -> u64 {
    1000
}

impl FlowConfig {
    pub fn save_settings(&self) -> SaveSettings {
        SaveSettings {
            delay: Duration::from_millis(self.save_delay_ms),
            failure: self.simulate_save_failure.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Event poll interval, also the spinner frame rate
    pub tick_rate_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub state: String,
}

/// Values remembered between runs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferencesConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to log to file in TUI mode (false = stderr for debugging)
    #[serde(default = "default_log_to_file")]
    pub to_file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_to_file() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: default_log_to_file(),
        }
    }
}

impl Config {
    /// Path to the project-local config file
    pub fn local_config_path() -> PathBuf {
        PathBuf::from(".pageflow/config.toml")
    }

    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Start with embedded defaults so pageflow works without config files
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        let local_config = Self::local_config_path();
        if local_config.exists() {
            builder = builder.add_source(config::File::from(local_config));
        }

        // User config in ~/.config/pageflow/ (optional global overrides)
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("pageflow").join("config.toml");
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config));
            }
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment variables with PAGEFLOW__ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("PAGEFLOW")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Save config to .pageflow/config.toml
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::local_config_path())
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create pageflow config directory")?;
        }

        let toml_str =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        std::fs::write(config_path, toml_str).context("Failed to write config file")?;

        Ok(())
    }

    /// Remember the favorite picked in a completed flow
    pub fn record_favorite(&mut self, favorite: impl Into<String>) {
        self.preferences.favorite = Some(favorite.into());
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.ui.tick_rate_ms)
    }

    /// Get absolute path to state directory
    pub fn state_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.paths.state);
        if path.is_absolute() {
            path
        } else {
            std::env::current_dir().unwrap_or_default().join(path)
        }
    }

    /// Get absolute path to logs directory
    pub fn logs_path(&self) -> PathBuf {
        self.state_path().join("logs")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            flow: FlowConfig {
                title: "Favorite pet".to_string(),
                options: vec!["Cats".to_string(), "Dogs".to_string()],
                save_delay_ms: default_save_delay_ms(),
                simulate_save_failure: None,
            },
            ui: UiConfig { tick_rate_ms: 100 },
            logging: LoggingConfig::default(),
            paths: PathsConfig {
                state: ".pageflow".to_string(),
            },
            preferences: PreferencesConfig::default(),
        }
    }
}
