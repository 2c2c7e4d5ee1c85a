use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::dialect::Dialect;
use crate::error::{Result, SqleanError};

const PLACEHOLDER_API_KEY: &str = "PLACEHOLDER_API_KEY";

/// Main configuration structure for sqlean
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// GitHub-flavored extensions (tables, strikethrough, task lists)
    pub gfm: bool,
    /// Run the code highlighting pass after results are committed
    pub highlight: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            gfm: true,
            highlight: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub default_dialect: Dialect,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_dialect: Dialect::BigQuery,
        }
    }
}

impl Config {
    /// Load configuration from file with environment variable overrides.
    ///
    /// Never fails: a missing or broken file falls back to defaults. Call
    /// [`Config::validate`] before using the result to build a client.
    pub fn load() -> Self {
        for path in ["../.env", ".env"] {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                break;
            }
        }

        let config_path =
            env::var("SQLEAN_CONFIG_PATH").unwrap_or_else(|_| "sqlean.yaml".to_string());

        let path = Path::new(&config_path);
        let mut config = match Self::from_file(path) {
            Ok(Some(config)) => {
                tracing::info!("Loaded configuration from {}", path.display());
                config
            }
            Ok(None) => {
                tracing::debug!("Config file not found at {} - using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::error!("{} - using defaults", e);
                Self::default()
            }
        };
        config.apply_env_overrides();
        config
    }

    /// Read a YAML config file. `Ok(None)` when the file does not exist.
    pub fn from_file(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)?;
        let config = serde_yaml::from_str::<Config>(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(Some(config))
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(api_key) = lookup("API_KEY").or_else(|| lookup("GEMINI_API_KEY")) {
            self.gemini.api_key = api_key;
        }
        if let Some(model) = lookup("SQLEAN_MODEL") {
            self.gemini.model = model;
        }
        if let Some(base_url) = lookup("SQLEAN_BASE_URL") {
            self.gemini.base_url = base_url;
        }
        if let Some(temperature) = lookup("SQLEAN_TEMPERATURE") {
            match temperature.parse() {
                Ok(t) => self.gemini.temperature = Some(t),
                Err(_) => tracing::warn!("Ignoring invalid SQLEAN_TEMPERATURE: {}", temperature),
            }
        }
        if let Some(timeout) = lookup("SQLEAN_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                self.gemini.request_timeout_secs = secs;
            }
        }
        if let Some(dialect) = lookup("SQLEAN_DEFAULT_DIALECT") {
            match Dialect::parse(&dialect) {
                Some(d) => self.app.default_dialect = d,
                None => tracing::warn!("Unknown SQLEAN_DEFAULT_DIALECT: {}", dialect),
            }
        }
        if let Some(highlight) = lookup("SQLEAN_HIGHLIGHT") {
            if let Ok(flag) = highlight.parse() {
                self.render.highlight = flag;
            }
        }
    }

    /// Validate configuration. A missing credential is fatal.
    pub fn validate(&self) -> Result<()> {
        let key = self.gemini.api_key.trim();
        if key.is_empty() || key == PLACEHOLDER_API_KEY {
            return Err(SqleanError::Configuration(
                "API_KEY environment variable not set".to_string(),
            ));
        }
        if self.gemini.model.trim().is_empty() {
            return Err(SqleanError::Configuration("Model name cannot be empty".to_string()));
        }
        if self.gemini.request_timeout_secs == 0 {
            return Err(SqleanError::Configuration(
                "Request timeout cannot be 0".to_string(),
            ));
        }
        if let Some(t) = self.gemini.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(SqleanError::Configuration(
                    "Temperature must be between 0.0 and 2.0".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.gemini.request_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig {
                api_key: String::new(),
                model: "gemini-2.5-flash".to_string(),
                base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                temperature: None,
                request_timeout_secs: 120,
            },
            render: RenderConfig::default(),
            app: AppConfig::default(),
        }
    }
}
