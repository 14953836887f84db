// Wizard configuration
//
// Layers (later wins): built-in defaults -> TOML file -> `PITCH_WIZARD__*` environment
// variables (`PITCH_WIZARD__API__BASE_URL`, `PITCH_WIZARD__POLL_INTERVAL_MS`, ...).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::WizardError;
use crate::utils::path_resolver::default_config_file;
use crate::utils::validation::validate_base_url;

pub const CONFIG_PATH_ENV: &str = "PITCH_WIZARD_CONFIG";
const ENV_PREFIX: &str = "PITCH_WIZARD";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
    /// Attempts for idempotent calls (draft update, status check).
    pub retry_attempts: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            api_key: None,
            request_timeout_secs: 30,
            retry_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardConfig {
    pub autosave_debounce_ms: u64,
    /// How long input regions get to commit buffered edits before navigation reads the snapshot.
    pub flush_grace_ms: u64,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    pub min_repeat_count: u32,
    pub max_repeat_count: u32,
    pub default_repeat_count: u32,
    /// Ratings at or below this need a reason.
    pub low_rating_threshold: u8,
    /// Snapshot field the generated pitch is written to.
    pub result_field: String,
    pub api: ApiConfig,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            autosave_debounce_ms: 1000,
            flush_grace_ms: 100,
            poll_interval_ms: 5000,
            max_poll_attempts: 20,
            min_repeat_count: 2,
            max_repeat_count: 4,
            default_repeat_count: 2,
            low_rating_threshold: 2,
            result_field: "pitch".to_string(),
            api: ApiConfig::default(),
        }
    }
}

impl WizardConfig {
    /// Load using `PITCH_WIZARD_CONFIG` (or the platform config dir) as the file layer.
    pub fn load() -> Result<Self, WizardError> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(default_config_file);
        Self::load_from(path.as_deref())
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self, WizardError> {
        let defaults = config::Config::try_from(&WizardConfig::default())
            .map_err(|e| WizardError::Config(e.to_string()))?;

        let mut builder = config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            );
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let cfg: WizardConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| WizardError::Config(e.to_string()))?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), WizardError> {
        if self.poll_interval_ms == 0 {
            return Err(WizardError::Config(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.max_poll_attempts == 0 {
            return Err(WizardError::Config(
                "max_poll_attempts must be positive".to_string(),
            ));
        }
        if self.min_repeat_count == 0 || self.min_repeat_count > self.max_repeat_count {
            return Err(WizardError::Config(format!(
                "repeat count bounds are invalid ({}..={})",
                self.min_repeat_count, self.max_repeat_count
            )));
        }
        if !(self.min_repeat_count..=self.max_repeat_count).contains(&self.default_repeat_count) {
            return Err(WizardError::Config(format!(
                "default_repeat_count {} is outside {}..={}",
                self.default_repeat_count, self.min_repeat_count, self.max_repeat_count
            )));
        }
        if !(1..=5).contains(&self.low_rating_threshold) {
            return Err(WizardError::Config(
                "low_rating_threshold must be between 1 and 5".to_string(),
            ));
        }
        if self.result_field.trim().is_empty() {
            return Err(WizardError::Config(
                "result_field cannot be empty".to_string(),
            ));
        }
        validate_base_url(&self.api.base_url).map_err(|e| WizardError::Config(e.to_string()))?;
        Ok(())
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    pub fn flush_grace(&self) -> Duration {
        Duration::from_millis(self.flush_grace_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
