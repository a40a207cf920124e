use anyhow::{Context, Result};
use cadenza_core::FeatureName;
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::EngineResult;
use crate::settings::{default_feature_settings, FeatureSettings, TrainSettings};

/// Configuration for cadenza.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (CADENZA_* prefix)
/// 3. Config file (~/.config/cadenza/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the SQLite catalog.
    ///
    /// Can be set via:
    /// - CLI: --db /path/to/db
    /// - ENV: CADENZA_DATABASE_PATH
    /// - Config: database_path = "/path/to/db"
    /// - Default: ~/.local/share/cadenza/cadenza.db
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,

    /// Directory holding the cached model.
    ///
    /// Can be set via:
    /// - CLI: --cache-dir /path/to/dir
    /// - ENV: CADENZA_CACHE_DIR
    /// - Config: cache_dir = "/path/to/dir"
    /// - Default: ~/.cache/cadenza
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub training: TrainingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// One of trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_coloured")]
    pub coloured: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            coloured: default_coloured(),
        }
    }
}

/// Parameters used when the model has to be trained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_iteration_count")]
    pub iteration_count: usize,

    #[serde(default = "default_sample_count_per_neuron")]
    pub sample_count_per_neuron: f64,

    /// Fixed seed for reproducible training.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Feature name to weight.
    #[serde(default = "default_features")]
    pub features: BTreeMap<String, f64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            iteration_count: default_iteration_count(),
            sample_count_per_neuron: default_sample_count_per_neuron(),
            seed: None,
            features: default_features(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
            cache_dir: default_cache_dir(),
            logging: LoggingConfig::default(),
            training: TrainingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/cadenza/config.toml
    /// Reads environment variables with CADENZA_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("cadenza");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder.build().context("Failed to build configuration")?;

        Ok(config)
    }

    /// Load configuration, then apply the paths given on the command line.
    pub fn load_with_paths(db_path: Option<PathBuf>, cache_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::load()?;
        if let Some(db_path) = db_path {
            config.database_path = db_path;
        }
        if let Some(cache_dir) = cache_dir {
            config.cache_dir = cache_dir;
        }
        Ok(config)
    }

    /// Validated training settings.
    pub fn train_settings(&self) -> EngineResult<TrainSettings> {
        let training = &self.training;
        let settings = TrainSettings {
            feature_settings: training
                .features
                .iter()
                .map(|(name, &weight)| (FeatureName::from(name.as_str()), FeatureSettings { weight }))
                .collect(),
            iteration_count: training.iteration_count,
            sample_count_per_neuron: training.sample_count_per_neuron,
            seed: training.seed,
        };
        settings.validate()?;
        Ok(settings)
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cadenza")
        .join("cadenza.db")
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cadenza")
}

fn default_log_level() -> String {
    String::from("info")
}

const fn default_coloured() -> bool {
    true
}

const fn default_iteration_count() -> usize {
    10
}

const fn default_sample_count_per_neuron() -> f64 {
    4.0
}

fn default_features() -> BTreeMap<String, f64> {
    default_feature_settings()
        .into_iter()
        .map(|(name, settings)| (name.as_str().to_owned(), settings.weight))
        .collect()
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/cadenza/config.toml
/// - macOS: ~/Library/Application Support/cadenza/config.toml
/// - Windows: %APPDATA%\cadenza\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cadenza")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Cadenza Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (CADENZA_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# Path to the SQLite catalog
#
# Can also be set via:
# - CLI: cadenza --db /custom/path.db train
# - Environment: CADENZA_DATABASE_PATH=/custom/path.db
#
# Default: Platform-specific data directory
#database_path = "/path/to/custom/cadenza.db"

# Directory where the trained model is cached
#
# Can also be set via:
# - CLI: cadenza --cache-dir /custom/dir train
# - Environment: CADENZA_CACHE_DIR=/custom/dir
#
# Default: Platform-specific cache directory
#cache_dir = "/path/to/cache"

[logging]
# One of: trace, debug, info, warn, error
level = "info"
coloured = true

[training]
# Passes over the whole sample set
iteration_count = 10

# Grid side is floor(sqrt(samples / sample_count_per_neuron)), at least 2
# and at most floor(sqrt(samples))
sample_count_per_neuron = 4.0

# Uncomment for reproducible training
#seed = 42

# Features taking part in training, with their relative weights
[training.features]
"lowlevel.erbbands.mean" = 1.0
"lowlevel.gfcc.mean" = 1.0
"lowlevel.spectral_contrast_valleys.var" = 1.0
"lowlevel.spectral_energyband_high.mean" = 1.0
"lowlevel.spectral_rolloff.median" = 1.0
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}
