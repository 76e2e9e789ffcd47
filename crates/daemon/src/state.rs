use std::{fs, path::PathBuf};

use common::alias::{AliasTable, ALIAS_FILE_NAME};
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "dq";
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port for the daemon API server
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// Default log level, overridden by RUST_LOG
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Deadline for a single relation store call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Interval between full policy resyncs
    #[serde(default = "default_resync_secs")]
    pub resync_secs: u64,
    /// Policies reconciled concurrently
    #[serde(default = "default_reconcile_workers")]
    pub reconcile_workers: usize,
    /// Working directory of the build tool (the digi makefile lives here)
    #[serde(default)]
    pub workdir: Option<PathBuf>,
}

fn default_api_port() -> u16 {
    5010
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_resync_secs() -> u64 {
    30
}

fn default_reconcile_workers() -> usize {
    4
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            log_level: default_log_level(),
            request_timeout_secs: default_request_timeout_secs(),
            resync_secs: default_resync_secs(),
            reconcile_workers: default_reconcile_workers(),
            workdir: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the dq directory (~/.dq)
    pub dq_dir: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Path to the alias table
    pub alias_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the dq directory path (custom or default ~/.dq)
    pub fn dq_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new dq state directory
    pub fn init(custom_path: Option<PathBuf>, config: Option<AppConfig>) -> Result<Self, StateError> {
        let dq_dir = Self::dq_dir(custom_path)?;

        if dq_dir.join(CONFIG_FILE_NAME).exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&dq_dir)?;

        let config = config.unwrap_or_default();
        let config_path = dq_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        // an empty alias table is a valid one; it is created on first write
        let alias_path = dq_dir.join(ALIAS_FILE_NAME);

        Ok(Self {
            dq_dir,
            config_path,
            alias_path,
            config,
        })
    }

    /// Load existing state from the dq directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let dq_dir = Self::dq_dir(custom_path)?;

        if !dq_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let config_path = dq_dir.join(CONFIG_FILE_NAME);
        let alias_path = dq_dir.join(ALIAS_FILE_NAME);

        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            dq_dir,
            config_path,
            alias_path,
            config,
        })
    }

    /// Load the state if it exists, otherwise fall back to defaults rooted
    /// at the same directory
    pub fn load_or_default(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        match Self::load(custom_path.clone()) {
            Err(StateError::NotInitialized) | Err(StateError::MissingFile(_)) => {
                let dq_dir = Self::dq_dir(custom_path)?;
                Ok(Self {
                    config_path: dq_dir.join(CONFIG_FILE_NAME),
                    alias_path: dq_dir.join(ALIAS_FILE_NAME),
                    dq_dir,
                    config: AppConfig::default(),
                })
            }
            other => other,
        }
    }

    pub fn alias_table(&self) -> AliasTable {
        AliasTable::new(self.alias_path.clone())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("dq directory not initialized. Run 'dq init' first")]
    NotInitialized,

    #[error("dq directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
