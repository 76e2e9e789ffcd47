use std::path::PathBuf;

use clap::Args;

use dspace_daemon::state::{AppConfig, AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// API server port (default: 5010)
    #[arg(long)]
    pub api_port: Option<u16>,

    /// Working directory of the digi makefile
    #[arg(long)]
    pub workdir: Option<PathBuf>,

    /// Default daemon log level
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let defaults = AppConfig::default();
        let config = AppConfig {
            api_port: self.api_port.unwrap_or(defaults.api_port),
            log_level: self.log_level.clone().unwrap_or(defaults.log_level.clone()),
            workdir: self.workdir.clone(),
            ..defaults
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        let workdir = match &state.config.workdir {
            Some(dir) => dir.display().to_string(),
            None => "$WORKDIR or current directory".to_string(),
        };

        Ok(format!(
            "Initialized dq directory at: {}\n\
             - Config: {}\n\
             - Aliases: {}\n\
             - API port: {}\n\
             - Tool workdir: {}",
            state.dq_dir.display(),
            state.config_path.display(),
            state.alias_path.display(),
            state.config.api_port,
            workdir,
        ))
    }
}
