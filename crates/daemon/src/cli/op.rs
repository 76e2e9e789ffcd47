use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use url::Url;

use common::resolver::Resolver;
use dspace_daemon::http_server::api::client::{ApiClient, ApiError};
use dspace_daemon::state::{AppConfig, AppState, StateError};
use dspace_daemon::tool::MakeRunner;

/// Environment variable consulted for the tool working directory when the
/// config does not set one
pub const WORKDIR_ENV: &str = "WORKDIR";

/// Resolve the remote URL for the API client.
///
/// Priority: explicit `--remote` flag > config file `api_port` > default port.
pub fn resolve_remote(
    explicit: Option<Url>,
    config_path: Option<PathBuf>,
) -> Result<Url, url::ParseError> {
    if let Some(url) = explicit {
        return Ok(url);
    }
    let port = AppState::load(config_path)
        .map(|state| state.config.api_port)
        .unwrap_or_else(|_| AppConfig::default().api_port);
    Url::parse(&format!("http://localhost:{}", port))
}

#[derive(Clone)]
pub struct OpContext {
    /// API client (always initialized with default or custom URL)
    pub client: ApiClient,
    /// Optional custom config path (defaults to ~/.dq)
    pub config_path: Option<PathBuf>,
}

impl OpContext {
    /// Create context with custom remote URL and optional config path
    pub fn new(remote: Url, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        Ok(Self {
            client: ApiClient::new(&remote)?,
            config_path,
        })
    }

    /// Local state, falling back to defaults when `dq init` was never run
    pub fn state(&self) -> Result<AppState, StateError> {
        AppState::load_or_default(self.config_path.clone())
    }

    /// Resolver backed by the local alias table
    pub fn resolver(&self) -> Result<Resolver, StateError> {
        Ok(Resolver::new(Arc::new(self.state()?.alias_table())))
    }

    /// Tool runner for the configured working directory
    ///
    /// Falls back to `$WORKDIR`, then to the current directory.
    pub fn make_runner(&self) -> Result<MakeRunner, StateError> {
        let workdir = match self.state()?.config.workdir {
            Some(dir) => dir,
            None => std::env::var_os(WORKDIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        Ok(MakeRunner::new(workdir))
    }
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Output;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::cli::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::cli::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::cli::op::Op for Command {
            type Output = OpOutput;
            type Error = OpError;

            async fn execute(&self, ctx: &$crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(OpOutput::$variant)
                                .map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        OpOutput::$variant(output) => write!(f, "{}", output),
                    )*
                }
            }
        }
    };
}
