use clap::{Args, Subcommand};

use common::alias::AliasError;
use common::error::RelationError;
use common::resolver::parse_auri;
use dspace_daemon::state::StateError;

#[derive(Args, Debug, Clone)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Alias {
    #[command(subcommand)]
    pub command: Option<AliasCommand>,

    /// Auri to alias; lists all aliases when omitted
    pub auri: Option<String>,

    /// Name of the alias
    #[arg(requires = "auri")]
    pub name: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum AliasCommand {
    /// Clear all aliases
    Clear,
    /// Resolve an alias
    Resolve { name: String },
    /// Remove an alias
    Rm { name: String },
}

#[derive(Debug, thiserror::Error)]
pub enum AliasOpError {
    #[error("{0}")]
    Alias(#[from] AliasError),
    #[error("{0}")]
    Relation(#[from] RelationError),
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("an alias needs both AURI and ALIAS")]
    MissingName,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Alias {
    type Error = AliasOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let table = ctx.state()?.alias_table();

        match (&self.command, &self.auri, &self.name) {
            (Some(AliasCommand::Clear), _, _) => {
                table.clear()?;
                Ok(String::new())
            }
            (Some(AliasCommand::Resolve { name }), _, _) => Ok(table.resolve(name)?.to_string()),
            (Some(AliasCommand::Rm { name }), _, _) => {
                let auri = table.remove(name)?;
                Ok(format!("removed {}: {}", name, auri))
            }
            (None, None, _) => Ok(table
                .list()?
                .into_iter()
                .map(|alias| format!("{}: {}", alias.name, alias.auri))
                .collect::<Vec<_>>()
                .join("\n")),
            (None, Some(auri), Some(name)) => {
                let auri = parse_auri(auri)?;
                table.set(name, auri)?;
                Ok(String::new())
            }
            (None, Some(_), None) => Err(AliasOpError::MissingName),
        }
    }
}
