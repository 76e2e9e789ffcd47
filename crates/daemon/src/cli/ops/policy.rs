use clap::{Args, Subcommand, ValueEnum};

use common::auri::{Auri, DEFAULT_NAMESPACE};
use common::error::RelationError;
use common::relation::{yield_policy_kind, PolicyOutcome, YieldPolicySpec};
use dspace_daemon::http_server::api::client::ApiError;
use dspace_daemon::http_server::api::v0::digis::DeleteDigiRequest;
use dspace_daemon::http_server::api::v0::policies::{
    ApplyPolicyRequest, ListPoliciesRequest, ListPoliciesResponse, PolicyResponse,
};
use dspace_daemon::state::StateError;

#[derive(Args, Debug, Clone)]
pub struct Policy {
    #[command(subcommand)]
    pub command: PolicyCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PolicyCommand {
    /// Create or replace a yield policy for the mount SRC -> TARGET
    Add {
        name: String,
        source: String,
        target: String,
        /// Status the policy drives the mount to
        #[arg(long, value_enum, default_value_t = Outcome::Yielded)]
        outcome: Outcome,
        #[arg(long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,
    },
    /// List yield policies
    Ls,
    /// Delete a yield policy
    Rm {
        name: String,
        #[arg(long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Active,
    Yielded,
}

impl From<Outcome> for PolicyOutcome {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Active => PolicyOutcome::Active,
            Outcome::Yielded => PolicyOutcome::Yielded,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("{0}")]
    Relation(#[from] RelationError),
    #[error("state error: {0}")]
    State(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Policy {
    type Error = PolicyError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();

        match &self.command {
            PolicyCommand::Add {
                name,
                source,
                target,
                outcome,
                namespace,
            } => {
                let resolver = ctx.resolver()?;
                let spec = YieldPolicySpec::new(resolver.resolve(source)?, resolver.resolve(target)?)
                    .with_outcome((*outcome).into());
                let response: PolicyResponse = client
                    .call(ApplyPolicyRequest {
                        name: name.clone(),
                        namespace: namespace.clone(),
                        spec,
                    })
                    .await?;
                Ok(format!(
                    "{}: {} -> {} ({})",
                    response.auri,
                    response.spec.source,
                    response.spec.target,
                    response.spec.outcome.desired_status()
                ))
            }
            PolicyCommand::Ls => {
                let response: ListPoliciesResponse = client.call(ListPoliciesRequest {}).await?;
                if response.policies.is_empty() {
                    return Ok("No policies found".to_string());
                }
                Ok(response
                    .policies
                    .iter()
                    .map(|policy| format!("{} {}", policy.auri, policy.spec))
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            PolicyCommand::Rm { name, namespace } => {
                let auri = Auri {
                    kind: yield_policy_kind(),
                    namespace: namespace.clone(),
                    name: name.clone(),
                };
                client.call(DeleteDigiRequest { auri: auri.clone() }).await?;
                Ok(format!("deleted {}", auri))
            }
        }
    }
}
