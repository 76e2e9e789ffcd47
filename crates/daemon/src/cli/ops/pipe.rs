use clap::Args;

use common::engine::{PipeOp, Piper};
use common::error::RelationError;
use dspace_daemon::http_server::api::client::ApiError;
use dspace_daemon::http_server::api::v0::pipes::{ApplyPipeRequest, PipeResponse};
use dspace_daemon::state::StateError;

#[derive(Args, Debug, Clone)]
pub struct Pipe {
    /// `SRC TARGET`, or a single quoted chain `"d1 | d2 | .."`
    #[arg(required = true, num_args = 1..=2)]
    pub digis: Vec<String>,

    /// Unpipe source from target
    #[arg(short, long)]
    pub delete: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum PipeError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("{0}")]
    Relation(#[from] RelationError),
    #[error("state error: {0}")]
    State(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Pipe {
    type Error = PipeError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let resolver = ctx.resolver()?;
        let piper = match self.digis.as_slice() {
            [source, target] => Piper::new(&resolver, source, target)?,
            chain => Piper::from_chain(&resolver, &chain.join(" | "))?,
        };

        let op = if self.delete {
            PipeOp::Unpipe
        } else {
            PipeOp::Pipe
        };

        let mut client = ctx.client.clone();
        let response: PipeResponse = client
            .call(ApplyPipeRequest {
                edges: piper.into_edges(),
                op,
            })
            .await?;

        let verb = match response.op {
            PipeOp::Pipe => "piped",
            PipeOp::Unpipe => "unpiped",
        };
        Ok(response
            .edges
            .iter()
            .map(|edge| format!("{} {}", verb, edge))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
