use clap::Args;

use common::engine::{MountOp, MountRequest};
use common::error::RelationError;
use dspace_daemon::http_server::api::client::ApiError;
use dspace_daemon::http_server::api::v0::mounts::{ApplyMountRequest, MountResponse};
use dspace_daemon::state::StateError;

#[derive(Args, Debug, Clone)]
pub struct Mount {
    /// Digi to mount (alias or auri)
    pub source: String,

    /// Digi to mount onto (alias or auri)
    pub target: String,

    /// Mount mode: hide or expose
    pub mode: Option<String>,

    /// Activate the mount
    #[arg(short, long, group = "mount_op")]
    pub activate: bool,

    /// Yield the mount to its target
    #[arg(short, long = "yield", group = "mount_op")]
    pub yield_: bool,

    /// Unmount source from target
    #[arg(short, long, group = "mount_op")]
    pub delete: bool,
}

impl Mount {
    fn op(&self) -> MountOp {
        if self.activate {
            MountOp::Activate
        } else if self.yield_ {
            MountOp::Yield
        } else if self.delete {
            MountOp::Unmount
        } else {
            MountOp::Mount
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MountError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("{0}")]
    Relation(#[from] RelationError),
    #[error("state error: {0}")]
    State(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Mount {
    type Error = MountError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let resolver = ctx.resolver()?;
        let req = MountRequest::resolve(
            &resolver,
            &self.source,
            &self.target,
            self.mode.as_deref(),
        )?;

        let mut client = ctx.client.clone();
        let response: MountResponse = client
            .call(ApplyMountRequest {
                source: req.source,
                target: req.target,
                mode: req.mode,
                op: self.op(),
            })
            .await?;

        let mount = response.mount;
        Ok(match response.op {
            MountOp::Unmount => format!("unmounted {} from {}", mount.source, mount.target),
            op => format!(
                "{}: {} -> {} ({}, {})",
                op, mount.source, mount.target, mount.mode, mount.status
            ),
        })
    }
}
