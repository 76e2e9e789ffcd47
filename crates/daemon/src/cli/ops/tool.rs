//! Packaging and driver commands, delegated to the digi makefile

use std::collections::BTreeMap;

use clap::Args;

use dspace_daemon::state::StateError;
use dspace_daemon::tool::{MakeRunner, ToolError};

#[derive(Debug, thiserror::Error)]
pub enum ToolOpError {
    #[error("{0}")]
    Tool(#[from] ToolError),
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("unable to create alias: {0}")]
    Alias(#[from] common::alias::AliasError),
}

/// Flags shared by every tool command
#[derive(Args, Debug, Clone, Default)]
pub struct ToolFlags {
    /// Hide tool output
    #[arg(short, long)]
    pub quiet: bool,
}

impl ToolFlags {
    fn render(&self, output: String) -> String {
        if self.quiet {
            String::new()
        } else {
            output.trim_end().to_string()
        }
    }
}

fn kind_env(kind: &str) -> BTreeMap<&'static str, String> {
    BTreeMap::from([("KIND", kind.to_string())])
}

/// List available digi images
#[derive(Args, Debug, Clone)]
pub struct Image {
    #[command(flatten)]
    pub flags: ToolFlags,
}

/// Build a digi image
#[derive(Args, Debug, Clone)]
pub struct Build {
    pub kind: String,
    #[command(flatten)]
    pub flags: ToolFlags,
}

/// Pull a digi image and build it
#[derive(Args, Debug, Clone)]
pub struct Pull {
    pub kind: String,
    #[command(flatten)]
    pub flags: ToolFlags,
}

/// Push a digi image
#[derive(Args, Debug, Clone)]
pub struct Push {
    pub kind: String,
    #[command(flatten)]
    pub flags: ToolFlags,
}

/// Remove a digi image
#[derive(Args, Debug, Clone)]
pub struct Rmi {
    pub kind: String,
    #[command(flatten)]
    pub flags: ToolFlags,
}

/// Print the log of a digi driver
#[derive(Args, Debug, Clone)]
#[command(visible_alias = "logs")]
pub struct Log {
    pub name: String,
    #[command(flatten)]
    pub flags: ToolFlags,
}

/// Run a digi given kind and name
#[derive(Args, Debug, Clone)]
pub struct Run {
    pub kind: String,
    pub name: String,

    /// Run the driver in the local console
    #[arg(short, long)]
    pub local: bool,

    /// Enable driver framework logging
    #[arg(short, long)]
    pub kopf_log: bool,

    /// Do not create an alias to the model
    #[arg(short, long)]
    pub no_alias: bool,

    #[command(flatten)]
    pub flags: ToolFlags,
}

/// Stop a digi given kind and name
#[derive(Args, Debug, Clone)]
pub struct Stop {
    pub kind: String,
    pub name: String,
    #[command(flatten)]
    pub flags: ToolFlags,
}

impl Run {
    fn target(&self) -> &'static str {
        if self.local {
            "test"
        } else {
            "run"
        }
    }

    fn env(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("KIND", self.kind.clone()),
            ("NAME", self.name.clone()),
            ("KOPFLOG", self.kopf_log.to_string()),
        ])
    }
}

fn runner(ctx: &crate::cli::op::OpContext) -> Result<MakeRunner, ToolOpError> {
    Ok(ctx.make_runner()?)
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Image {
    type Error = ToolOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let out = runner(ctx)?.run("list", &BTreeMap::new()).await?;
        Ok(self.flags.render(out))
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Build {
    type Error = ToolOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let out = runner(ctx)?.run("build", &kind_env(&self.kind)).await?;
        Ok(self.flags.render(out))
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Pull {
    type Error = ToolOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let runner = runner(ctx)?;
        let env = kind_env(&self.kind);
        let mut out = runner.run("pull", &env).await?;
        out.push_str(&runner.run("build", &env).await?);
        Ok(self.flags.render(out))
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Push {
    type Error = ToolOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let out = runner(ctx)?.run("push", &kind_env(&self.kind)).await?;
        Ok(self.flags.render(out))
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Rmi {
    type Error = ToolOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let out = runner(ctx)?.run("delete", &kind_env(&self.kind)).await?;
        Ok(self.flags.render(out))
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Log {
    type Error = ToolOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let env = BTreeMap::from([("NAME", self.name.clone())]);
        let out = runner(ctx)?.run("log", &env).await?;
        Ok(self.flags.render(out))
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Run {
    type Error = ToolOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let runner = runner(ctx)?;
        let out = runner.run(self.target(), &self.env()).await?;

        if !self.no_alias {
            let auri = runner.model_auri(&self.kind, &self.name)?;
            ctx.state()?.alias_table().set(&self.name, auri)?;
        }

        let mut rendered = self.flags.render(out);
        if !self.flags.quiet {
            if !rendered.is_empty() {
                rendered.push('\n');
            }
            rendered.push_str(&self.name);
        }
        Ok(rendered)
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Stop {
    type Error = ToolOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let env = BTreeMap::from([("KIND", self.kind.clone()), ("NAME", self.name.clone())]);
        let out = runner(ctx)?.run("stop", &env).await?;
        Ok(self.flags.render(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_target_and_env() {
        let run = Run {
            kind: "lamp".into(),
            name: "l1".into(),
            local: true,
            kopf_log: false,
            no_alias: false,
            flags: ToolFlags::default(),
        };
        assert_eq!(run.target(), "test");
        let env = run.env();
        assert_eq!(env["KIND"], "lamp");
        assert_eq!(env["NAME"], "l1");
        assert_eq!(env["KOPFLOG"], "false");
    }

    #[test]
    fn test_quiet_hides_output() {
        let quiet = ToolFlags { quiet: true };
        assert_eq!(quiet.render("built\n".into()), "");
        assert_eq!(ToolFlags::default().render("built\n".into()), "built");
    }
}
