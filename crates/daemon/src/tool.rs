//! Build/run tool boundary
//!
//! Packaging and running digis is delegated to a makefile in the configured
//! working directory. Each command runs `make -s <target>` with a small
//! environment map and is considered failed if the process fails or if its
//! combined output mentions `error`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use common::auri::{Auri, Kind, DEFAULT_NAMESPACE};
use serde::Deserialize;
use tokio::process::Command;

pub const MODEL_FILE_NAME: &str = "model.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{target}` exited with {status}:\n{output}")]
    Failed {
        target: String,
        status: std::process::ExitStatus,
        output: String,
    },
    #[error("`{target}` reported an error:\n{output}")]
    Reported { target: String, output: String },
    #[error("cannot read {path}: {source}")]
    ModelIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed {path}: {source}")]
    ModelDecode {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("{path} does not name a complete kind")]
    IncompleteModel { path: PathBuf },
}

/// Runs makefile targets in a working directory
#[derive(Debug, Clone)]
pub struct MakeRunner {
    program: String,
    workdir: PathBuf,
}

impl MakeRunner {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            program: "make".to_string(),
            workdir: workdir.into(),
        }
    }

    /// Use something other than `make`, e.g. a wrapper script
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Run `target` and return its combined stdout and stderr
    pub async fn run(&self, target: &str, env: &BTreeMap<&str, String>) -> Result<String, ToolError> {
        tracing::debug!(program = %self.program, target, workdir = %self.workdir.display(), ?env, "running tool");

        let output = Command::new(&self.program)
            .arg("-s")
            .arg(target)
            .current_dir(&self.workdir)
            .envs(env.iter().map(|(k, v)| (*k, v.as_str())))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| ToolError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(ToolError::Failed {
                target: target.to_string(),
                status: output.status,
                output: combined,
            });
        }
        if combined.to_lowercase().contains("error") {
            return Err(ToolError::Reported {
                target: target.to_string(),
                output: combined,
            });
        }
        Ok(combined)
    }

    /// Kind of a digi as declared by `<workdir>/<kind>/model.yaml`
    pub fn model_kind(&self, kind: &str) -> Result<Kind, ToolError> {
        let path = self.workdir.join(kind).join(MODEL_FILE_NAME);
        let raw = std::fs::read_to_string(&path).map_err(|source| ToolError::ModelIo {
            path: path.clone(),
            source,
        })?;
        let model: Model = serde_yaml::from_str(&raw).map_err(|source| ToolError::ModelDecode {
            path: path.clone(),
            source,
        })?;
        match (model.group, model.version, model.kind) {
            (Some(group), Some(version), Some(name)) => Ok(Kind::new(group, version, name)),
            _ => Err(ToolError::IncompleteModel { path }),
        }
    }

    /// Address of a digi named `name` run from `kind`, in the default namespace
    pub fn model_auri(&self, kind: &str, name: &str) -> Result<Auri, ToolError> {
        let kind = self.model_kind(kind)?;
        Ok(Auri {
            kind,
            namespace: DEFAULT_NAMESPACE.to_string(),
            name: name.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct Model {
    group: Option<String>,
    version: Option<String>,
    kind: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_model_auri() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("lamp")).unwrap();
        std::fs::write(
            dir.path().join("lamp").join(MODEL_FILE_NAME),
            "group: digi.dev\nversion: v1\nkind: Lamp\nmeta:\n  power: on\n",
        )
        .unwrap();

        let runner = MakeRunner::new(dir.path());
        let auri = runner.model_auri("lamp", "l1").unwrap();
        assert_eq!(auri.to_string(), "digi.dev/v1/Lamp/default/l1");

        assert!(matches!(
            runner.model_kind("room"),
            Err(ToolError::ModelIo { .. })
        ));
    }

    #[test]
    fn test_incomplete_model() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("lamp")).unwrap();
        std::fs::write(dir.path().join("lamp").join(MODEL_FILE_NAME), "group: digi.dev\n").unwrap();
        assert!(matches!(
            MakeRunner::new(dir.path()).model_kind("lamp"),
            Err(ToolError::IncompleteModel { .. })
        ));
    }

    #[tokio::test]
    async fn test_output_mentioning_error_fails() {
        let dir = TempDir::new().unwrap();
        let runner = MakeRunner::new(dir.path()).with_program("echo");

        // `echo -s build` succeeds and prints its arguments
        let out = runner.run("build", &BTreeMap::new()).await.unwrap();
        assert!(out.contains("build"));

        let err = runner.run("ERROR", &BTreeMap::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::Reported { .. }));

        let err = MakeRunner::new(dir.path())
            .with_program("false")
            .run("build", &BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Failed { .. }));
    }
}
