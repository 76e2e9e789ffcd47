use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::auri::Auri;

pub const DEFAULT_OUTPUT_FIELD: &str = "output";
pub const DEFAULT_INPUT_FIELD: &str = "input";

/// An input binding stored on the target: `input <- source.output`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipeRef {
    pub source: Auri,
    pub output: String,
}

/// Input bindings of one target, keyed by input field
pub type PipeRefs = BTreeMap<String, PipeRef>;

/// One data-flow edge `source.output -> target.input`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipeEdge {
    pub source: Auri,
    pub target: Auri,
    #[serde(default = "default_output")]
    pub output: String,
    #[serde(default = "default_input")]
    pub input: String,
}

fn default_output() -> String {
    DEFAULT_OUTPUT_FIELD.to_string()
}

fn default_input() -> String {
    DEFAULT_INPUT_FIELD.to_string()
}

impl PipeEdge {
    pub fn new(source: Auri, target: Auri) -> Self {
        Self {
            source,
            target,
            output: default_output(),
            input: default_input(),
        }
    }

    pub fn with_fields(mut self, output: impl Into<String>, input: impl Into<String>) -> Self {
        self.output = output.into();
        self.input = input.into();
        self
    }

    /// The binding this edge installs on its target
    pub fn binding(&self) -> PipeRef {
        PipeRef {
            source: self.source.clone(),
            output: self.output.clone(),
        }
    }
}

impl fmt::Display for PipeEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.source, self.output, self.target, self.input
        )
    }
}
