use serde::{Deserialize, Serialize};

use crate::auri::{Auri, Kind};
use crate::relation::MountStatus;

pub const POLICY_GROUP: &str = "digi.dev";
pub const POLICY_VERSION: &str = "v1";
pub const POLICY_KIND: &str = "yieldpolicy";

/// Kind under which yield policies are stored
pub fn yield_policy_kind() -> Kind {
    Kind::new(POLICY_GROUP, POLICY_VERSION, POLICY_KIND)
}

/// Status a policy drives its mount towards
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyOutcome {
    Active,
    #[default]
    Yielded,
}

impl PolicyOutcome {
    pub fn desired_status(&self) -> MountStatus {
        match self {
            PolicyOutcome::Active => MountStatus::Active,
            PolicyOutcome::Yielded => MountStatus::Yielded,
        }
    }
}

/// Spec of a yield policy digi
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldPolicySpec {
    pub source: Auri,
    pub target: Auri,
    #[serde(default)]
    pub outcome: PolicyOutcome,
}

impl YieldPolicySpec {
    pub fn new(source: Auri, target: Auri) -> Self {
        Self {
            source,
            target,
            outcome: PolicyOutcome::default(),
        }
    }

    pub fn with_outcome(mut self, outcome: PolicyOutcome) -> Self {
        self.outcome = outcome;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_defaults_to_yielded() {
        let spec: YieldPolicySpec = serde_json::from_value(serde_json::json!({
            "source": "db/v1/Store/default/alpha",
            "target": "db/v1/Store/default/beta",
        }))
        .unwrap();
        assert_eq!(spec.outcome, PolicyOutcome::Yielded);
        assert_eq!(spec.outcome.desired_status(), MountStatus::Yielded);
    }

    #[test]
    fn test_rejects_bad_address() {
        let result = serde_json::from_value::<YieldPolicySpec>(serde_json::json!({
            "source": "alpha",
            "target": "db/v1/Store/default/beta",
        }));
        assert!(result.is_err());
    }
}
