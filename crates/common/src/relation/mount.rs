use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::auri::Auri;
use crate::error::RelationError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountMode {
    /// Mounted state is only visible to the target's driver
    #[default]
    Hide,
    /// Mounted state is also visible through the target's own interface
    Expose,
}

impl fmt::Display for MountMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountMode::Hide => write!(f, "hide"),
            MountMode::Expose => write!(f, "expose"),
        }
    }
}

impl FromStr for MountMode {
    type Err = RelationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "hide" => Ok(MountMode::Hide),
            "expose" => Ok(MountMode::Expose),
            other => Err(RelationError::InvalidMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountStatus {
    #[default]
    Inactive,
    Active,
    /// Control of the mounted state has moved to the target
    Yielded,
}

impl fmt::Display for MountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountStatus::Inactive => write!(f, "inactive"),
            MountStatus::Active => write!(f, "active"),
            MountStatus::Yielded => write!(f, "yielded"),
        }
    }
}

/// A mount of `source` onto `target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mount {
    pub source: Auri,
    pub target: Auri,
    #[serde(default)]
    pub mode: MountMode,
    #[serde(default)]
    pub status: MountStatus,
}

impl Mount {
    pub fn new(source: Auri, target: Auri, mode: MountMode) -> Self {
        Self {
            source,
            target,
            mode,
            status: MountStatus::Inactive,
        }
    }

    /// The digi that currently controls the mounted state
    pub fn controller(&self) -> &Auri {
        match self.status {
            MountStatus::Yielded => &self.target,
            MountStatus::Inactive | MountStatus::Active => &self.source,
        }
    }

    /// Move to `Active`; returns whether the status changed
    pub fn activate(&mut self) -> bool {
        match self.status {
            MountStatus::Active => false,
            MountStatus::Inactive | MountStatus::Yielded => {
                self.status = MountStatus::Active;
                true
            }
        }
    }

    /// Move to `Yielded`; only valid from `Active`. Returns whether the status changed
    pub fn yield_control(&mut self) -> Result<bool, RelationError> {
        match self.status {
            MountStatus::Active => {
                self.status = MountStatus::Yielded;
                Ok(true)
            }
            MountStatus::Yielded => Ok(false),
            MountStatus::Inactive => Err(RelationError::InvalidTransition {
                op: "yield",
                from: self.status,
            }),
        }
    }
}

/// Mounts onto one target, keyed by the source's namespaced name
pub type MountRefs = BTreeMap<String, Mount>;

#[cfg(test)]
mod tests {
    use super::*;

    fn mount() -> Mount {
        Mount::new(
            Auri::new("db", "v1", "Store", "alpha"),
            Auri::new("db", "v1", "Store", "beta"),
            MountMode::Hide,
        )
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("hide".parse::<MountMode>().unwrap(), MountMode::Hide);
        assert_eq!("expose".parse::<MountMode>().unwrap(), MountMode::Expose);
        assert!(matches!(
            "show".parse::<MountMode>(),
            Err(RelationError::InvalidMode(_))
        ));
    }

    #[test]
    fn test_transitions() {
        let mut m = mount();
        assert_eq!(m.status, MountStatus::Inactive);
        assert!(matches!(
            m.yield_control(),
            Err(RelationError::InvalidTransition { op: "yield", .. })
        ));

        assert!(m.activate());
        assert!(!m.activate());
        assert_eq!(m.controller(), &m.source);

        assert!(m.yield_control().unwrap());
        assert!(!m.yield_control().unwrap());
        assert_eq!(m.controller(), &m.target);

        assert!(m.activate());
        assert_eq!(m.status, MountStatus::Active);
    }

    #[test]
    fn test_serialized_form() {
        let json = serde_json::to_value(mount()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "source": "db/v1/Store/default/alpha",
                "target": "db/v1/Store/default/beta",
                "mode": "hide",
                "status": "inactive",
            })
        );
    }
}
