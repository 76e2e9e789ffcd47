use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const DEFAULT_NAMESPACE: &str = "default";

/// Number of `/`-separated fields in the textual form
const AURI_FIELDS: usize = 5;

/// Characters that would end or re-encode a URL path segment
const RESERVED: [char; 3] = ['?', '#', '%'];

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum AuriError {
    #[error("expected 5 fields (group/version/kind/namespace/name), got {0}")]
    FieldCount(usize),
    #[error("empty {0} field")]
    EmptyField(&'static str),
    #[error("whitespace in {0} field")]
    Whitespace(&'static str),
    #[error("reserved character {1:?} in {0} field")]
    Reserved(&'static str, char),
}

/// Schema identity of a digi
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Kind {
    pub group: String,
    pub version: String,
    pub name: String,
}

impl Kind {
    pub fn new(group: impl Into<String>, version: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.group, self.version, self.name)
    }
}

/// Addressable URI of a single digi
///
/// The canonical text form is `group/version/kind/namespace/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Auri {
    pub kind: Kind,
    pub namespace: String,
    pub name: String,
}

impl Auri {
    /// Build an address in the default namespace
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind: Kind::new(group, version, kind),
            namespace: DEFAULT_NAMESPACE.to_string(),
            name: name.into(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// `namespace/name`, the key used in a target's mount references
    pub fn namespaced_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl fmt::Display for Auri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
    }
}

impl FromStr for Auri {
    type Err = AuriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        if parts.len() != AURI_FIELDS {
            return Err(AuriError::FieldCount(parts.len()));
        }

        const NAMES: [&str; AURI_FIELDS] = ["group", "version", "kind", "namespace", "name"];
        for (part, field) in parts.iter().zip(NAMES) {
            if part.is_empty() {
                return Err(AuriError::EmptyField(field));
            }
            if part.chars().any(char::is_whitespace) {
                return Err(AuriError::Whitespace(field));
            }
            if let Some(c) = part.chars().find(|c| RESERVED.contains(c)) {
                return Err(AuriError::Reserved(field, c));
            }
        }

        Ok(Self {
            kind: Kind::new(parts[0], parts[1], parts[2]),
            namespace: parts[3].to_string(),
            name: parts[4].to_string(),
        })
    }
}

impl Serialize for Auri {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Auri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for text in [
            "db/v1/Store/default/alpha",
            "mock.digi.dev/v1/unilamps/lab/l1",
            "digi.dev/v1/yieldpolicy/kube-system/p-1",
        ] {
            let auri: Auri = text.parse().unwrap();
            assert_eq!(auri.to_string(), text);
        }
    }

    #[test]
    fn test_parse_fields() {
        let auri: Auri = "db/v1/Store/default/alpha".parse().unwrap();
        assert_eq!(auri.kind, Kind::new("db", "v1", "Store"));
        assert_eq!(auri.namespace, "default");
        assert_eq!(auri.name, "alpha");
        assert_eq!(auri.namespaced_name(), "default/alpha");
        assert_eq!(auri, Auri::new("db", "v1", "Store", "alpha"));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(
            "db/v1/Store/alpha".parse::<Auri>(),
            Err(AuriError::FieldCount(4))
        );
        assert_eq!(
            "db/v1/Store/default/alpha/extra".parse::<Auri>(),
            Err(AuriError::FieldCount(6))
        );
        assert_eq!(
            "db//Store/default/alpha".parse::<Auri>(),
            Err(AuriError::EmptyField("version"))
        );
        assert_eq!(
            "db/v1/Store/default/".parse::<Auri>(),
            Err(AuriError::EmptyField("name"))
        );
        assert_eq!(
            "db/v1/St ore/default/a".parse::<Auri>(),
            Err(AuriError::Whitespace("kind"))
        );
        assert!("".parse::<Auri>().is_err());
        assert!("////".parse::<Auri>().is_err());
        assert!("alpha".parse::<Auri>().is_err());
    }

    #[test]
    fn test_parse_rejects_url_reserved_characters() {
        assert_eq!(
            "db/v1/Store/default/alpha?x=1".parse::<Auri>(),
            Err(AuriError::Reserved("name", '?'))
        );
        assert_eq!(
            "db/v1/Store/def#ault/alpha".parse::<Auri>(),
            Err(AuriError::Reserved("namespace", '#'))
        );
        assert_eq!(
            "db/v1/St%2Fore/default/alpha".parse::<Auri>(),
            Err(AuriError::Reserved("kind", '%'))
        );
        assert!("db.io/v1/Store/default/alpha-1".parse::<Auri>().is_ok());
    }

    #[test]
    fn test_equality_needs_all_fields() {
        let a = Auri::new("db", "v1", "Store", "alpha");
        assert_ne!(a, a.clone().with_namespace("other"));
        assert_ne!(a, Auri::new("db", "v2", "Store", "alpha"));
    }

    #[test]
    fn test_serde_uses_text_form() {
        let auri = Auri::new("db", "v1", "Store", "alpha");
        let json = serde_json::to_string(&auri).unwrap();
        assert_eq!(json, "\"db/v1/Store/default/alpha\"");
        let back: Auri = serde_json::from_str(&json).unwrap();
        assert_eq!(back, auri);
        assert!(serde_json::from_str::<Auri>("\"not-an-auri\"").is_err());
    }
}
