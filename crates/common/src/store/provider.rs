use std::fmt::Debug;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::auri::{Auri, Kind};
use crate::relation::{MountRefs, PipeRefs};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("digi not found: {0}")]
    NotFound(Auri),
    #[error("digi already exists: {0}")]
    AlreadyExists(Auri),
    /// The stored version moved on since the caller read it
    #[error("conflicting update of {auri}: expected version {expected}, found {actual}")]
    Conflict {
        auri: Auri,
        expected: u64,
        actual: u64,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Persisted state of one digi as seen through the relation store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Digi {
    pub auri: Auri,
    /// Bumped by the store on every write; used for optimistic concurrency
    #[serde(default)]
    pub resource_version: u64,
    #[serde(default)]
    pub spec: serde_json::Value,
    #[serde(default)]
    pub mounts: MountRefs,
    #[serde(default)]
    pub pipes: PipeRefs,
}

impl Digi {
    pub fn new(auri: Auri) -> Self {
        Self {
            auri,
            resource_version: 0,
            spec: serde_json::Value::Null,
            mounts: MountRefs::new(),
            pipes: PipeRefs::new(),
        }
    }

    pub fn with_spec(mut self, spec: serde_json::Value) -> Self {
        self.spec = spec;
        self
    }
}

/// Filter for `list` and `watch`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    pub kind: Option<Kind>,
    pub namespace: Option<String>,
}

impl Selector {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn kind(kind: Kind) -> Self {
        Self {
            kind: Some(kind),
            namespace: None,
        }
    }

    pub fn matches(&self, auri: &Auri) -> bool {
        self.kind.as_ref().map_or(true, |k| k == &auri.kind)
            && self
                .namespace
                .as_ref()
                .map_or(true, |ns| ns == &auri.namespace)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    Added(Digi),
    Modified(Digi),
    Deleted(Digi),
}

impl WatchEvent {
    pub fn digi(&self) -> &Digi {
        match self {
            WatchEvent::Added(d) | WatchEvent::Modified(d) | WatchEvent::Deleted(d) => d,
        }
    }
}

/// Lazy stream of changes. It ends when the underlying transport is
/// interrupted or events were dropped; consumers re-subscribe and resync.
pub type WatchStream = BoxStream<'static, WatchEvent>;

/// Typed access to the object runtime that stores digis
#[async_trait]
pub trait RelationStore: Send + Sync + Debug + 'static {
    async fn get(&self, auri: &Auri) -> Result<Digi, StoreError>;

    /// Insert a new digi; fails with `AlreadyExists` if the address is taken
    async fn create(&self, digi: Digi) -> Result<Digi, StoreError>;

    /// Replace a digi if its stored version still equals `digi.resource_version`
    ///
    /// Should fail with the following errors to be considered correct:
    /// * `Err(StoreError::NotFound)` - the digi does not exist
    /// * `Err(StoreError::Conflict)` - the digi was written since it was read
    async fn update(&self, digi: Digi) -> Result<Digi, StoreError>;

    async fn delete(&self, auri: &Auri) -> Result<Digi, StoreError>;

    async fn list(&self, selector: &Selector) -> Result<Vec<Digi>, StoreError>;

    async fn watch(&self, selector: &Selector) -> Result<WatchStream, StoreError>;
}
