use std::sync::Arc;

use common::engine::{DigiRegistry, MountEngine, PipeComposer};
use common::reconciler::Reconciler;
use common::store::{MemoryStore, RelationStore};

use crate::ServiceConfig;

/// Everything the API handlers and background tasks share
#[derive(Debug, Clone)]
pub struct State {
    store: Arc<dyn RelationStore>,
    digis: DigiRegistry,
    mounts: MountEngine,
    pipes: PipeComposer,
    reconciler: Reconciler,
}

impl State {
    /// State backed by a fresh in-process relation store
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), config)
    }

    pub fn with_store(store: Arc<dyn RelationStore>, config: &ServiceConfig) -> Self {
        let mounts = MountEngine::new(store.clone(), config.engine.clone());
        Self {
            digis: DigiRegistry::new(store.clone(), config.engine.clone()),
            pipes: PipeComposer::new(store.clone(), config.engine.clone()),
            reconciler: Reconciler::new(mounts.clone(), config.reconciler.clone()),
            mounts,
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn RelationStore> {
        &self.store
    }

    pub fn digis(&self) -> &DigiRegistry {
        &self.digis
    }

    pub fn mounts(&self) -> &MountEngine {
        &self.mounts
    }

    pub fn pipes(&self) -> &PipeComposer {
        &self.pipes
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }
}
