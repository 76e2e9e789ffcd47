use std::sync::Arc;

use crate::auri::Auri;
use crate::error::RelationError;
use crate::relation::{yield_policy_kind, YieldPolicySpec};
use crate::store::{Digi, RelationStore, Selector};

use super::update::Relations;
use super::EngineConfig;

/// Registers, fetches and removes digis and yield policies
#[derive(Debug, Clone)]
pub struct DigiRegistry {
    relations: Relations,
}

impl DigiRegistry {
    pub fn new(store: Arc<dyn RelationStore>, config: EngineConfig) -> Self {
        Self {
            relations: Relations::new(store, config),
        }
    }

    /// Create `auri` or replace its spec; mounts and pipes on an existing
    /// digi are kept
    pub async fn apply(&self, auri: &Auri, spec: serde_json::Value) -> Result<Digi, RelationError> {
        let digi = self.relations.apply_spec(auri, spec).await?;
        tracing::info!(%auri, version = digi.resource_version, "digi applied");
        Ok(digi)
    }

    pub async fn get(&self, auri: &Auri) -> Result<Digi, RelationError> {
        self.relations.get(auri).await
    }

    pub async fn delete(&self, auri: &Auri) -> Result<Digi, RelationError> {
        let digi = self.relations.delete(auri).await?;
        tracing::info!(%auri, "digi deleted");
        Ok(digi)
    }

    pub async fn list(&self, selector: &Selector) -> Result<Vec<Digi>, RelationError> {
        self.relations.list(selector).await
    }

    /// Store a yield policy named `name` in `namespace`
    pub async fn apply_policy(
        &self,
        name: &str,
        namespace: &str,
        spec: &YieldPolicySpec,
    ) -> Result<Digi, RelationError> {
        let kind = yield_policy_kind();
        let auri = Auri::new(kind.group, kind.version, kind.name, name).with_namespace(namespace);
        let value = serde_json::to_value(spec).map_err(|source| RelationError::InvalidPolicy {
            auri: auri.clone(),
            source,
        })?;
        self.apply(&auri, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_reapply_keeps_relations() {
        let store = MemoryStore::new();
        let registry = DigiRegistry::new(Arc::new(store.clone()), EngineConfig::default());
        let auri = Auri::new("db", "v1", "Store", "alpha");

        registry
            .apply(&auri, serde_json::json!({ "size": 1 }))
            .await
            .unwrap();
        let mut digi = store.get(&auri).await.unwrap();
        digi.pipes.insert(
            "input".into(),
            crate::relation::PipeRef {
                source: Auri::new("db", "v1", "Store", "beta"),
                output: "output".into(),
            },
        );
        store.update(digi).await.unwrap();

        let digi = registry
            .apply(&auri, serde_json::json!({ "size": 2 }))
            .await
            .unwrap();
        assert_eq!(digi.spec, serde_json::json!({ "size": 2 }));
        assert_eq!(digi.pipes.len(), 1);
    }

    #[tokio::test]
    async fn test_policy_address() {
        let registry = DigiRegistry::new(Arc::new(MemoryStore::new()), EngineConfig::default());
        let spec = YieldPolicySpec::new(
            Auri::new("db", "v1", "Store", "alpha"),
            Auri::new("db", "v1", "Store", "beta"),
        );
        let digi = registry.apply_policy("p", "lab", &spec).await.unwrap();
        assert_eq!(digi.auri.to_string(), "digi.dev/v1/yieldpolicy/lab/p");
    }
}
