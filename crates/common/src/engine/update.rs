use std::future::Future;
use std::sync::Arc;

use crate::auri::Auri;
use crate::error::RelationError;
use crate::store::{Digi, RelationStore, Selector, StoreError, WatchStream};

use super::EngineConfig;

/// Result of applying a mutation to a freshly read digi
pub(crate) enum Edit<T> {
    /// Nothing to write back
    Unchanged(T),
    Changed(T),
}

/// Store access shared by the engines: every call is bounded by the request
/// timeout and writes go through optimistic read-modify-write.
#[derive(Debug, Clone)]
pub(crate) struct Relations {
    store: Arc<dyn RelationStore>,
    config: EngineConfig,
}

impl Relations {
    pub fn new(store: Arc<dyn RelationStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn RelationStore> {
        &self.store
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, RelationError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.config.request_timeout, fut).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(RelationError::Timeout),
        }
    }

    pub async fn get(&self, auri: &Auri) -> Result<Digi, RelationError> {
        self.bounded(self.store.get(auri)).await
    }

    /// Read `auri`, apply `edit`, and write it back if it changed.
    ///
    /// A concurrent write to the same digi makes the update fail with a
    /// version conflict; the edit is then re-applied to a fresh read, up to
    /// `max_update_attempts` times.
    pub async fn modify<T, F>(&self, auri: &Auri, mut edit: F) -> Result<T, RelationError>
    where
        F: FnMut(&mut Digi) -> Result<Edit<T>, RelationError>,
    {
        let attempts = self.config.max_update_attempts.max(1);
        for attempt in 1..=attempts {
            let mut digi = self.get(auri).await?;
            let value = match edit(&mut digi)? {
                Edit::Unchanged(value) => return Ok(value),
                Edit::Changed(value) => value,
            };

            match self.bounded(self.store.update(digi)).await {
                Ok(_) => return Ok(value),
                Err(RelationError::Store(StoreError::Conflict {
                    expected, actual, ..
                })) => {
                    tracing::debug!(
                        %auri,
                        attempt,
                        expected,
                        actual,
                        "concurrent update, retrying with a fresh read"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        tracing::warn!(%auri, attempts, "giving up on conflicting update");
        Err(RelationError::UpdateConflict(auri.clone(), attempts))
    }

    /// Create `auri` with `spec`, or replace the spec of an existing digi
    /// while keeping its relations
    pub async fn apply_spec(
        &self,
        auri: &Auri,
        spec: serde_json::Value,
    ) -> Result<Digi, RelationError> {
        let created = self
            .bounded(self.store.create(Digi::new(auri.clone()).with_spec(spec.clone())))
            .await;
        match created {
            Ok(digi) => Ok(digi),
            Err(RelationError::Store(StoreError::AlreadyExists(_))) => {
                self.modify(auri, |digi| {
                    if digi.spec == spec {
                        return Ok(Edit::Unchanged(()));
                    }
                    digi.spec = spec.clone();
                    Ok(Edit::Changed(()))
                })
                .await?;
                self.get(auri).await
            }
            Err(e) => Err(e),
        }
    }

    pub async fn delete(&self, auri: &Auri) -> Result<Digi, RelationError> {
        self.bounded(self.store.delete(auri)).await
    }

    pub async fn list(&self, selector: &Selector) -> Result<Vec<Digi>, RelationError> {
        self.bounded(self.store.list(selector)).await
    }

    pub async fn watch(&self, selector: &Selector) -> Result<WatchStream, RelationError> {
        self.bounded(self.store.watch(selector)).await
    }
}
