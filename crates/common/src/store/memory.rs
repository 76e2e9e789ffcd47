use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::provider::{Digi, RelationStore, Selector, StoreError, WatchEvent, WatchStream};
use crate::auri::Auri;

/// Events buffered per watcher before it is considered lagging
const WATCH_BUFFER: usize = 1024;

/// In-process object runtime backed by a map
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

#[derive(Debug)]
struct MemoryStoreInner {
    objects: RwLock<BTreeMap<Auri, Digi>>,
    events: RwLock<broadcast::Sender<WatchEvent>>,
    last_version: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(WATCH_BUFFER);
        Self {
            inner: Arc::new(MemoryStoreInner {
                objects: RwLock::new(BTreeMap::new()),
                events: RwLock::new(events),
                last_version: AtomicU64::new(0),
            }),
        }
    }

    /// End every open watch stream, as a dropped connection would
    pub fn interrupt_watches(&self) {
        let (events, _) = broadcast::channel(WATCH_BUFFER);
        *self.inner.events.write() = events;
        tracing::debug!("memory store watches interrupted");
    }

    pub fn len(&self) -> usize {
        self.inner.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn next_version(&self) -> u64 {
        self.inner.last_version.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn publish(&self, event: WatchEvent) {
        // no receivers is fine
        let _ = self.inner.events.read().send(event);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RelationStore for MemoryStore {
    async fn get(&self, auri: &Auri) -> Result<Digi, StoreError> {
        self.inner
            .objects
            .read()
            .get(auri)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(auri.clone()))
    }

    async fn create(&self, mut digi: Digi) -> Result<Digi, StoreError> {
        let mut objects = self.inner.objects.write();
        if objects.contains_key(&digi.auri) {
            return Err(StoreError::AlreadyExists(digi.auri));
        }
        digi.resource_version = self.next_version();
        objects.insert(digi.auri.clone(), digi.clone());
        self.publish(WatchEvent::Added(digi.clone()));
        Ok(digi)
    }

    async fn update(&self, mut digi: Digi) -> Result<Digi, StoreError> {
        let mut objects = self.inner.objects.write();
        let stored = objects
            .get(&digi.auri)
            .ok_or_else(|| StoreError::NotFound(digi.auri.clone()))?;
        if stored.resource_version != digi.resource_version {
            return Err(StoreError::Conflict {
                auri: digi.auri.clone(),
                expected: digi.resource_version,
                actual: stored.resource_version,
            });
        }
        digi.resource_version = self.next_version();
        objects.insert(digi.auri.clone(), digi.clone());
        self.publish(WatchEvent::Modified(digi.clone()));
        Ok(digi)
    }

    async fn delete(&self, auri: &Auri) -> Result<Digi, StoreError> {
        let mut objects = self.inner.objects.write();
        let removed = objects
            .remove(auri)
            .ok_or_else(|| StoreError::NotFound(auri.clone()))?;
        self.publish(WatchEvent::Deleted(removed.clone()));
        Ok(removed)
    }

    async fn list(&self, selector: &Selector) -> Result<Vec<Digi>, StoreError> {
        Ok(self
            .inner
            .objects
            .read()
            .values()
            .filter(|d| selector.matches(&d.auri))
            .cloned()
            .collect())
    }

    async fn watch(&self, selector: &Selector) -> Result<WatchStream, StoreError> {
        let rx = self.inner.events.read().subscribe();
        let selector = selector.clone();

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            match rx.recv().await {
                Ok(event) => Some((event, rx)),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "watch fell behind, closing stream");
                    None
                }
                Err(broadcast::error::RecvError::Closed) => None,
            }
        })
        .filter(move |event| futures::future::ready(selector.matches(&event.digi().auri)));

        Ok(stream.boxed())
    }
}
