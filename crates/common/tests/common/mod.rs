//! Shared test utilities for relation integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::auri::Auri;
use common::engine::{EngineConfig, MountEngine, PipeComposer};
use common::relation::{yield_policy_kind, YieldPolicySpec};
use common::store::{
    Digi, MemoryStore, RelationStore, Selector, StoreError, WatchStream,
};

/// Route engine logs to the test output; set RUST_LOG to see them
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn store(name: &str) -> Auri {
    Auri::new("db", "v1", "Store", name)
}

pub fn policy(name: &str) -> Auri {
    let kind = yield_policy_kind();
    Auri::new(kind.group, kind.version, kind.name, name)
}

/// Create an empty digi for every name
pub async fn seed(store_impl: &dyn RelationStore, names: &[&str]) -> Vec<Auri> {
    let mut out = Vec::new();
    for name in names {
        let auri = store(name);
        store_impl.create(Digi::new(auri.clone())).await.unwrap();
        out.push(auri);
    }
    out
}

pub async fn put_policy(store_impl: &dyn RelationStore, key: &Auri, spec: &YieldPolicySpec) {
    let digi = Digi::new(key.clone()).with_spec(serde_json::to_value(spec).unwrap());
    store_impl.create(digi).await.unwrap();
}

pub fn engines(store_impl: Arc<dyn RelationStore>) -> (MountEngine, PipeComposer) {
    (
        MountEngine::new(store_impl.clone(), EngineConfig::default()),
        PipeComposer::new(store_impl, EngineConfig::default()),
    )
}

/// Poll `check` until it holds or `timeout` elapses
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// A [`MemoryStore`] that can be told to misbehave
#[derive(Debug, Clone, Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    faults: Arc<Faults>,
}

#[derive(Debug, Default)]
struct Faults {
    /// Updates that fail as if the runtime were unreachable
    unavailable_updates: AtomicUsize,
    /// Updates preceded by a competing write to the same digi
    racing_updates: AtomicUsize,
    /// Reads that never answer
    stall_reads: AtomicBool,
    /// Reads that panic instead of answering
    panicking_reads: AtomicUsize,
    /// Updates seen, successful or not
    updates: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_updates(&self, n: usize) {
        self.faults.unavailable_updates.store(n, Ordering::SeqCst);
    }

    pub fn race_updates(&self, n: usize) {
        self.faults.racing_updates.store(n, Ordering::SeqCst);
    }

    pub fn stall_reads(&self, stall: bool) {
        self.faults.stall_reads.store(stall, Ordering::SeqCst);
    }

    pub fn panic_reads(&self, n: usize) {
        self.faults.panicking_reads.store(n, Ordering::SeqCst);
    }

    pub fn updates(&self) -> usize {
        self.faults.updates.load(Ordering::SeqCst)
    }
}

fn take(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl RelationStore for FlakyStore {
    async fn get(&self, auri: &Auri) -> Result<Digi, StoreError> {
        if self.faults.stall_reads.load(Ordering::SeqCst) {
            futures::future::pending::<()>().await;
        }
        if take(&self.faults.panicking_reads) {
            panic!("injected panic reading {}", auri);
        }
        self.inner.get(auri).await
    }

    async fn create(&self, digi: Digi) -> Result<Digi, StoreError> {
        self.inner.create(digi).await
    }

    async fn update(&self, digi: Digi) -> Result<Digi, StoreError> {
        self.faults.updates.fetch_add(1, Ordering::SeqCst);
        if take(&self.faults.unavailable_updates) {
            return Err(StoreError::Unavailable("injected fault".into()));
        }
        if take(&self.faults.racing_updates) {
            let current = self.inner.get(&digi.auri).await?;
            self.inner.update(current).await?;
        }
        self.inner.update(digi).await
    }

    async fn delete(&self, auri: &Auri) -> Result<Digi, StoreError> {
        self.inner.delete(auri).await
    }

    async fn list(&self, selector: &Selector) -> Result<Vec<Digi>, StoreError> {
        self.inner.list(selector).await
    }

    async fn watch(&self, selector: &Selector) -> Result<WatchStream, StoreError> {
        self.inner.watch(selector).await
    }
}
