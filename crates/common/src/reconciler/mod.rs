//! Yield-Policy Reconciler
//!
//! Drives every mount named by a yield policy towards the status the policy
//! asks for. The reconciler is level-triggered: each pass reads the current
//! policy and mount from the store and applies the remaining transitions, so
//! a missed or duplicated event only costs an extra pass.
//!
//! Two tasks cooperate. The watcher subscribes to store changes and forwards
//! them over a channel, re-subscribing whenever the stream ends, and lists
//! all policies on every (re)subscription and periodic resync tick. The
//! worker loop turns those triggers into policy keys, runs up to
//! `workers` keys concurrently (never the same key twice at once) and
//! schedules a backoff retry for passes that failed transiently.

use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, StreamExt};
use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::auri::Auri;
use crate::engine::MountEngine;
use crate::error::RelationError;
use crate::relation::{yield_policy_kind, MountStatus, PolicyOutcome, YieldPolicySpec};
use crate::store::{Digi, Selector, WatchEvent};

mod backoff;
mod queue;

pub use backoff::BackoffConfig;

use queue::WorkQueue;

pub const DEFAULT_RESYNC_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Full relist of policies, independent of watch events
    pub resync_interval: Duration,
    /// Policies reconciled concurrently
    pub workers: usize,
    pub backoff: BackoffConfig,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            resync_interval: DEFAULT_RESYNC_INTERVAL,
            workers: DEFAULT_WORKERS,
            backoff: BackoffConfig::default(),
        }
    }
}

/// What a single reconciliation pass did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Convergence {
    /// The mount already had the desired status
    InSync,
    /// The mount was moved from `from` to `to`
    Converged { from: MountStatus, to: MountStatus },
    /// The policy names a mount that does not exist (yet)
    NoMount,
    /// The policy itself is gone
    Removed,
}

/// Cached policies, plus which policies care about which target
#[derive(Debug, Default)]
struct PolicyIndex {
    specs: HashMap<Auri, YieldPolicySpec>,
    by_target: HashMap<Auri, HashSet<Auri>>,
}

impl PolicyIndex {
    fn observe(&mut self, key: &Auri, spec: YieldPolicySpec) {
        self.forget(key);
        self.by_target
            .entry(spec.target.clone())
            .or_default()
            .insert(key.clone());
        self.specs.insert(key.clone(), spec);
    }

    fn forget(&mut self, key: &Auri) {
        let Some(old) = self.specs.remove(key) else {
            return;
        };
        if let Some(keys) = self.by_target.get_mut(&old.target) {
            keys.remove(key);
            if keys.is_empty() {
                self.by_target.remove(&old.target);
            }
        }
    }

    fn for_target(&self, target: &Auri) -> Vec<Auri> {
        self.by_target
            .get(target)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn keys(&self) -> Vec<Auri> {
        self.specs.keys().cloned().collect()
    }
}

/// Input to the worker loop
#[derive(Debug)]
enum Trigger {
    Event(WatchEvent),
    /// Every policy currently in the store
    Snapshot(Vec<Digi>),
}

type Pass = (Auri, Result<Convergence, RelationError>);

#[derive(Debug, Clone)]
pub struct Reconciler {
    engine: MountEngine,
    config: ReconcilerConfig,
    index: Arc<RwLock<PolicyIndex>>,
}

impl Reconciler {
    pub fn new(engine: MountEngine, config: ReconcilerConfig) -> Self {
        Self {
            engine,
            config,
            index: Arc::new(RwLock::new(PolicyIndex::default())),
        }
    }

    /// Policies currently known to the reconciler
    pub fn policies(&self) -> Vec<Auri> {
        self.index.read().keys()
    }

    /// Run one reconciliation pass for the policy stored at `key`
    ///
    /// Safe to call repeatedly: a pass over an already converged mount does
    /// not write anything.
    pub async fn reconcile_once(&self, key: &Auri) -> Result<Convergence, RelationError> {
        let policy = match self.engine.relations().get(key).await {
            Ok(policy) => policy,
            Err(RelationError::DigiNotFound(_)) => {
                self.index.write().forget(key);
                tracing::debug!(policy = %key, "policy removed");
                return Ok(Convergence::Removed);
            }
            Err(e) => return Err(e),
        };
        let spec = parse_policy(&policy)?;
        self.index.write().observe(key, spec.clone());

        let mount = match self.engine.get(&spec.source, &spec.target).await {
            Ok(mount) => mount,
            Err(RelationError::MountNotFound { .. }) | Err(RelationError::DigiNotFound(_)) => {
                tracing::debug!(
                    policy = %key,
                    source = %spec.source,
                    target = %spec.target,
                    "mount does not exist, waiting"
                );
                return Ok(Convergence::NoMount);
            }
            Err(e) => return Err(e),
        };

        let from = mount.status;
        let desired = spec.outcome.desired_status();
        if from == desired {
            return Ok(Convergence::InSync);
        }

        let to = match spec.outcome {
            PolicyOutcome::Active => self.engine.activate(&spec.source, &spec.target).await?.status,
            PolicyOutcome::Yielded => {
                if from == MountStatus::Inactive {
                    self.engine.activate(&spec.source, &spec.target).await?;
                }
                self.engine
                    .yield_mount(&spec.source, &spec.target)
                    .await?
                    .status
            }
        };

        tracing::info!(policy = %key, %from, %to, "policy reconciled");
        Ok(Convergence::Converged { from, to })
    }

    /// Reconcile until `shutdown` fires or its sender is dropped
    pub async fn run(self, mut shutdown: watch::Receiver<()>) {
        let (trigger_tx, trigger_rx) = flume::unbounded();
        let watcher = tokio::spawn(
            self.clone()
                .watch_store(trigger_tx, shutdown.clone())
                .instrument(tracing::info_span!("reconciler_watch")),
        );

        let mut queue = WorkQueue::new();
        let mut passes: JoinSet<Pass> = JoinSet::new();
        let mut retries: JoinSet<Auri> = JoinSet::new();
        let mut attempts: HashMap<Auri, u32> = HashMap::new();
        let workers = self.config.workers.max(1);

        tracing::info!(workers, "reconciler started");

        loop {
            while passes.len() < workers {
                let Some(key) = queue.pop() else {
                    break;
                };
                let this = self.clone();
                let span = tracing::debug_span!("reconcile", policy = %key);
                passes.spawn(
                    async move {
                        // a panicking pass still has to release its key
                        let result = AssertUnwindSafe(this.reconcile_once(&key))
                            .catch_unwind()
                            .await
                            .unwrap_or_else(|_| Err(RelationError::PassPanicked(key.clone())));
                        (key, result)
                    }
                    .instrument(span),
                );
            }

            tokio::select! {
                _ = shutdown.changed() => break,

                trigger = trigger_rx.recv_async() => match trigger {
                    Ok(Trigger::Event(event)) => {
                        for key in self.keys_for_event(&event) {
                            queue.push(key);
                        }
                    }
                    Ok(Trigger::Snapshot(policies)) => {
                        for key in self.apply_snapshot(policies) {
                            queue.push(key);
                        }
                    }
                    Err(_) => {
                        tracing::warn!("reconciler watcher exited");
                        break;
                    }
                },

                Some(joined) = passes.join_next(), if !passes.is_empty() => {
                    let (key, result) = match joined {
                        Ok(pass) => pass,
                        // panics are caught inside the pass, so only cancellation lands here
                        Err(e) => {
                            tracing::error!("reconcile task cancelled: {}", e);
                            continue;
                        }
                    };
                    queue.done(&key);
                    match result {
                        Ok(_) => {
                            attempts.remove(&key);
                        }
                        Err(e) if e.is_transient() => {
                            let attempt = attempts.entry(key.clone()).or_insert(0);
                            *attempt = attempt.saturating_add(1);
                            let delay = self.config.backoff.delay_for_attempt(*attempt);
                            tracing::warn!(
                                policy = %key,
                                attempt = *attempt,
                                ?delay,
                                "reconcile failed, retrying: {}",
                                e
                            );
                            retries.spawn(async move {
                                tokio::time::sleep(delay).await;
                                key
                            });
                        }
                        Err(e) => {
                            attempts.remove(&key);
                            tracing::error!(policy = %key, "reconcile failed: {}", e);
                        }
                    }
                }

                Some(joined) = retries.join_next(), if !retries.is_empty() => {
                    if let Ok(key) = joined {
                        queue.push(key);
                    }
                }
            }
        }

        watcher.abort();
        passes.shutdown().await;
        retries.shutdown().await;
        tracing::info!("reconciler stopped");
    }

    /// Forward store changes to the worker loop until shutdown
    async fn watch_store(self, triggers: flume::Sender<Trigger>, mut shutdown: watch::Receiver<()>) {
        let relations = self.engine.relations();
        let policies = Selector::kind(yield_policy_kind());
        let mut resync = tokio::time::interval(self.config.resync_interval);
        resync.tick().await;
        let mut failures: u32 = 0;

        loop {
            let mut stream = match relations.watch(&Selector::all()).await {
                Ok(stream) => {
                    failures = 0;
                    stream
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    let delay = self.config.backoff.delay_for_attempt(failures);
                    tracing::warn!(?delay, "failed to watch store: {}", e);
                    tokio::select! {
                        _ = shutdown.changed() => return,
                        _ = tokio::time::sleep(delay) => continue,
                    }
                }
            };

            // subscribe first so nothing written during the list is missed
            if !self.send_snapshot(&triggers, &policies).await {
                return;
            }

            loop {
                tokio::select! {
                    _ = shutdown.changed() => return,

                    event = stream.next() => match event {
                        Some(event) => {
                            if triggers.send_async(Trigger::Event(event)).await.is_err() {
                                return;
                            }
                        }
                        None => {
                            tracing::info!("store watch ended, re-subscribing");
                            break;
                        }
                    },

                    _ = resync.tick() => {
                        tracing::debug!("periodic resync");
                        if !self.send_snapshot(&triggers, &policies).await {
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Returns false once the worker loop is gone
    async fn send_snapshot(&self, triggers: &flume::Sender<Trigger>, policies: &Selector) -> bool {
        match self.engine.relations().list(policies).await {
            Ok(list) => triggers.send_async(Trigger::Snapshot(list)).await.is_ok(),
            Err(e) => {
                tracing::warn!("failed to list policies: {}", e);
                true
            }
        }
    }

    /// Policy keys a store change should wake up
    fn keys_for_event(&self, event: &WatchEvent) -> Vec<Auri> {
        let digi = event.digi();
        if digi.auri.kind == yield_policy_kind() {
            let mut index = self.index.write();
            match event {
                WatchEvent::Deleted(_) => {
                    index.forget(&digi.auri);
                    return Vec::new();
                }
                _ => match parse_policy(digi) {
                    Ok(spec) => index.observe(&digi.auri, spec),
                    Err(e) => {
                        index.forget(&digi.auri);
                        tracing::warn!("ignoring policy: {}", e);
                        return Vec::new();
                    }
                },
            }
            return vec![digi.auri.clone()];
        }
        self.index.read().for_target(&digi.auri)
    }

    /// Replace the cached policies with a fresh listing and return every key
    /// that needs a pass
    fn apply_snapshot(&self, policies: Vec<Digi>) -> Vec<Auri> {
        let mut index = self.index.write();
        let listed: HashSet<Auri> = policies.iter().map(|p| p.auri.clone()).collect();
        for stale in index.keys().into_iter().filter(|k| !listed.contains(k)) {
            index.forget(&stale);
        }

        let mut keys = Vec::with_capacity(policies.len());
        for policy in policies {
            match parse_policy(&policy) {
                Ok(spec) => {
                    index.observe(&policy.auri, spec);
                    keys.push(policy.auri);
                }
                Err(e) => {
                    index.forget(&policy.auri);
                    tracing::warn!("ignoring policy: {}", e);
                }
            }
        }
        keys
    }
}

fn parse_policy(digi: &Digi) -> Result<YieldPolicySpec, RelationError> {
    serde_json::from_value(digi.spec.clone()).map_err(|source| RelationError::InvalidPolicy {
        auri: digi.auri.clone(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auri(name: &str) -> Auri {
        Auri::new("db", "v1", "Store", name)
    }

    fn policy(name: &str) -> Auri {
        let kind = yield_policy_kind();
        Auri::new(&kind.group, &kind.version, &kind.name, name)
    }

    #[test]
    fn test_index_tracks_target_changes() {
        let mut index = PolicyIndex::default();
        let key = policy("p");
        index.observe(&key, YieldPolicySpec::new(auri("a"), auri("b")));
        assert_eq!(index.for_target(&auri("b")), vec![key.clone()]);

        index.observe(&key, YieldPolicySpec::new(auri("a"), auri("c")));
        assert!(index.for_target(&auri("b")).is_empty());
        assert_eq!(index.for_target(&auri("c")), vec![key.clone()]);

        index.forget(&key);
        assert!(index.for_target(&auri("c")).is_empty());
        assert!(index.keys().is_empty());
    }

    #[test]
    fn test_parse_policy_rejects_garbage() {
        let digi = Digi::new(policy("p")).with_spec(serde_json::json!({ "source": 1 }));
        let err = parse_policy(&digi).unwrap_err();
        assert!(matches!(err, RelationError::InvalidPolicy { .. }));
    }
}
