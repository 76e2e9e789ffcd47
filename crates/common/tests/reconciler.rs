//! Integration tests for the yield-policy reconciler

mod common;

use std::sync::Arc;
use std::time::Duration;

use ::common::engine::{EngineConfig, MountEngine};
use ::common::reconciler::{BackoffConfig, Convergence, Reconciler, ReconcilerConfig};
use ::common::relation::{MountMode, MountStatus, PolicyOutcome, YieldPolicySpec};
use ::common::store::{MemoryStore, RelationStore};
use tokio::sync::watch;

fn fast_config() -> ReconcilerConfig {
    ReconcilerConfig {
        resync_interval: Duration::from_millis(200),
        workers: 2,
        backoff: BackoffConfig::Fixed {
            delay: Duration::from_millis(20),
        },
    }
}

#[tokio::test]
async fn test_converges_in_one_pass() {
    let backend = MemoryStore::new();
    let digis = common::seed(&backend, &["alpha", "beta"]).await;
    let engine = MountEngine::new(Arc::new(backend.clone()), EngineConfig::default());
    engine
        .mount(&digis[0], &digis[1], MountMode::Hide)
        .await
        .unwrap();

    let key = common::policy("alpha-to-beta");
    common::put_policy(
        &backend,
        &key,
        &YieldPolicySpec::new(digis[0].clone(), digis[1].clone()),
    )
    .await;

    let reconciler = Reconciler::new(engine.clone(), ReconcilerConfig::default());
    let outcome = reconciler.reconcile_once(&key).await.unwrap();
    assert_eq!(
        outcome,
        Convergence::Converged {
            from: MountStatus::Inactive,
            to: MountStatus::Yielded,
        }
    );
    assert_eq!(
        engine.get(&digis[0], &digis[1]).await.unwrap().status,
        MountStatus::Yielded
    );

    // nothing left to do
    let version = backend.get(&digis[1]).await.unwrap().resource_version;
    assert_eq!(reconciler.reconcile_once(&key).await.unwrap(), Convergence::InSync);
    assert_eq!(
        backend.get(&digis[1]).await.unwrap().resource_version,
        version
    );
    assert_eq!(reconciler.policies(), vec![key]);
}

#[tokio::test]
async fn test_active_outcome() {
    let backend = MemoryStore::new();
    let digis = common::seed(&backend, &["alpha", "beta"]).await;
    let engine = MountEngine::new(Arc::new(backend.clone()), EngineConfig::default());
    engine
        .mount(&digis[0], &digis[1], MountMode::Hide)
        .await
        .unwrap();
    engine.activate(&digis[0], &digis[1]).await.unwrap();
    engine.yield_mount(&digis[0], &digis[1]).await.unwrap();

    let key = common::policy("keep-active");
    let spec = YieldPolicySpec::new(digis[0].clone(), digis[1].clone())
        .with_outcome(PolicyOutcome::Active);
    common::put_policy(&backend, &key, &spec).await;

    let reconciler = Reconciler::new(engine.clone(), ReconcilerConfig::default());
    assert_eq!(
        reconciler.reconcile_once(&key).await.unwrap(),
        Convergence::Converged {
            from: MountStatus::Yielded,
            to: MountStatus::Active,
        }
    );
}

#[tokio::test]
async fn test_missing_mount_or_policy_is_not_an_error() {
    let backend = MemoryStore::new();
    let digis = common::seed(&backend, &["alpha", "beta"]).await;
    let engine = MountEngine::new(Arc::new(backend.clone()), EngineConfig::default());
    let reconciler = Reconciler::new(engine, ReconcilerConfig::default());

    let key = common::policy("early");
    common::put_policy(
        &backend,
        &key,
        &YieldPolicySpec::new(digis[0].clone(), digis[1].clone()),
    )
    .await;
    assert_eq!(reconciler.reconcile_once(&key).await.unwrap(), Convergence::NoMount);

    backend.delete(&key).await.unwrap();
    assert_eq!(reconciler.reconcile_once(&key).await.unwrap(), Convergence::Removed);
    assert!(reconciler.policies().is_empty());
}

#[tokio::test]
async fn test_transient_failure_surfaces_and_next_pass_converges() {
    let backend = common::FlakyStore::new();
    let digis = common::seed(&backend, &["alpha", "beta"]).await;
    let engine = MountEngine::new(Arc::new(backend.clone()), EngineConfig::default());
    engine
        .mount(&digis[0], &digis[1], MountMode::Hide)
        .await
        .unwrap();
    let key = common::policy("flaky");
    common::put_policy(
        &backend,
        &key,
        &YieldPolicySpec::new(digis[0].clone(), digis[1].clone()),
    )
    .await;

    let reconciler = Reconciler::new(engine.clone(), ReconcilerConfig::default());
    backend.fail_updates(1);
    let err = reconciler.reconcile_once(&key).await.unwrap_err();
    assert!(err.is_transient());

    let outcome = reconciler.reconcile_once(&key).await.unwrap();
    assert!(matches!(outcome, Convergence::Converged { .. }));
}

#[tokio::test]
async fn test_run_converges_from_events() {
    common::init_tracing();
    let backend = common::FlakyStore::new();
    let digis = common::seed(&backend, &["alpha", "beta", "gamma"]).await;
    let engine = MountEngine::new(Arc::new(backend.clone()), EngineConfig::default());

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let reconciler = Reconciler::new(engine.clone(), fast_config());
    let handle = tokio::spawn(reconciler.run(shutdown_rx));

    // the policy arrives before its mount; the mount event wakes it up
    common::put_policy(
        &backend,
        &common::policy("p1"),
        &YieldPolicySpec::new(digis[0].clone(), digis[1].clone()),
    )
    .await;
    engine
        .mount(&digis[0], &digis[1], MountMode::Hide)
        .await
        .unwrap();

    // a second, independent policy; one write fails, either ours or the
    // reconciler's, which then has to retry
    backend.fail_updates(1);
    let _ = engine
        .mount(&digis[2], &digis[1], MountMode::Expose)
        .await;
    engine
        .mount(&digis[2], &digis[1], MountMode::Expose)
        .await
        .unwrap();
    common::put_policy(
        &backend,
        &common::policy("p2"),
        &YieldPolicySpec::new(digis[2].clone(), digis[1].clone()),
    )
    .await;

    let converged = common::eventually(Duration::from_secs(5), || {
        let engine = engine.clone();
        let (a, b, g) = (digis[0].clone(), digis[1].clone(), digis[2].clone());
        async move {
            let first = engine.get(&a, &b).await.map(|m| m.status);
            let second = engine.get(&g, &b).await.map(|m| m.status);
            matches!(
                (first, second),
                (Ok(MountStatus::Yielded), Ok(MountStatus::Yielded))
            )
        }
    })
    .await;
    assert!(converged, "both policies should converge");

    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_run_recovers_from_dropped_watch() {
    common::init_tracing();
    let backend = MemoryStore::new();
    let digis = common::seed(&backend, &["alpha", "beta"]).await;
    let engine = MountEngine::new(Arc::new(backend.clone()), EngineConfig::default());
    engine
        .mount(&digis[0], &digis[1], MountMode::Hide)
        .await
        .unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let handle = tokio::spawn(Reconciler::new(engine.clone(), fast_config()).run(shutdown_rx));

    // drop the watch, then write the policy; the reconciler must notice it
    // after re-subscribing
    backend.interrupt_watches();
    common::put_policy(
        &backend,
        &common::policy("late"),
        &YieldPolicySpec::new(digis[0].clone(), digis[1].clone()),
    )
    .await;

    let converged = common::eventually(Duration::from_secs(5), || {
        let engine = engine.clone();
        let (a, b) = (digis[0].clone(), digis[1].clone());
        async move {
            matches!(engine.get(&a, &b).await.map(|m| m.status), Ok(MountStatus::Yielded))
        }
    })
    .await;
    assert!(converged);

    drop(shutdown_tx);
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_run_survives_panicking_pass() {
    common::init_tracing();
    let backend = common::FlakyStore::new();
    let digis = common::seed(&backend, &["alpha", "beta"]).await;
    let engine = MountEngine::new(Arc::new(backend.clone()), EngineConfig::default());
    engine
        .mount(&digis[0], &digis[1], MountMode::Hide)
        .await
        .unwrap();
    common::put_policy(
        &backend,
        &common::policy("p1"),
        &YieldPolicySpec::new(digis[0].clone(), digis[1].clone()),
    )
    .await;

    // the first pass blows up reading its policy
    backend.panic_reads(1);
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let handle = tokio::spawn(Reconciler::new(engine.clone(), fast_config()).run(shutdown_rx));

    // poll the backing store directly so the test's own reads never trip the fault
    let inner = backend.inner.clone();
    let (alpha, beta) = (digis[0].clone(), digis[1].clone());
    let converged = common::eventually(Duration::from_secs(5), || {
        let (inner, alpha, beta) = (inner.clone(), alpha.clone(), beta.clone());
        async move {
            inner
                .get(&beta)
                .await
                .ok()
                .and_then(|digi| digi.mounts.get(&alpha.namespaced_name()).map(|m| m.status))
                == Some(MountStatus::Yielded)
        }
    })
    .await;
    assert!(converged, "key stayed stuck after a panicking pass");

    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}
