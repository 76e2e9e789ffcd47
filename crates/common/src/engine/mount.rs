use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::auri::Auri;
use crate::error::RelationError;
use crate::relation::{Mount, MountMode, MountRefs};
use crate::resolver::Resolver;
use crate::store::RelationStore;

use super::update::{Edit, Relations};
use super::EngineConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountOp {
    #[default]
    Mount,
    Activate,
    Yield,
    Unmount,
}

impl fmt::Display for MountOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountOp::Mount => write!(f, "mount"),
            MountOp::Activate => write!(f, "activate"),
            MountOp::Yield => write!(f, "yield"),
            MountOp::Unmount => write!(f, "unmount"),
        }
    }
}

/// A mount request with both ends resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountRequest {
    pub source: Auri,
    pub target: Auri,
    #[serde(default)]
    pub mode: MountMode,
}

impl MountRequest {
    /// Resolve the textual ends and mode of a mount request
    pub fn resolve(
        resolver: &Resolver,
        source: &str,
        target: &str,
        mode: Option<&str>,
    ) -> Result<Self, RelationError> {
        let source = resolver.resolve(source)?;
        let target = resolver.resolve(target)?;
        let mode = match mode {
            Some(mode) => mode.parse()?,
            None => MountMode::default(),
        };
        Ok(Self {
            source,
            target,
            mode,
        })
    }
}

type Pair = (Auri, Auri);

/// Yields currently being applied, by `(source, target)`
#[derive(Debug, Clone, Default)]
struct YieldsInFlight(Arc<Mutex<HashSet<Pair>>>);

impl YieldsInFlight {
    fn begin(&self, source: &Auri, target: &Auri) -> Result<YieldGuard, RelationError> {
        let pair = (source.clone(), target.clone());
        if !self.0.lock().insert(pair.clone()) {
            return Err(RelationError::YieldInFlight {
                src: source.clone(),
                dst: target.clone(),
            });
        }
        Ok(YieldGuard {
            yields: self.clone(),
            pair,
        })
    }
}

/// Releases the in-flight marker when the yield finishes or is dropped
struct YieldGuard {
    yields: YieldsInFlight,
    pair: Pair,
}

impl Drop for YieldGuard {
    fn drop(&mut self) {
        self.yields.0.lock().remove(&self.pair);
    }
}

/// Creates, activates, yields and removes mounts
///
/// Cheap to clone; clones share the in-flight yield registry.
#[derive(Debug, Clone)]
pub struct MountEngine {
    relations: Relations,
    yields: YieldsInFlight,
}

impl MountEngine {
    pub fn new(store: Arc<dyn RelationStore>, config: EngineConfig) -> Self {
        Self {
            relations: Relations::new(store, config),
            yields: YieldsInFlight::default(),
        }
    }

    pub fn store(&self) -> &Arc<dyn RelationStore> {
        self.relations.store()
    }

    pub(crate) fn relations(&self) -> &Relations {
        &self.relations
    }

    /// Run `op` for a resolved request
    pub async fn apply(&self, op: MountOp, req: &MountRequest) -> Result<Mount, RelationError> {
        match op {
            MountOp::Mount => self.mount(&req.source, &req.target, req.mode).await,
            MountOp::Activate => self.activate(&req.source, &req.target).await,
            MountOp::Yield => self.yield_mount(&req.source, &req.target).await,
            MountOp::Unmount => self.unmount(&req.source, &req.target).await,
        }
    }

    /// Mount `source` onto `target`
    ///
    /// A new mount starts out inactive. Mounting an already mounted source
    /// only updates the mode; the status is left alone.
    pub async fn mount(
        &self,
        source: &Auri,
        target: &Auri,
        mode: MountMode,
    ) -> Result<Mount, RelationError> {
        if source == target {
            return Err(RelationError::SelfMount(source.clone()));
        }
        // source must exist; the target is checked by the update itself
        self.relations.get(source).await?;

        let key = source.namespaced_name();
        let mount = self
            .relations
            .modify(target, |digi| {
                if let Some(existing) = digi.mounts.get_mut(&key) {
                    // the key drops the kind, so two sources can collide on it
                    if &existing.source != source {
                        return Err(RelationError::MountKeyTaken {
                            key: key.clone(),
                            dst: target.clone(),
                            held_by: existing.source.clone(),
                        });
                    }
                    if existing.mode == mode {
                        return Ok(Edit::Unchanged(existing.clone()));
                    }
                    existing.mode = mode;
                    return Ok(Edit::Changed(existing.clone()));
                }

                let mount = Mount::new(source.clone(), target.clone(), mode);
                digi.mounts.insert(key.clone(), mount.clone());
                Ok(Edit::Changed(mount))
            })
            .await?;

        tracing::info!(%source, %target, mode = %mount.mode, status = %mount.status, "mounted");
        Ok(mount)
    }

    /// Set a mount's status to active; a no-op if it already is
    pub async fn activate(&self, source: &Auri, target: &Auri) -> Result<Mount, RelationError> {
        let key = source.namespaced_name();
        let (mount, changed) = self
            .relations
            .modify(target, |digi| {
                let mount = mount_entry(&mut digi.mounts, &key, source, target)?;
                if mount.activate() {
                    Ok(Edit::Changed((mount.clone(), true)))
                } else {
                    Ok(Edit::Unchanged((mount.clone(), false)))
                }
            })
            .await?;

        if changed {
            tracing::info!(%source, %target, "mount activated");
        } else {
            tracing::debug!(%source, %target, "mount already active");
        }
        Ok(mount)
    }

    /// Move control of the mounted state from `source` to `target`
    ///
    /// Only valid for an active mount. Fails with a conflict while another
    /// yield of the same pair is in flight.
    pub async fn yield_mount(&self, source: &Auri, target: &Auri) -> Result<Mount, RelationError> {
        let _guard = self.yields.begin(source, target)?;

        let key = source.namespaced_name();
        let (mount, changed) = self
            .relations
            .modify(target, |digi| {
                let mount = mount_entry(&mut digi.mounts, &key, source, target)?;
                if mount.yield_control()? {
                    Ok(Edit::Changed((mount.clone(), true)))
                } else {
                    Ok(Edit::Unchanged((mount.clone(), false)))
                }
            })
            .await?;

        if changed {
            tracing::info!(%source, %target, "mount yielded");
        } else {
            tracing::debug!(%source, %target, "mount already yielded");
        }
        Ok(mount)
    }

    /// Remove the mount; neither digi is otherwise touched
    pub async fn unmount(&self, source: &Auri, target: &Auri) -> Result<Mount, RelationError> {
        let key = source.namespaced_name();
        let mount = self
            .relations
            .modify(target, |digi| {
                mount_entry(&mut digi.mounts, &key, source, target)?;
                let removed = digi.mounts.remove(&key).ok_or_else(|| {
                    RelationError::MountNotFound {
                        src: source.clone(),
                        dst: target.clone(),
                    }
                })?;
                Ok(Edit::Changed(removed))
            })
            .await?;

        tracing::info!(%source, %target, "unmounted");
        Ok(mount)
    }

    pub async fn get(&self, source: &Auri, target: &Auri) -> Result<Mount, RelationError> {
        let digi = self.relations.get(target).await?;
        digi.mounts
            .get(&source.namespaced_name())
            .filter(|m| &m.source == source)
            .cloned()
            .ok_or_else(|| RelationError::MountNotFound {
                src: source.clone(),
                dst: target.clone(),
            })
    }

    /// Everything mounted onto `target`
    pub async fn list(&self, target: &Auri) -> Result<MountRefs, RelationError> {
        Ok(self.relations.get(target).await?.mounts)
    }

    /// The digi that reads of the mounted state currently resolve through
    pub async fn controller(&self, source: &Auri, target: &Auri) -> Result<Auri, RelationError> {
        Ok(self.get(source, target).await?.controller().clone())
    }
}

fn mount_entry<'a>(
    mounts: &'a mut MountRefs,
    key: &str,
    source: &Auri,
    target: &Auri,
) -> Result<&'a mut Mount, RelationError> {
    mounts
        .get_mut(key)
        .filter(|m| &m.source == source)
        .ok_or_else(|| RelationError::MountNotFound {
            src: source.clone(),
            dst: target.clone(),
        })
}
