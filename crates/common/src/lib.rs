/**
 * Short names for digi addresses, persisted
 *  next to the rest of the client state.
 */
pub mod alias;
/**
 * Fully qualified digi addresses:
 *  group/version/kind/namespace/name
 */
pub mod auri;
/**
 * The Mount Engine and Pipe Composer.
 *  Everything that mutates relation state
 *  on a target digi goes through here.
 */
pub mod engine;
pub mod error;
/**
 * Keeps mounts in the status their yield
 *  policies ask for.
 */
pub mod reconciler;
/**
 * Relation types stored on digis:
 *  mounts, pipes and yield policies.
 */
pub mod relation;
pub mod resolver;
/**
 * Typed access to the object runtime, and
 *  an in-memory implementation of it.
 */
pub mod store;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::alias::{AliasError, AliasTable};
    pub use crate::auri::{Auri, Kind};
    pub use crate::engine::{
        DigiRegistry, EngineConfig, MountEngine, MountOp, PipeComposer, PipeOp, Piper,
    };
    pub use crate::error::{ErrorKind, RelationError};
    pub use crate::reconciler::{Reconciler, ReconcilerConfig};
    pub use crate::relation::{Mount, MountMode, MountStatus, PolicyOutcome, YieldPolicySpec};
    pub use crate::resolver::Resolver;
    pub use crate::store::{Digi, MemoryStore, RelationStore};
    pub use crate::version::build_info;
}
