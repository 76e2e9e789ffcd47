//! Relation value types
//!
//! Mounts and pipes are sub-objects of the *target* digi: they live inside the
//! target's persisted state and are never stored as top-level objects. Yield
//! policies are ordinary digis whose spec names a mount to drive.
//!
//! - **[`Mount`]**: exposes or hides a source digi inside a target, keyed in
//!   the target's [`MountRefs`] by the source's namespaced name
//! - **[`PipeRef`]**: binds one of the target's input fields to a source's
//!   output field, keyed in the target's [`PipeRefs`] by input field
//! - **[`YieldPolicySpec`]**: declares which status a mount should converge to

mod mount;
mod pipe;
mod policy;

pub use mount::{Mount, MountMode, MountRefs, MountStatus};
pub use pipe::{PipeEdge, PipeRef, PipeRefs, DEFAULT_INPUT_FIELD, DEFAULT_OUTPUT_FIELD};
pub use policy::{yield_policy_kind, PolicyOutcome, YieldPolicySpec};
