//! Mount Engine and Pipe Composer
//!
//! Both engines mutate relation state owned by a *target* digi through the
//! relation store. Mutations to one target are serialized by optimistic
//! concurrency: a write made against a stale version is retried with a fresh
//! read instead of overwriting the concurrent change. Mutations to different
//! targets are independent.
//!
//! Every store call is bounded by [`EngineConfig::request_timeout`]. Dropping
//! an operation's future cancels it; whatever steps were already written stay
//! written, and callers re-invoke the operation to finish.

use std::time::Duration;

mod mount;
mod pipe;
mod registry;
mod update;

pub use mount::{MountEngine, MountOp, MountRequest};
pub use pipe::{PipeComposer, PipeOp, Piper};
pub use registry::DigiRegistry;

pub(crate) use update::Relations;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_UPDATE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Deadline applied to each individual store call
    pub request_timeout: Duration,
    /// Optimistic update attempts before giving up with a conflict
    pub max_update_attempts: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_update_attempts: DEFAULT_MAX_UPDATE_ATTEMPTS,
        }
    }
}
