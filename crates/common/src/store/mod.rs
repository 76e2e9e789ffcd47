//! Relation Store Client
//!
//! A thin typed accessor over the object runtime that stores digis. The
//! runtime itself is external; [`MemoryStore`] is an in-process stand-in used
//! by the daemon and by tests.

mod memory;
mod provider;

pub use memory::MemoryStore;
pub use provider::{Digi, RelationStore, Selector, StoreError, WatchEvent, WatchStream};
