//! Storage boundary: every entity collection is an injected `Collection<T>`.
//!
//! The core never assumes a concrete backend. `MemoryCollection` is the
//! in-process implementation used by the binary and by tests; a database-backed
//! implementation only has to honour the same contract:
//! - `list` returns records in their natural (insertion) order,
//! - `insert` fails with `Conflict` on a duplicate id,
//! - `update` is an atomic read-modify-write; if `apply` fails nothing is stored.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

pub use memory::MemoryCollection;

/// A record addressable by a string identity.
pub trait Record: Clone + Send + Sync + 'static {
    /// Entity name used in `NotFound` / `Conflict` errors.
    const KIND: &'static str;

    fn id(&self) -> &str;
}

/// Mutation applied inside `Collection::update` while the record is locked.
pub type Mutation<T> = Box<dyn FnOnce(&mut T) -> Result<()> + Send>;

#[async_trait]
pub trait Collection<T: Record>: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<T>>;

    async fn list(&self) -> Result<Vec<T>>;

    async fn insert(&self, record: T) -> Result<T>;

    /// Atomically apply `apply` to the record with `id` and return the stored
    /// result. This is the compare-and-set primitive: `apply` inspects the
    /// current state and rejects the write by returning an error.
    async fn update(&self, id: &str, apply: Mutation<T>) -> Result<T>;
}

pub type SharedCollection<T> = Arc<dyn Collection<T>>;

/// Convenience constructor for an empty in-memory collection behind the trait.
pub fn in_memory<T: Record>() -> SharedCollection<T> {
    Arc::new(MemoryCollection::<T>::new())
}
