//! # Persistent Id Allocation
//!
//! Process-wide generator of durable numeric ids, one instance per record
//! kind. The counter is seeded lazily from the highest id already in the
//! store; the seed runs exactly once behind a [`OnceCell`] barrier so two
//! concurrent first calls can never hand out the same value. After seeding,
//! allocation is a single atomic increment.

use crate::entity_id::MAX_PERSISTENT_ID;
use crate::store::{RecordKind, StorageBackend, StoreError};
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

/// First id handed out when the store is empty.
pub const BASELINE_ID: u64 = 1;

#[derive(Debug, Error)]
pub enum IdAllocError {
    #[error("failed to seed {kind} id counter: {source}")]
    Seed {
        kind: RecordKind,
        #[source]
        source: StoreError,
    },
    #[error("{0} id space exhausted")]
    Exhausted(RecordKind),
    #[error("{kind} id allocation task failed: {reason}")]
    Interrupted { kind: RecordKind, reason: String },
}

#[derive(Debug)]
pub struct PersistentIdAllocator {
    kind: RecordKind,
    backend: Arc<dyn StorageBackend>,
    counter: OnceCell<AtomicU64>,
}

impl PersistentIdAllocator {
    pub fn new(kind: RecordKind, backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            kind,
            backend,
            counter: OnceCell::new(),
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Whether the counter has been seeded. Until then [`next`](Self::next)
    /// queries the store and blocks the calling thread.
    pub fn is_seeded(&self) -> bool {
        self.counter.get().is_some()
    }

    /// Seeds the counter without issuing an id.
    pub fn prime(&self) -> Result<(), IdAllocError> {
        self.counter.get_or_try_init(|| self.seed()).map(|_| ())
    }

    /// Returns a fresh id, unique across every value ever issued against the
    /// backing store.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot report its current maximum; the allocator
    /// does not guess, and the next call retries the seed.
    pub fn next(&self) -> Result<u64, IdAllocError> {
        let counter = self.counter.get_or_try_init(|| self.seed())?;
        let id = counter.fetch_add(1, Ordering::Relaxed);
        if id > MAX_PERSISTENT_ID {
            return Err(IdAllocError::Exhausted(self.kind));
        }
        Ok(id)
    }

    fn seed(&self) -> Result<AtomicU64, IdAllocError> {
        let max = self.backend.max_id(self.kind).map_err(|source| {
            error!("❌ Could not seed {} id counter: {}", self.kind, source);
            IdAllocError::Seed {
                kind: self.kind,
                source,
            }
        })?;
        let start = max.map_or(BASELINE_ID, |max| max.saturating_add(1));
        debug!("🔢 Seeded {} id counter at {}", self.kind, start);
        Ok(AtomicU64::new(start))
    }
}
