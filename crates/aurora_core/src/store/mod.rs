//! # Account Store
//!
//! Durable write-through persistence of account and toon records. The
//! relational engine is only used as a key/value sink: rows are inserted once
//! on creation and read back in bulk at startup, and `MAX(id)` seeds the id
//! allocators.
//!
//! Persistence failures never undo in-memory state. [`AccountStore::save`]
//! logs the failure and returns; the account stays usable for the rest of the
//! process lifetime even though it will not survive a restart.

mod sqlite;

pub use sqlite::SqliteBackend;

use crate::accounts::{Account, Toon};
use crate::entity_id::Addressable;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("stored id {0} is negative")]
    NegativeId(i64),
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Kinds of durable records, each with its own id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Account,
    Toon,
}

impl RecordKind {
    pub fn table(self) -> &'static str {
        match self {
            RecordKind::Account => "accounts",
            RecordKind::Toon => "toons",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub id: u64,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToonRecord {
    pub id: u64,
    pub account_id: u64,
    pub name: String,
}

/// Blocking storage operations. Implementations are called from
/// `spawn_blocking` for writes and directly for the one-off seed query.
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// Highest id ever stored for `kind`, or `None` when the table is empty.
    fn max_id(&self, kind: RecordKind) -> Result<Option<u64>, StoreError>;

    fn insert_account(&self, record: &AccountRecord) -> Result<(), StoreError>;

    fn insert_toon(&self, record: &ToonRecord) -> Result<(), StoreError>;

    fn load_accounts(&self) -> Result<Vec<AccountRecord>, StoreError>;

    fn load_toons(&self) -> Result<Vec<ToonRecord>, StoreError>;
}

/// Async façade over a [`StorageBackend`].
#[derive(Debug, Clone)]
pub struct AccountStore {
    backend: Arc<dyn StorageBackend>,
}

impl AccountStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> Arc<dyn StorageBackend> {
        Arc::clone(&self.backend)
    }

    /// Inserts the account row. Failures are logged and swallowed.
    pub async fn save(&self, account: &Account) {
        let record = account.record();
        let email = record.email.clone();
        match self.try_save_account(record).await {
            Ok(()) => debug!("💾 Persisted account {} ({})", account.persistent_id(), email),
            Err(e) => error!(
                "❌ Failed to persist account {} ({}): {} - keeping in-memory copy",
                account.persistent_id(),
                email,
                e
            ),
        }
    }

    /// Inserts the toon row. Failures are logged and swallowed.
    pub async fn save_toon(&self, toon: &Toon) {
        let record = toon.record();
        match self.try_save_toon(record).await {
            Ok(()) => debug!("💾 Persisted toon {} ({})", toon.persistent_id(), toon.name()),
            Err(e) => error!(
                "❌ Failed to persist toon {} ({}): {} - keeping in-memory copy",
                toon.persistent_id(),
                toon.name(),
                e
            ),
        }
    }

    pub async fn try_save_account(&self, record: AccountRecord) -> Result<(), StoreError> {
        let backend = Arc::clone(&self.backend);
        tokio::task::spawn_blocking(move || backend.insert_account(&record)).await?
    }

    pub async fn try_save_toon(&self, record: ToonRecord) -> Result<(), StoreError> {
        let backend = Arc::clone(&self.backend);
        tokio::task::spawn_blocking(move || backend.insert_toon(&record)).await?
    }

    /// Reads every stored account and toon.
    pub async fn load(&self) -> Result<(Vec<AccountRecord>, Vec<ToonRecord>), StoreError> {
        let backend = Arc::clone(&self.backend);
        tokio::task::spawn_blocking(move || {
            let accounts = backend.load_accounts()?;
            let toons = backend.load_toons()?;
            Ok::<_, StoreError>((accounts, toons))
        })
        .await?
    }
}
