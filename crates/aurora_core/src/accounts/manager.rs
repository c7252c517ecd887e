use super::{Account, Toon};
use crate::entity_id::{decode, Addressable, EntityId, EntityKind};
use crate::ids::{IdAllocError, PersistentIdAllocator};
use crate::presence::PresenceError;
use crate::store::{AccountStore, RecordKind, StoreError};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// In-memory registry of loaded accounts, indexed by persistent id and email.
///
/// Creation allocates an id, registers the account, then writes it through
/// to the store. A failed write is logged by [`AccountStore`] and the account
/// stays registered.
#[derive(Debug)]
pub struct AccountManager {
    store: AccountStore,
    account_ids: Arc<PersistentIdAllocator>,
    toon_ids: Arc<PersistentIdAllocator>,
    by_id: DashMap<u64, Arc<Account>>,
    by_email: DashMap<String, u64>,
}

impl AccountManager {
    pub fn new(store: AccountStore) -> Self {
        let backend = store.backend();
        Self {
            account_ids: Arc::new(PersistentIdAllocator::new(RecordKind::Account, Arc::clone(&backend))),
            toon_ids: Arc::new(PersistentIdAllocator::new(RecordKind::Toon, backend)),
            store,
            by_id: DashMap::new(),
            by_email: DashMap::new(),
        }
    }

    pub fn store(&self) -> &AccountStore {
        &self.store
    }

    /// Loads every stored account and toon. Returns the number of accounts.
    pub async fn load_all(&self) -> Result<usize, StoreError> {
        let (accounts, toons) = self.store.load().await?;
        let count = accounts.len();
        for record in accounts {
            self.register(Account::with_persistent_id(record.id, record.email));
        }
        for record in toons {
            match self.get(record.account_id) {
                Some(account) => {
                    account.add_toon(Toon::with_persistent_id(record.id, record.account_id, record.name))
                }
                None => warn!(
                    "⚠️ Toon {} references missing account {} - skipped",
                    record.id, record.account_id
                ),
            }
        }
        info!("📚 Loaded {} account(s) from storage", count);

        for allocator in [&self.account_ids, &self.toon_ids] {
            let allocator = Arc::clone(allocator);
            let kind = allocator.kind();
            match tokio::task::spawn_blocking(move || allocator.prime()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("⚠️ {} id counter not seeded yet: {}", kind, e),
                Err(e) => warn!("⚠️ Seeding {} id counter failed: {}", kind, e),
            }
        }
        Ok(count)
    }

    pub fn get(&self, persistent_id: u64) -> Option<Arc<Account>> {
        self.by_id.get(&persistent_id).map(|a| Arc::clone(a.value()))
    }

    pub fn find_by_email(&self, email: &str) -> Option<Arc<Account>> {
        let id = *self.by_email.get(email)?;
        self.get(id)
    }

    /// Maps a wire address to a loaded account. Both the account and the
    /// game-account id resolve to the same account.
    pub fn resolve(&self, entity_id: EntityId) -> Result<Arc<Account>, PresenceError> {
        let (kind, id) = decode(entity_id).map_err(|e| PresenceError::BadAddress(entity_id, e))?;
        match kind {
            EntityKind::Account | EntityKind::GameAccount => {
                self.get(id).ok_or(PresenceError::EntityNotLoaded(entity_id))
            }
            EntityKind::Toon => Err(PresenceError::EntityNotLoaded(entity_id)),
        }
    }

    /// Returns the account for `email`, creating and persisting it when
    /// absent. The flag is `true` when the account was created.
    pub async fn find_or_create(&self, email: &str) -> Result<(Arc<Account>, bool), IdAllocError> {
        if let Some(account) = self.find_by_email(email) {
            return Ok((account, false));
        }
        self.create_account(email).await
    }

    /// Creates a new account. If another task registered the same email
    /// first, that account is returned instead and nothing is written.
    pub async fn create_account(&self, email: &str) -> Result<(Arc<Account>, bool), IdAllocError> {
        let id = allocate(&self.account_ids).await?;
        let account = Arc::new(Account::with_persistent_id(id, email));

        // by_id is written before by_email, so an occupied email always
        // resolves to a registered account.
        match self.by_email.entry(email.to_string()) {
            Entry::Occupied(mut existing) => match self.get(*existing.get()) {
                Some(existing) => return Ok((existing, false)),
                None => {
                    self.insert(Arc::clone(&account));
                    existing.insert(id);
                }
            },
            Entry::Vacant(slot) => {
                self.insert(Arc::clone(&account));
                slot.insert(id);
            }
        }
        info!("🆕 Created account {} for {}", id, email);

        self.store.save(&account).await;
        Ok((account, true))
    }

    /// Creates a toon for `account` and persists it.
    pub async fn create_toon(&self, account: &Account, name: &str) -> Result<Toon, IdAllocError> {
        let toon_id = allocate(&self.toon_ids).await?;
        let toon = Toon::with_persistent_id(toon_id, account.persistent_id(), name);
        account.add_toon(toon.clone());
        info!(
            "🆕 Created toon {} ({}) for account {}",
            toon.persistent_id(),
            name,
            account.persistent_id()
        );
        self.store.save_toon(&toon).await;
        Ok(toon)
    }

    /// Registers an account rebuilt from a known id.
    ///
    /// # Panics
    ///
    /// Panics if the persistent id is already registered.
    pub fn register(&self, account: Account) -> Arc<Account> {
        let account = Arc::new(account);
        self.insert(Arc::clone(&account));
        self.by_email
            .insert(account.email().to_string(), account.persistent_id());
        account
    }

    fn insert(&self, account: Arc<Account>) {
        let id = account.persistent_id();
        if self.by_id.insert(id, account).is_some() {
            panic!("persistent id {id} assigned to two accounts");
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Issues an id, moving the first (seeding) allocation off the async worker.
async fn allocate(allocator: &Arc<PersistentIdAllocator>) -> Result<u64, IdAllocError> {
    if allocator.is_seeded() {
        return allocator.next();
    }
    let kind = allocator.kind();
    let allocator = Arc::clone(allocator);
    tokio::task::spawn_blocking(move || allocator.next())
        .await
        .map_err(|e| IdAllocError::Interrupted {
            kind,
            reason: e.to_string(),
        })?
}
