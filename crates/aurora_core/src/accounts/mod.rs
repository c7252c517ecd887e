//! # Accounts
//!
//! Accounts and the toons they own. An [`Account`] is addressable under two
//! entity ids (account and game account), publishes presence fields through
//! [`PresenceSource`], and remembers which connection is logged into it.
//!
//! Mutable state sits behind a single `RwLock` so a presence view or digest
//! is always computed from one consistent read. The lock is never held across
//! an `.await`.

pub mod digest;
mod manager;

pub use manager::AccountManager;

use crate::entity_id::{encode, Addressable, EntityId, EntityKind};
use crate::ids::{IdAllocError, PersistentIdAllocator};
use crate::presence::{PresenceError, PresenceSource};
use crate::protocol::d3;
use crate::store::{AccountRecord, ToonRecord};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A playable character owned by an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toon {
    persistent_id: u64,
    account_id: u64,
    name: String,
}

impl Toon {
    pub fn new(
        account_id: u64,
        name: impl Into<String>,
        allocator: &PersistentIdAllocator,
    ) -> Result<Self, IdAllocError> {
        Ok(Self::with_persistent_id(allocator.next()?, account_id, name))
    }

    /// Rebuilds a toon loaded from storage.
    pub fn with_persistent_id(persistent_id: u64, account_id: u64, name: impl Into<String>) -> Self {
        Self {
            persistent_id,
            account_id,
            name: name.into(),
        }
    }

    pub fn persistent_id(&self) -> u64 {
        self.persistent_id
    }

    pub fn account_id(&self) -> u64 {
        self.account_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bnet_entity_id(&self) -> EntityId {
        encode(EntityKind::Toon, self.persistent_id)
    }

    /// Same address as [`bnet_entity_id`](Self::bnet_entity_id); it differs
    /// only in how it is encoded on the wire.
    pub fn game_entity_id(&self) -> EntityId {
        encode(EntityKind::Toon, self.persistent_id)
    }

    pub fn record(&self) -> ToonRecord {
        ToonRecord {
            id: self.persistent_id,
            account_id: self.account_id,
            name: self.name.clone(),
        }
    }
}

/// Live connection bound to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionBinding {
    pub connection_id: u64,
    /// Toon explicitly selected by the client, if any.
    pub current_toon: Option<u64>,
}

#[derive(Debug, Default)]
struct AccountState {
    toons: BTreeMap<u64, Toon>,
    session: Option<SessionBinding>,
}

impl AccountState {
    /// The toon the account is considered to be playing: the selected one,
    /// else the lowest-id toon.
    fn active_toon(&self) -> Option<&Toon> {
        self.session
            .and_then(|s| s.current_toon)
            .and_then(|id| self.toons.get(&id))
            .or_else(|| self.toons.values().next())
    }
}

/// Presence state captured under one read lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountView {
    pub email: String,
    /// Active toon while a session is bound; `None` when offline.
    pub current_toon: Option<EntityId>,
    /// Owned toons, ascending persistent id.
    pub toons: Vec<EntityId>,
}

#[derive(Debug)]
pub struct Account {
    persistent_id: u64,
    email: String,
    bnet_account_id: EntityId,
    bnet_game_account_id: EntityId,
    banner: d3::BannerConfiguration,
    state: RwLock<AccountState>,
}

impl Account {
    /// Creates a brand new account with a freshly allocated id.
    pub fn new(email: impl Into<String>, allocator: &PersistentIdAllocator) -> Result<Self, IdAllocError> {
        Ok(Self::with_persistent_id(allocator.next()?, email))
    }

    /// Rebuilds an account with a known id (load path).
    pub fn with_persistent_id(persistent_id: u64, email: impl Into<String>) -> Self {
        Self {
            persistent_id,
            email: email.into(),
            bnet_account_id: encode(EntityKind::Account, persistent_id),
            bnet_game_account_id: encode(EntityKind::GameAccount, persistent_id),
            banner: digest::default_banner(),
            state: RwLock::new(AccountState::default()),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn game_account_id(&self) -> EntityId {
        self.bnet_game_account_id
    }

    fn read(&self) -> RwLockReadGuard<'_, AccountState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, AccountState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Attaches an owned toon.
    ///
    /// # Panics
    ///
    /// Panics if the toon belongs to another account or its id is already
    /// registered here; both mean an id was handed out twice.
    pub fn add_toon(&self, toon: Toon) {
        assert_eq!(
            toon.account_id, self.persistent_id,
            "toon {} belongs to account {}, not {}",
            toon.persistent_id, toon.account_id, self.persistent_id
        );
        let mut state = self.write();
        let id = toon.persistent_id;
        if state.toons.insert(id, toon).is_some() {
            panic!("toon {} registered twice on account {}", id, self.persistent_id);
        }
    }

    pub fn toons(&self) -> Vec<Toon> {
        self.read().toons.values().cloned().collect()
    }

    pub fn toon(&self, toon_id: u64) -> Option<Toon> {
        self.read().toons.get(&toon_id).cloned()
    }

    pub fn session(&self) -> Option<SessionBinding> {
        self.read().session
    }

    pub fn is_online(&self) -> bool {
        self.read().session.is_some()
    }

    /// Marks `connection_id` as logged into this account, replacing any
    /// previous binding. Returns the connection that was displaced.
    pub fn bind_session(&self, connection_id: u64) -> Option<u64> {
        let mut state = self.write();
        let previous = state.session.replace(SessionBinding {
            connection_id,
            current_toon: None,
        });
        previous
            .map(|s| s.connection_id)
            .filter(|&id| id != connection_id)
    }

    /// Clears the binding if it belongs to `connection_id`. A binding taken
    /// over by a newer connection is left alone.
    pub fn clear_session(&self, connection_id: u64) -> bool {
        let mut state = self.write();
        match state.session {
            Some(binding) if binding.connection_id == connection_id => {
                state.session = None;
                true
            }
            _ => false,
        }
    }

    /// Selects the toon the bound session is playing.
    pub fn select_toon(&self, toon_id: u64) -> Result<(), PresenceError> {
        let mut state = self.write();
        if !state.toons.contains_key(&toon_id) {
            return Err(PresenceError::UnknownToon {
                account: self.persistent_id,
                toon: toon_id,
            });
        }
        match state.session.as_mut() {
            Some(binding) => {
                binding.current_toon = Some(toon_id);
                Ok(())
            }
            None => Err(PresenceError::NotLoggedIn(self.persistent_id)),
        }
    }

    /// The toon the account is playing or last played, if it owns any.
    pub fn active_toon(&self) -> Option<Toon> {
        self.read().active_toon().cloned()
    }

    /// Summary recomputed from current state on every call.
    pub fn digest(&self) -> d3::Digest {
        let last_played = self
            .read()
            .active_toon()
            .map_or(EntityId::SENTINEL, Toon::game_entity_id);
        d3::Digest {
            version: digest::DIGEST_VERSION,
            last_played_hero_id: d3::EntityId::from(last_played),
            banner_configuration: self.banner.clone(),
            flags: 0,
        }
    }

    pub fn record(&self) -> AccountRecord {
        AccountRecord {
            id: self.persistent_id,
            email: self.email.clone(),
        }
    }
}

impl Addressable for Account {
    fn persistent_id(&self) -> u64 {
        self.persistent_id
    }

    fn primary_entity_id(&self) -> EntityId {
        self.bnet_account_id
    }

    fn secondary_entity_ids(&self) -> Vec<EntityId> {
        vec![self.bnet_game_account_id]
    }
}

impl PresenceSource for Account {
    type View = AccountView;

    fn presence_view(&self) -> AccountView {
        let state = self.read();
        let current_toon = state
            .session
            .and_then(|_| state.active_toon())
            .map(Toon::game_entity_id);
        AccountView {
            email: self.email.clone(),
            current_toon,
            toons: state.toons.values().map(Toon::bnet_entity_id).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::resolvers::account_directory;
    use crate::presence::{FieldKey, FieldValue, Program};
    use crate::store::{RecordKind, SqliteBackend};
    use std::sync::Arc;

    #[test]
    fn fresh_account_digest_uses_sentinel_and_defaults() {
        let backend = Arc::new(SqliteBackend::open_in_memory().unwrap());
        let allocator = PersistentIdAllocator::new(RecordKind::Account, backend);
        let account = Account::new("a@b.com", &allocator).unwrap();

        let digest = account.digest();
        assert_eq!(digest.version, 99);
        assert_eq!(digest.flags, 0);
        assert_eq!(digest.last_played_hero_id, d3::EntityId { id_high: 0, id_low: 0 });
        let banner = digest.banner_configuration;
        assert_eq!(banner.background_color_index, 20);
        assert_eq!(banner.banner_index, 8);
        assert_eq!(banner.pattern, 4);
        assert_eq!(banner.pattern_color_index, 11);
        assert_eq!(banner.placement_index, 11);
        assert_eq!(banner.sigil_accent, 4);
        assert_eq!(banner.sigil_main, 3);
        assert_eq!(banner.sigil_color_index, 7);
        assert!(banner.use_sigil_variant);
    }

    #[test]
    fn digest_follows_selected_toon_then_first_toon() {
        let account = Account::with_persistent_id(3, "t@b.com");
        account.add_toon(Toon::with_persistent_id(20, 3, "Second"));
        account.add_toon(Toon::with_persistent_id(10, 3, "First"));

        let first = d3::EntityId::from(encode(EntityKind::Toon, 10));
        assert_eq!(account.digest().last_played_hero_id, first);

        account.bind_session(1);
        account.select_toon(20).unwrap();
        let selected = d3::EntityId::from(encode(EntityKind::Toon, 20));
        assert_eq!(account.digest().last_played_hero_id, selected);
    }

    #[test]
    fn entity_ids_use_account_and_game_account_tags() {
        let account = Account::with_persistent_id(42, "id@b.com");
        assert_eq!(account.primary_entity_id(), encode(EntityKind::Account, 42));
        assert_eq!(account.secondary_entity_ids(), vec![encode(EntityKind::GameAccount, 42)]);
    }

    #[test]
    fn selecting_requires_session_and_ownership() {
        let account = Account::with_persistent_id(1, "s@b.com");
        account.add_toon(Toon::with_persistent_id(2, 1, "Hero"));
        assert_eq!(account.select_toon(2), Err(PresenceError::NotLoggedIn(1)));
        account.bind_session(5);
        assert_eq!(
            account.select_toon(9),
            Err(PresenceError::UnknownToon { account: 1, toon: 9 })
        );
        assert!(account.select_toon(2).is_ok());
    }

    #[test]
    fn clear_session_ignores_other_connections() {
        let account = Account::with_persistent_id(1, "c@b.com");
        account.bind_session(5);
        assert_eq!(account.bind_session(6), Some(5));
        assert!(!account.clear_session(5));
        assert!(account.is_online());
        assert!(account.clear_session(6));
        assert!(!account.is_online());
    }

    #[test]
    fn snapshot_is_stable_until_login() {
        let account = Account::with_persistent_id(1, "p@b.com");
        account.add_toon(Toon::with_persistent_id(4, 1, "Hero"));
        let directory = account_directory();

        let first = directory.snapshot(&account);
        let second = directory.snapshot(&account);
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);

        account.bind_session(8);
        let online = directory.snapshot(&account);
        assert_eq!(online.len(), 4);
        assert_eq!(online[2].key, FieldKey::new(Program::D3, 1, 1, 0));

        account.clear_session(8);
        assert_eq!(directory.snapshot(&account), first);
    }

    #[test]
    fn unknown_query_key_is_absent() {
        let account = Account::with_persistent_id(1, "q@b.com");
        let directory = account_directory();
        assert_eq!(directory.query(&account, &FieldKey::new(Program::D3, 4, 4, 0)), None);
        assert_eq!(
            directory.query(&account, &FieldKey::new(Program::BNet, 1, 1, 0)),
            Some(FieldValue::String("q@b.com".into()))
        );
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn duplicate_toon_id_panics() {
        let account = Account::with_persistent_id(1, "d@b.com");
        account.add_toon(Toon::with_persistent_id(2, 1, "A"));
        account.add_toon(Toon::with_persistent_id(2, 1, "B"));
    }
}
