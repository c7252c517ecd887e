//! Resolvers for the fields an account advertises.
//!
//! Snapshot order is fixed by [`account_directory`]:
//!
//! 1. `BNet/1/1` display name
//! 2. `BNet/1/2` capability flag, always `true`
//! 3. `D3/1/1` game-form id of the active toon, only while a session is bound
//! 4. `BNet/1/4` one entry per owned toon, ascending toon id

use super::{FieldDirectory, FieldKey, FieldOperation, FieldResolver, FieldValue, Program, Resolution};
use crate::accounts::AccountView;
use crate::protocol::{bnet, d3};

pub const DISPLAY_NAME: FieldKey = FieldKey::new(Program::BNet, 1, 1, 0);
pub const CAPABILITY_FLAG: FieldKey = FieldKey::new(Program::BNet, 1, 2, 0);
pub const ACTIVE_HERO: FieldKey = FieldKey::new(Program::D3, 1, 1, 0);
pub const OWNED_TOONS: FieldKey = FieldKey::new(Program::BNet, 1, 4, 0);

/// `BNet/1/1` and `BNet/1/2`.
pub struct BNetIdentityResolver;

impl FieldResolver<AccountView> for BNetIdentityResolver {
    fn program(&self) -> Program {
        Program::BNet
    }

    fn name(&self) -> &'static str {
        "bnet-identity"
    }

    fn resolve(&self, view: &AccountView, key: &FieldKey) -> Resolution {
        if *key == DISPLAY_NAME {
            Resolution::Value(FieldValue::String(view.email.clone()))
        } else if *key == CAPABILITY_FLAG {
            Resolution::Value(FieldValue::Bool(true))
        } else {
            Resolution::Unknown
        }
    }

    fn enumerate(&self, view: &AccountView, out: &mut Vec<FieldOperation>) {
        out.push(FieldOperation::set(DISPLAY_NAME, FieldValue::String(view.email.clone())));
        out.push(FieldOperation::set(CAPABILITY_FLAG, FieldValue::Bool(true)));
    }
}

/// `D3/1/1`, the hero the bound session is playing.
pub struct HeroSelectionResolver;

impl FieldResolver<AccountView> for HeroSelectionResolver {
    fn program(&self) -> Program {
        Program::D3
    }

    fn name(&self) -> &'static str {
        "d3-hero"
    }

    fn resolve(&self, view: &AccountView, key: &FieldKey) -> Resolution {
        if *key != ACTIVE_HERO {
            return Resolution::Unknown;
        }
        match view.current_toon {
            Some(toon) => Resolution::Value(FieldValue::message(&d3::EntityId::from(toon))),
            None => Resolution::Unset,
        }
    }

    fn enumerate(&self, view: &AccountView, out: &mut Vec<FieldOperation>) {
        if let Some(toon) = view.current_toon {
            out.push(FieldOperation::set(
                ACTIVE_HERO,
                FieldValue::message(&d3::EntityId::from(toon)),
            ));
        }
    }
}

/// `BNet/1/4`. Every entry shares index 0 in snapshots; a query selects the
/// toon at position `index`.
pub struct ToonListResolver;

impl FieldResolver<AccountView> for ToonListResolver {
    fn program(&self) -> Program {
        Program::BNet
    }

    fn name(&self) -> &'static str {
        "bnet-toons"
    }

    fn resolve(&self, view: &AccountView, key: &FieldKey) -> Resolution {
        if (key.group, key.field) != (OWNED_TOONS.group, OWNED_TOONS.field) {
            return Resolution::Unknown;
        }
        match view.toons.get(key.index as usize) {
            Some(toon) => Resolution::Value(FieldValue::message(&bnet::EntityId::from(*toon))),
            None => Resolution::Unset,
        }
    }

    fn enumerate(&self, view: &AccountView, out: &mut Vec<FieldOperation>) {
        for toon in &view.toons {
            out.push(FieldOperation::set(
                OWNED_TOONS,
                FieldValue::message(&bnet::EntityId::from(*toon)),
            ));
        }
    }
}

/// The directory used for accounts.
pub fn account_directory() -> FieldDirectory<AccountView> {
    FieldDirectory::new()
        .with_resolver(BNetIdentityResolver)
        .with_resolver(HeroSelectionResolver)
        .with_resolver(ToonListResolver)
}
