//! # Entity Addressing
//!
//! Clients never see memory references; every server-side entity is addressed
//! by an [`EntityId`], a pair of 64-bit words where the high word is a fixed
//! tag for the entity kind and the low word is the entity's persistent id.
//!
//! The encoding is a pure function of its inputs and therefore stable across
//! restarts. Persistent ids live in `1..=i64::MAX` because the durable store
//! keeps them as signed integers.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Composite wire address of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    pub high: u64,
    pub low: u64,
}

impl EntityId {
    /// Well-defined "no entity" value. Both halves are zero.
    pub const SENTINEL: EntityId = EntityId { high: 0, low: 0 };

    pub const fn new(high: u64, low: u64) -> Self {
        Self { high, low }
    }

    pub fn is_sentinel(&self) -> bool {
        *self == Self::SENTINEL
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}:{}", self.high, self.low)
    }
}

/// Entity kind carried in the high word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Account,
    GameAccount,
    Toon,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Account, EntityKind::GameAccount, EntityKind::Toon];

    pub const fn high_word(self) -> u64 {
        match self {
            EntityKind::Account => 0x0100_0000_0000_0000,
            EntityKind::GameAccount => 0x0200_0062_0000_4433,
            EntityKind::Toon => 0x0300_0162_0000_4433,
        }
    }

    pub fn from_high_word(high: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.high_word() == high)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("unknown entity high word {0:#018x}")]
    UnknownHighWord(u64),
    #[error("persistent id {0} is outside the addressable range")]
    IdOutOfRange(u64),
}

/// Highest persistent id that can be stored and addressed.
pub const MAX_PERSISTENT_ID: u64 = i64::MAX as u64;

/// Builds the wire address for an entity.
///
/// # Panics
///
/// Panics when `persistent_id` is zero or above [`MAX_PERSISTENT_ID`]; such
/// an id can only come from a bug in the allocator or a load path.
pub fn encode(kind: EntityKind, persistent_id: u64) -> EntityId {
    assert!(
        (1..=MAX_PERSISTENT_ID).contains(&persistent_id),
        "cannot encode {kind:?} with persistent id {persistent_id}"
    );
    EntityId::new(kind.high_word(), persistent_id)
}

/// Inverse of [`encode`]. Wire input is untrusted, so bad ids are an error
/// rather than a panic.
pub fn decode(id: EntityId) -> Result<(EntityKind, u64), CodecError> {
    let kind = EntityKind::from_high_word(id.high).ok_or(CodecError::UnknownHighWord(id.high))?;
    if !(1..=MAX_PERSISTENT_ID).contains(&id.low) {
        return Err(CodecError::IdOutOfRange(id.low));
    }
    Ok((kind, id.low))
}

/// Capability of anything that can be addressed over the wire.
pub trait Addressable {
    fn persistent_id(&self) -> u64;

    /// The address clients use for this entity.
    fn primary_entity_id(&self) -> EntityId;

    /// Additional role addresses (e.g. the game-account id of an account).
    fn secondary_entity_ids(&self) -> Vec<EntityId> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_inverts_encode_for_every_kind() {
        for kind in EntityKind::ALL {
            for id in [1, 2, 77, 1 << 40, MAX_PERSISTENT_ID] {
                assert_eq!(decode(encode(kind, id)), Ok((kind, id)));
            }
        }
    }

    #[test]
    fn high_words_match_wire_constants() {
        assert_eq!(encode(EntityKind::Account, 5), EntityId::new(0x0100_0000_0000_0000, 5));
        assert_eq!(encode(EntityKind::GameAccount, 5).high, 0x0200_0062_0000_4433);
        assert_eq!(encode(EntityKind::Toon, 5).high, 0x0300_0162_0000_4433);
    }

    #[test]
    fn unknown_high_word_is_rejected() {
        let err = decode(EntityId::new(0xdead, 1)).unwrap_err();
        assert_eq!(err, CodecError::UnknownHighWord(0xdead));
        assert!(decode(EntityId::SENTINEL).is_err());
    }

    #[test]
    fn zero_low_word_is_rejected() {
        let id = EntityId::new(EntityKind::Account.high_word(), 0);
        assert_eq!(decode(id), Err(CodecError::IdOutOfRange(0)));
    }

    #[test]
    #[should_panic(expected = "cannot encode")]
    fn encode_panics_on_zero() {
        encode(EntityKind::Toon, 0);
    }

    #[test]
    #[should_panic(expected = "cannot encode")]
    fn encode_panics_above_signed_range() {
        encode(EntityKind::Account, MAX_PERSISTENT_ID + 1);
    }
}
