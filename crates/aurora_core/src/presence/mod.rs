//! # Presence Fields
//!
//! Entities expose typed presence values addressed by a [`FieldKey`]. The
//! namespace is partitioned by program (the subsystem that owns the field)
//! and then by group, field and index. Interpretation of a key is delegated
//! to per-program [`FieldResolver`]s held by a [`FieldDirectory`].
//!
//! Remote observers subscribe to an entity and receive complete snapshots of
//! its fields through the [`SubscriptionNotifier`].

pub mod directory;
pub mod notifier;
pub mod resolvers;

pub use directory::{FieldDirectory, FieldResolver, PresenceSource, Resolution};
pub use notifier::{DeliveryError, RemoteEndpoint, SubscriptionNotifier};
pub use resolvers::{account_directory, BNetIdentityResolver, HeroSelectionResolver, ToonListResolver};

use crate::entity_id::EntityId;
use crate::protocol::{attribute, presence as wire};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Owner of a slice of the field namespace. Values are the ASCII tags the
/// client uses (`"BN"`, `"D3"`) read as big-endian integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum Program {
    BNet = 16974,
    D3 = 17459,
}

impl Program {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            16974 => Some(Program::BNet),
            17459 => Some(Program::D3),
            _ => None,
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Address of a single presence value.
///
/// `program` stays a raw integer so keys for programs this server does not
/// know can still be represented and reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldKey {
    pub program: u32,
    pub group: u32,
    pub field: u32,
    pub index: u32,
}

impl FieldKey {
    pub const fn new(program: Program, group: u32, field: u32, index: u32) -> Self {
        Self {
            program: program as u32,
            group,
            field,
            index,
        }
    }

    pub fn program(&self) -> Option<Program> {
        Program::from_u32(self.program)
    }

    /// Converts a wire key. Indices beyond `u32` cannot name any field and
    /// are clamped so the lookup reports them as unknown.
    pub fn from_wire(key: &wire::FieldKey) -> Self {
        let index = key.index.unwrap_or(0);
        Self {
            program: key.program,
            group: key.group,
            field: key.field,
            index: u32::try_from(index).unwrap_or(u32::MAX),
        }
    }

    pub fn to_wire(&self) -> wire::FieldKey {
        wire::FieldKey {
            program: self.program,
            group: self.group,
            field: self.field,
            index: Some(u64::from(self.index)),
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.program() {
            Some(program) => write!(f, "{:?}/{}/{}/{}", program, self.group, self.field, self.index),
            None => write!(f, "{}/{}/{}/{}", self.program, self.group, self.field, self.index),
        }
    }
}

/// A presence value. Absence is expressed with `Option::None`, never with a
/// dedicated variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    String(String),
    Bool(bool),
    Int(i64),
    /// Encoded nested message, typically an entity id.
    Message(Vec<u8>),
}

impl FieldValue {
    pub fn message<M: prost::Message>(message: &M) -> Self {
        FieldValue::Message(message.encode_to_vec())
    }

    pub fn to_wire(&self) -> attribute::Variant {
        let mut variant = attribute::Variant::default();
        match self {
            FieldValue::String(value) => variant.string_value = Some(value.clone()),
            FieldValue::Bool(value) => variant.bool_value = Some(*value),
            FieldValue::Int(value) => variant.int_value = Some(*value),
            FieldValue::Message(value) => variant.message_value = Some(value.clone()),
        }
        variant
    }
}

/// "Set `key` to `value`", one entry of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOperation {
    pub key: FieldKey,
    pub value: FieldValue,
}

impl FieldOperation {
    pub fn set(key: FieldKey, value: FieldValue) -> Self {
        Self { key, value }
    }

    pub fn to_wire_field(&self) -> wire::Field {
        wire::Field {
            key: self.key.to_wire(),
            value: self.value.to_wire(),
        }
    }

    pub fn to_wire(&self) -> wire::FieldOperation {
        wire::FieldOperation {
            field: self.to_wire_field(),
            operation: None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PresenceError {
    #[error("entity {0} is not loaded")]
    EntityNotLoaded(EntityId),
    #[error("entity {0} is not addressable: {1}")]
    BadAddress(EntityId, crate::entity_id::CodecError),
    #[error("toon {toon} does not belong to account {account}")]
    UnknownToon { account: u64, toon: u64 },
    #[error("account {0} has no bound session")]
    NotLoggedIn(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_tags_are_ascii_pairs() {
        assert_eq!(Program::BNet.as_u32(), u32::from_be_bytes([0, 0, b'B', b'N']));
        assert_eq!(Program::D3.as_u32(), u32::from_be_bytes([0, 0, b'D', b'3']));
        assert_eq!(Program::from_u32(1), None);
    }

    #[test]
    fn oversized_wire_index_is_clamped() {
        let wire_key = wire::FieldKey {
            program: Program::BNet.as_u32(),
            group: 1,
            field: 4,
            index: Some(u64::MAX),
        };
        assert_eq!(FieldKey::from_wire(&wire_key).index, u32::MAX);
    }

    #[test]
    fn variant_sets_exactly_one_member() {
        let variant = FieldValue::Bool(true).to_wire();
        assert_eq!(variant.bool_value, Some(true));
        assert!(variant.string_value.is_none());
        assert!(variant.int_value.is_none());
        assert!(variant.message_value.is_none());
    }
}
