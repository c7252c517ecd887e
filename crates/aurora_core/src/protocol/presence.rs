//! `bnet.protocol.presence`

use super::attribute::Variant;
use super::bnet::EntityId;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FieldKey {
    #[prost(uint32, required, tag = "1")]
    pub program: u32,
    #[prost(uint32, required, tag = "2")]
    pub group: u32,
    #[prost(uint32, required, tag = "3")]
    pub field: u32,
    #[prost(uint64, optional, tag = "4")]
    pub index: ::core::option::Option<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Field {
    #[prost(message, required, tag = "1")]
    pub key: FieldKey,
    #[prost(message, required, tag = "2")]
    pub value: Variant,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum OperationType {
    Set = 0,
    Clear = 1,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FieldOperation {
    #[prost(message, required, tag = "1")]
    pub field: Field,
    #[prost(enumeration = "OperationType", optional, tag = "2")]
    pub operation: ::core::option::Option<i32>,
}

/// Presence payload embedded into `channel.ChannelState` as extension 101.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChannelState {
    #[prost(message, optional, tag = "1")]
    pub entity_id: ::core::option::Option<EntityId>,
    #[prost(message, repeated, tag = "2")]
    pub field_operation: ::prost::alloc::vec::Vec<FieldOperation>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SubscribeRequest {
    #[prost(message, optional, tag = "1")]
    pub agent_id: ::core::option::Option<EntityId>,
    #[prost(message, required, tag = "2")]
    pub entity_id: EntityId,
    #[prost(uint64, required, tag = "3")]
    pub object_id: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UnsubscribeRequest {
    #[prost(message, optional, tag = "1")]
    pub agent_id: ::core::option::Option<EntityId>,
    #[prost(message, required, tag = "2")]
    pub entity_id: EntityId,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateRequest {
    #[prost(message, required, tag = "1")]
    pub entity_id: EntityId,
    #[prost(message, repeated, tag = "2")]
    pub field_operation: ::prost::alloc::vec::Vec<FieldOperation>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryRequest {
    #[prost(message, required, tag = "1")]
    pub entity_id: EntityId,
    #[prost(message, repeated, tag = "2")]
    pub key: ::prost::alloc::vec::Vec<FieldKey>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryResponse {
    #[prost(message, repeated, tag = "2")]
    pub field: ::prost::alloc::vec::Vec<Field>,
}
