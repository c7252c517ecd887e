//! `bnet.protocol` primitives shared by every service.

/// Wire form of an entity address. Both halves are `fixed64`.
#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct EntityId {
    #[prost(fixed64, required, tag = "1")]
    pub high: u64,
    #[prost(fixed64, required, tag = "2")]
    pub low: u64,
}

/// Empty acknowledgment used by methods without a meaningful response.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NoData {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProcessId {
    #[prost(uint32, required, tag = "1")]
    pub label: u32,
    #[prost(uint32, required, tag = "2")]
    pub epoch: u32,
}

impl From<crate::EntityId> for EntityId {
    fn from(id: crate::EntityId) -> Self {
        Self {
            high: id.high,
            low: id.low,
        }
    }
}

impl From<&EntityId> for crate::EntityId {
    fn from(id: &EntityId) -> Self {
        crate::EntityId::new(id.high, id.low)
    }
}

impl From<EntityId> for crate::EntityId {
    fn from(id: EntityId) -> Self {
        crate::EntityId::new(id.high, id.low)
    }
}
