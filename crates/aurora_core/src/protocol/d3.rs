//! Game-namespace messages (`D3.OnlineService`, `D3.Account`).

/// Game-side entity address. Unlike the `bnet` form both halves are varints.
#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct EntityId {
    #[prost(uint64, required, tag = "1")]
    pub id_high: u64,
    #[prost(uint64, required, tag = "2")]
    pub id_low: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BannerConfiguration {
    #[prost(uint32, required, tag = "1")]
    pub banner_index: u32,
    #[prost(int32, required, tag = "2")]
    pub sigil_main: i32,
    #[prost(int32, required, tag = "3")]
    pub sigil_accent: i32,
    #[prost(int32, required, tag = "4")]
    pub pattern_color_index: i32,
    #[prost(int32, required, tag = "5")]
    pub background_color_index: i32,
    #[prost(int32, required, tag = "6")]
    pub sigil_color_index: i32,
    #[prost(int32, required, tag = "7")]
    pub placement_index: i32,
    #[prost(int32, required, tag = "8")]
    pub pattern: i32,
    #[prost(bool, required, tag = "9")]
    pub use_sigil_variant: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Digest {
    #[prost(uint32, required, tag = "1")]
    pub version: u32,
    #[prost(message, required, tag = "2")]
    pub last_played_hero_id: EntityId,
    #[prost(message, required, tag = "3")]
    pub banner_configuration: BannerConfiguration,
    #[prost(uint32, required, tag = "4")]
    pub flags: u32,
}

impl From<crate::EntityId> for EntityId {
    fn from(id: crate::EntityId) -> Self {
        Self {
            id_high: id.high,
            id_low: id.low,
        }
    }
}

impl From<&EntityId> for crate::EntityId {
    fn from(id: &EntityId) -> Self {
        crate::EntityId::new(id.id_high, id.id_low)
    }
}
