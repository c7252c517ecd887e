//! `bnet.protocol.attribute`

/// Tagged value carried by presence fields. Exactly one member is set.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Variant {
    #[prost(bool, optional, tag = "2")]
    pub bool_value: ::core::option::Option<bool>,
    #[prost(int64, optional, tag = "3")]
    pub int_value: ::core::option::Option<i64>,
    #[prost(string, optional, tag = "5")]
    pub string_value: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(bytes = "vec", optional, tag = "7")]
    pub message_value: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
}
