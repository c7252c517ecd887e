//! `bnet.protocol.authentication`

use super::bnet::EntityId;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LogonRequest {
    #[prost(string, optional, tag = "1")]
    pub program: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "2")]
    pub platform: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "3")]
    pub locale: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "4")]
    pub email: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "5")]
    pub version: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(int32, optional, tag = "6")]
    pub application_version: ::core::option::Option<i32>,
    #[prost(bool, optional, tag = "7")]
    pub cookie_only: ::core::option::Option<bool>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LogonResponse {
    #[prost(message, required, tag = "1")]
    pub account: EntityId,
    #[prost(message, required, tag = "2")]
    pub game_account: EntityId,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ModuleMessageRequest {
    #[prost(int32, required, tag = "1")]
    pub module_id: i32,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub message: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
}
