//! `bnet.protocol.connection`

use super::bnet::ProcessId;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BoundService {
    #[prost(fixed32, required, tag = "1")]
    pub hash: u32,
    #[prost(uint32, required, tag = "2")]
    pub id: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BindRequest {
    #[prost(fixed32, repeated, packed = "true", tag = "1")]
    pub imported_service_hash: ::prost::alloc::vec::Vec<u32>,
    #[prost(message, repeated, tag = "2")]
    pub exported_service: ::prost::alloc::vec::Vec<BoundService>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BindResponse {
    #[prost(uint32, repeated, packed = "true", tag = "1")]
    pub imported_service_id: ::prost::alloc::vec::Vec<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConnectRequest {
    #[prost(message, optional, tag = "1")]
    pub client_id: ::core::option::Option<ProcessId>,
    #[prost(message, optional, tag = "2")]
    pub bind_request: ::core::option::Option<BindRequest>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConnectResponse {
    #[prost(message, required, tag = "1")]
    pub server_id: ProcessId,
    #[prost(message, optional, tag = "2")]
    pub client_id: ::core::option::Option<ProcessId>,
    #[prost(uint32, optional, tag = "3")]
    pub bind_result: ::core::option::Option<u32>,
    #[prost(message, optional, tag = "4")]
    pub bind_response: ::core::option::Option<BindResponse>,
}
