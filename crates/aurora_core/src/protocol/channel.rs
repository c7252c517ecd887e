//! `bnet.protocol.channel`
//!
//! Only the members the server writes are declared; `prost` skips anything
//! else a client might send back.

use super::presence;

/// Generic channel state. Presence data rides in extension field 101, which
/// encodes exactly like a regular optional message field with that tag.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChannelState {
    #[prost(message, optional, tag = "101")]
    pub presence: ::core::option::Option<presence::ChannelState>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AddNotification {
    #[prost(message, required, tag = "3")]
    pub channel_state: ChannelState,
}
