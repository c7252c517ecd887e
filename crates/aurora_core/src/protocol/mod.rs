//! # Wire Messages
//!
//! Protobuf message shapes exchanged with game clients. Field tags and scalar
//! encodings follow the client's schema exactly; the structs are hand-declared
//! `prost` messages so no `protoc` step is needed at build time.
//!
//! Packages are mirrored as modules:
//!
//! - [`bnet`] - shared primitives (`EntityId`, `NoData`, `ProcessId`)
//! - [`attribute`] - the `Variant` value union
//! - [`presence`] - field keys, field operations, presence service requests
//! - [`channel`] - channel state and the `AddNotification` envelope
//! - [`authentication`] - logon and module messages
//! - [`connection`] - connect and service binding
//! - [`d3`] - game-namespace ids, banner and account digest
//! - [`services`] - service and method descriptors

pub mod attribute;
pub mod authentication;
pub mod bnet;
pub mod channel;
pub mod connection;
pub mod d3;
pub mod presence;
pub mod services;

pub use services::{MethodDescriptor, MethodRef, ServiceDescriptor};
