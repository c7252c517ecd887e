//! Packet framing and request routing.
//!
//! Bytes read from a connection are cut into [`Packet`]s here and handed to
//! the dispatch table; responses travel back through the same framing.

pub mod packet;
pub mod router;

pub use packet::{FrameError, Packet, PacketHeader, RESPONSE_SERVICE_ID};
pub use router::route_packet;
