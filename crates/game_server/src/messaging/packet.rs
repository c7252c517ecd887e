//! Binary packet framing.
//!
//! Every packet starts with a header:
//!
//! | field        | encoding                                   |
//! |--------------|--------------------------------------------|
//! | `service_id` | one byte                                   |
//! | `method_id`  | varint32                                   |
//! | `request_id` | `u16`, little endian                       |
//! | `object_id`  | varint64, absent on responses (`0xFE`)     |
//! | `payload_len`| varint32                                   |
//!
//! followed by `payload_len` bytes of protobuf payload.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use prost::encoding::{decode_varint, encode_varint};
use thiserror::Error;

/// Service id carried by responses.
pub const RESPONSE_SERVICE_ID: u8 = 0xFE;

/// Longest legal varint encoding.
const MAX_VARINT_LEN: usize = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("malformed varint in {0}")]
    MalformedVarint(&'static str),
    #[error("{field} value {value} does not fit in 32 bits")]
    Overflow { field: &'static str, value: u64 },
    #[error("payload of {len} bytes exceeds limit of {max}")]
    PayloadTooLarge { len: usize, max: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub service_id: u8,
    pub method_id: u32,
    pub request_id: u16,
    /// `None` on responses.
    pub object_id: Option<u64>,
    pub payload_len: u32,
}

impl PacketHeader {
    pub fn is_response(&self) -> bool {
        self.service_id == RESPONSE_SERVICE_ID
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: PacketHeader,
    pub payload: Bytes,
}

impl Packet {
    pub fn request(service_id: u8, method_id: u32, request_id: u16, object_id: u64, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        Self {
            header: PacketHeader {
                service_id,
                method_id,
                request_id,
                object_id: Some(object_id),
                payload_len: payload.len() as u32,
            },
            payload,
        }
    }

    pub fn response(request_id: u16, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        Self {
            header: PacketHeader {
                service_id: RESPONSE_SERVICE_ID,
                method_id: 0,
                request_id,
                object_id: None,
                payload_len: payload.len() as u32,
            },
            payload,
        }
    }

    /// Appends the wire form of this packet to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(1 + 2 + 3 * MAX_VARINT_LEN + self.payload.len());
        dst.put_u8(self.header.service_id);
        encode_varint(u64::from(self.header.method_id), dst);
        dst.put_u16_le(self.header.request_id);
        if !self.header.is_response() {
            encode_varint(self.header.object_id.unwrap_or_default(), dst);
        }
        encode_varint(self.payload.len() as u64, dst);
        dst.put_slice(&self.payload);
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Takes one complete packet off the front of `src`.
    ///
    /// Returns `Ok(None)` and leaves `src` untouched while the packet is still
    /// incomplete. An error means the stream can no longer be framed.
    pub fn decode(src: &mut BytesMut, max_payload: usize) -> Result<Option<Packet>, FrameError> {
        let mut cursor: &[u8] = &src[..];

        if cursor.is_empty() {
            return Ok(None);
        }
        let service_id = cursor.get_u8();

        let Some(method_id) = read_varint(&mut cursor, "method_id")? else {
            return Ok(None);
        };
        let method_id = narrow(method_id, "method_id")?;

        if cursor.remaining() < 2 {
            return Ok(None);
        }
        let request_id = cursor.get_u16_le();

        let object_id = if service_id == RESPONSE_SERVICE_ID {
            None
        } else {
            match read_varint(&mut cursor, "object_id")? {
                Some(id) => Some(id),
                None => return Ok(None),
            }
        };

        let Some(payload_len) = read_varint(&mut cursor, "payload_len")? else {
            return Ok(None);
        };
        let payload_len = narrow(payload_len, "payload_len")?;
        if payload_len as usize > max_payload {
            return Err(FrameError::PayloadTooLarge {
                len: payload_len as usize,
                max: max_payload,
            });
        }
        if cursor.remaining() < payload_len as usize {
            return Ok(None);
        }

        let header_len = src.len() - cursor.remaining();
        src.advance(header_len);
        let payload = src.split_to(payload_len as usize).freeze();

        Ok(Some(Packet {
            header: PacketHeader {
                service_id,
                method_id,
                request_id,
                object_id,
                payload_len,
            },
            payload,
        }))
    }
}

/// Reads a varint if its terminating byte has arrived.
fn read_varint(cursor: &mut &[u8], field: &'static str) -> Result<Option<u64>, FrameError> {
    let window = &cursor[..cursor.len().min(MAX_VARINT_LEN)];
    if !window.iter().any(|b| b & 0x80 == 0) {
        return if window.len() == MAX_VARINT_LEN {
            Err(FrameError::MalformedVarint(field))
        } else {
            Ok(None)
        };
    }
    decode_varint(cursor)
        .map(Some)
        .map_err(|_| FrameError::MalformedVarint(field))
}

fn narrow(value: u64, field: &'static str) -> Result<u32, FrameError> {
    u32::try_from(value).map_err(|_| FrameError::Overflow { field, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 1024;

    #[test]
    fn request_wire_layout() {
        let packet = Packet::request(0x0B, 1, 0x0102, 300, vec![0xAA, 0xBB]);
        let bytes = packet.to_bytes();
        assert_eq!(
            &bytes[..],
            &[0x0B, 0x01, 0x02, 0x01, 0xAC, 0x02, 0x02, 0xAA, 0xBB]
        );
    }

    #[test]
    fn response_omits_object_id() {
        let bytes = Packet::response(7, vec![0x01]).to_bytes();
        assert_eq!(&bytes[..], &[0xFE, 0x00, 0x07, 0x00, 0x01, 0x01]);

        let mut buf = BytesMut::from(&bytes[..]);
        let decoded = Packet::decode(&mut buf, MAX).unwrap().unwrap();
        assert!(decoded.header.is_response());
        assert_eq!(decoded.header.object_id, None);
        assert_eq!(decoded.header.request_id, 7);
    }

    #[test]
    fn partial_frames_wait_for_more_bytes() {
        let bytes = Packet::request(0x01, 2, 9, 1 << 40, vec![5u8; 20]).to_bytes();
        for cut in 0..bytes.len() {
            let mut buf = BytesMut::from(&bytes[..cut]);
            assert_eq!(Packet::decode(&mut buf, MAX).unwrap(), None, "cut at {cut}");
            assert_eq!(buf.len(), cut);
        }
    }

    #[test]
    fn back_to_back_packets_split_cleanly() {
        let mut buf = BytesMut::new();
        Packet::request(0x00, 1, 1, 0, vec![1, 2, 3]).encode(&mut buf);
        Packet::request(0x0B, 4, 2, 77, Vec::new()).encode(&mut buf);

        let first = Packet::decode(&mut buf, MAX).unwrap().unwrap();
        assert_eq!(first.header.service_id, 0x00);
        assert_eq!(&first.payload[..], &[1, 2, 3]);

        let second = Packet::decode(&mut buf, MAX).unwrap().unwrap();
        assert_eq!(second.header.method_id, 4);
        assert_eq!(second.header.object_id, Some(77));
        assert!(second.payload.is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let bytes = Packet::request(0x01, 1, 1, 0, vec![0u8; 64]).to_bytes();
        let mut buf = BytesMut::from(&bytes[..]);
        assert_eq!(
            Packet::decode(&mut buf, 16),
            Err(FrameError::PayloadTooLarge { len: 64, max: 16 })
        );
    }

    #[test]
    fn unterminated_varint_is_fatal() {
        let mut buf = BytesMut::from(&[0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF][..]);
        assert_eq!(
            Packet::decode(&mut buf, MAX),
            Err(FrameError::MalformedVarint("method_id"))
        );
    }

    #[test]
    fn method_id_must_fit_u32() {
        let mut buf = BytesMut::new();
        buf.put_u8(0x01);
        encode_varint(u64::from(u32::MAX) + 1, &mut buf);
        buf.put_u16_le(0);
        assert!(matches!(
            Packet::decode(&mut buf, MAX),
            Err(FrameError::Overflow { field: "method_id", .. })
        ));
    }
}
