//! Source RCON codec for tokio.
//!
//! Frames [`Packet`] values over a TCP stream using the length-prefixed layout
//! described in [`crate::packet`].

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{self, ProtocolError};
use crate::packet::{MAX_BODY_LEN, MAX_PACKET_SIZE, MIN_PACKET_SIZE, Packet};

/// Tokio codec for Source RCON packets.
#[derive(Debug, Clone)]
pub struct SourceCodec {
    max_size: i32,
}

impl SourceCodec {
    /// Create a codec accepting packets up to [`MAX_PACKET_SIZE`].
    pub fn new() -> Self {
        Self {
            max_size: MAX_PACKET_SIZE,
        }
    }

    /// Create a codec with a custom upper bound on the size field.
    pub fn with_max_size(max_size: i32) -> Self {
        Self {
            max_size: max_size.max(MIN_PACKET_SIZE),
        }
    }
}

impl Default for SourceCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for SourceCodec {
    type Item = Packet;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<Packet>> {
        if src.len() < 4 {
            return Ok(None);
        }

        let size = i32::from_le_bytes([src[0], src[1], src[2], src[3]]);
        if !(MIN_PACKET_SIZE..=self.max_size).contains(&size) {
            return Err(ProtocolError::InvalidSize {
                size,
                min: MIN_PACKET_SIZE,
                max: self.max_size,
            });
        }

        let total = 4 + size as usize;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(total);
        frame.advance(4);
        let id = frame.get_i32_le();
        let kind = frame.get_i32_le();

        // Body plus the two NUL bytes remain.
        let rest = &frame[..];
        let body_len = rest.len() - 2;
        if rest[body_len..] != [0, 0] {
            return Err(ProtocolError::MissingTerminator { id });
        }

        Ok(Some(Packet {
            id,
            kind,
            body: String::from_utf8_lossy(&rest[..body_len]).into_owned(),
        }))
    }
}

impl Encoder<Packet> for SourceCodec {
    type Error = ProtocolError;

    fn encode(&mut self, packet: Packet, dst: &mut BytesMut) -> error::Result<()> {
        let body = packet.body.as_bytes();
        if let Some(pos) = body.iter().position(|b| *b == 0) {
            return Err(ProtocolError::InteriorNul(pos));
        }
        if body.len() > MAX_BODY_LEN {
            return Err(ProtocolError::BodyTooLong {
                actual: body.len(),
                limit: MAX_BODY_LEN,
            });
        }

        dst.reserve(4 + packet.wire_size());
        dst.put_i32_le(packet.wire_size() as i32);
        dst.put_i32_le(packet.id);
        dst.put_i32_le(packet.kind);
        dst.put_slice(body);
        dst.put_u8(0);
        dst.put_u8(0);
        Ok(())
    }
}
