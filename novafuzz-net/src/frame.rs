//! The wire frame: `length(u32le) | type(u32le) | payload | padding`.
//! `length` covers the 8-byte header plus the payload, excludes padding;
//! padding zeroes align the next frame to a 4-byte boundary.

use crate::error::NetError;

pub const HEADER_LEN: usize = 8;
pub const MAX_FRAME_LEN: u32 = 1 << 30; // 1 GiB

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MessageType {
    KeepAlive = 0,
    Shutdown = 1,
    Identify = 2,
    Sync = 3,
    Program = 4,
    Crash = 5,
    Statistics = 6,
    Log = 7,
}

impl MessageType {
    fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            0 => MessageType::KeepAlive,
            1 => MessageType::Shutdown,
            2 => MessageType::Identify,
            3 => MessageType::Sync,
            4 => MessageType::Program,
            5 => MessageType::Crash,
            6 => MessageType::Statistics,
            7 => MessageType::Log,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub message_type: MessageType,
    pub payload: Vec<u8>,
}

fn padding_for(length: u32) -> usize {
    ((4 - (length % 4)) % 4) as usize
}

impl Frame {
    pub fn new(message_type: MessageType, payload: Vec<u8>) -> Result<Self, NetError> {
        let length = HEADER_LEN as u64 + payload.len() as u64;
        if length > u64::from(MAX_FRAME_LEN) {
            return Err(NetError::Framing(format!("frame length {length} exceeds {MAX_FRAME_LEN}")));
        }
        Ok(Self { message_type, payload })
    }

    pub fn encode(&self) -> Vec<u8> {
        let length = (HEADER_LEN + self.payload.len()) as u32;
        let padding = padding_for(length);
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.payload.len() + padding);
        bytes.extend_from_slice(&length.to_le_bytes());
        bytes.extend_from_slice(&(self.message_type as u32).to_le_bytes());
        bytes.extend_from_slice(&self.payload);
        bytes.extend(std::iter::repeat(0u8).take(padding));
        bytes
    }
}

/// Accumulates bytes read off a socket and yields complete frames as enough
/// of them arrive, per `spec.md` §4.5's "dispatched only when
/// `current_buffer.len >= length + padding`".
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Attempts to decode one complete frame from the buffered bytes.
    /// Returns `Ok(None)` if more data is needed. A framing error here is
    /// fatal to the connection: the caller should close it.
    pub fn try_decode(&mut self) -> Result<Option<Frame>, NetError> {
        if self.buffer.len() < HEADER_LEN {
            return Ok(None);
        }

        let length = u32::from_le_bytes(self.buffer[0..4].try_into().unwrap());
        if length < HEADER_LEN as u32 || length > MAX_FRAME_LEN {
            return Err(NetError::Framing(format!("frame length {length} out of range")));
        }

        let type_field = u32::from_le_bytes(self.buffer[4..8].try_into().unwrap());
        let message_type = MessageType::from_u32(type_field)
            .ok_or_else(|| NetError::Framing(format!("unknown message type {type_field}")))?;

        let padding = padding_for(length);
        let total = length as usize + padding;
        if self.buffer.len() < total {
            return Ok(None);
        }

        let payload = self.buffer[HEADER_LEN..length as usize].to_vec();
        self.buffer.drain(..total);
        Ok(Some(Frame { message_type, payload }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nine_byte_payload_matches_spec_scenario() {
        let frame = Frame::new(MessageType::Program, b"123456789".to_vec()).unwrap();
        let bytes = frame.encode();
        assert_eq!(bytes.len(), 20);
        assert_eq!(&bytes[0..4], &17u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &4u32.to_le_bytes());
        assert_eq!(&bytes[17..20], &[0, 0, 0]);
    }

    #[test]
    fn round_trips_through_the_decoder() {
        let frame = Frame::new(MessageType::Sync, vec![1, 2, 3, 4, 5]).unwrap();
        let bytes = frame.encode();

        let mut decoder = FrameDecoder::new();
        decoder.feed(&bytes[..3]);
        assert!(decoder.try_decode().unwrap().is_none());

        decoder.feed(&bytes[3..]);
        let decoded = decoder.try_decode().unwrap().unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn rejects_a_length_below_the_header() {
        let mut decoder = FrameDecoder::new();
        decoder.feed(&3u32.to_le_bytes());
        decoder.feed(&0u32.to_le_bytes());
        assert!(decoder.try_decode().is_err());
    }

    #[test]
    fn rejects_an_unknown_message_type() {
        let mut decoder = FrameDecoder::new();
        decoder.feed(&8u32.to_le_bytes());
        decoder.feed(&99u32.to_le_bytes());
        assert!(decoder.try_decode().is_err());
    }
}
