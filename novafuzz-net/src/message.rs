//! Typed messages layered on top of [`crate::frame::Frame`]. Payloads for
//! `sync`/`program`/`crash` are opaque IR-level serializations produced by
//! `novafuzz-ir::snapshot`; this crate only moves the bytes around.

use rand::RngCore;

use crate::error::NetError;
use crate::frame::{Frame, MessageType};

/// A node's identity: 16 raw bytes, exchanged unframed during the handshake
/// and again as the payload of the first framed `identify` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub [u8; 16]);

impl NodeId {
    pub fn random<R: RngCore>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 16];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn to_bytes(self) -> [u8; 16] {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    KeepAlive,
    Shutdown,
    Identify(NodeId),
    Sync(Vec<u8>),
    Program(Vec<u8>),
    Crash(Vec<u8>),
    Statistics(Vec<u8>),
    Log(Vec<u8>),
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::KeepAlive => MessageType::KeepAlive,
            Message::Shutdown => MessageType::Shutdown,
            Message::Identify(_) => MessageType::Identify,
            Message::Sync(_) => MessageType::Sync,
            Message::Program(_) => MessageType::Program,
            Message::Crash(_) => MessageType::Crash,
            Message::Statistics(_) => MessageType::Statistics,
            Message::Log(_) => MessageType::Log,
        }
    }

    pub fn into_frame(self) -> Result<Frame, NetError> {
        let message_type = self.message_type();
        let payload = match self {
            Message::KeepAlive | Message::Shutdown => Vec::new(),
            Message::Identify(id) => id.to_bytes().to_vec(),
            Message::Sync(bytes) | Message::Program(bytes) | Message::Crash(bytes) | Message::Statistics(bytes) | Message::Log(bytes) => bytes,
        };
        Frame::new(message_type, payload)
    }

    pub fn from_frame(frame: Frame) -> Result<Self, NetError> {
        Ok(match frame.message_type {
            MessageType::KeepAlive => Message::KeepAlive,
            MessageType::Shutdown => Message::Shutdown,
            MessageType::Identify => {
                let bytes: [u8; 16] = frame
                    .payload
                    .try_into()
                    .map_err(|_| NetError::Framing("identify payload must be 16 bytes".into()))?;
                Message::Identify(NodeId(bytes))
            }
            MessageType::Sync => Message::Sync(frame.payload),
            MessageType::Program => Message::Program(frame.payload),
            MessageType::Crash => Message::Crash(frame.payload),
            MessageType::Statistics => Message::Statistics(frame.payload),
            MessageType::Log => Message::Log(frame.payload),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn identify_round_trips_through_a_frame() {
        let mut rng = SmallRng::seed_from_u64(0);
        let id = NodeId::random(&mut rng);
        let frame = Message::Identify(id).into_frame().unwrap();
        assert_eq!(Message::from_frame(frame).unwrap(), Message::Identify(id));
    }

    #[test]
    fn malformed_identify_payload_is_a_framing_error() {
        let frame = Frame::new(MessageType::Identify, vec![1, 2, 3]).unwrap();
        assert!(Message::from_frame(frame).is_err());
    }
}
