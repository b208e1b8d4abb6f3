pub mod error;
pub mod frame;
pub mod message;
pub mod node;

pub use error::NetError;
pub use frame::{Frame, FrameDecoder, MessageType};
pub use message::{Message, NodeId};
pub use node::{ChildNode, NetEvent, ParentNode};
