//! Gateway protocol definitions
//!
//! Op names, the frame format, payloads and close codes.

mod close_codes;
mod messages;
mod opcodes;
mod payloads;

pub use close_codes::CloseCode;
pub use messages::{GatewayMessage, MESSAGE_ERROR, MESSAGE_SENT};
pub use opcodes::OpCode;
pub use payloads::{
    ConversationRoomPayload, ErrorPayload, GroupRoomPayload, HelloPayload, IdentifyPayload,
    MessageErrorPayload, MessageSentPayload, ReadyPayload, SendMessagePayload, TypingRoomPayload,
};
