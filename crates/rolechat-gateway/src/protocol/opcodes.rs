//! Gateway operation names
//!
//! Every frame carries an `op` naming what it is. Names travel as
//! snake_case strings (`"identify"`, `"heartbeat_ack"`, ...).

use serde::{Deserialize, Serialize};

/// Gateway operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpCode {
    // Server -> client
    /// Sent on connect with the heartbeat interval
    Hello,
    /// Identify accepted
    Ready,
    /// Event delivery: `t` names the event, `d` carries it
    Dispatch,
    HeartbeatAck,
    /// A recoverable failure; the connection stays open
    Error,
    /// Identify rejected; the server closes right after
    InvalidSession,

    // Client -> server
    Identify,
    Heartbeat,
    JoinConversation,
    LeaveConversation,
    JoinGroup,
    LeaveGroup,
    TypingStart,
    TypingStop,
    SendMessage,
}

impl OpCode {
    /// Check if this op can be sent by the client
    #[must_use]
    pub const fn is_client_op(self) -> bool {
        matches!(
            self,
            Self::Identify
                | Self::Heartbeat
                | Self::JoinConversation
                | Self::LeaveConversation
                | Self::JoinGroup
                | Self::LeaveGroup
                | Self::TypingStart
                | Self::TypingStop
                | Self::SendMessage
        )
    }

    /// Ops a connection may send before `identify`
    #[must_use]
    pub const fn allowed_before_identify(self) -> bool {
        matches!(self, Self::Identify | Self::Heartbeat)
    }

    /// Wire name of this op
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Hello => "hello",
            Self::Ready => "ready",
            Self::Dispatch => "dispatch",
            Self::HeartbeatAck => "heartbeat_ack",
            Self::Error => "error",
            Self::InvalidSession => "invalid_session",
            Self::Identify => "identify",
            Self::Heartbeat => "heartbeat",
            Self::JoinConversation => "join_conversation",
            Self::LeaveConversation => "leave_conversation",
            Self::JoinGroup => "join_group",
            Self::LeaveGroup => "leave_group",
            Self::TypingStart => "typing_start",
            Self::TypingStop => "typing_stop",
            Self::SendMessage => "send_message",
        }
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
