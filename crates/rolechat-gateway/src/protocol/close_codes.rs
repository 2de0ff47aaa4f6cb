//! Close codes the gateway ends a socket with (4000 range)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum CloseCode {
    UnknownError = 4000,
    /// Client sent a server-only op
    UnknownOpcode = 4001,
    /// Frame was not a valid JSON text frame
    DecodeError = 4002,
    /// Op other than `identify`/`heartbeat` before `identify`
    NotAuthenticated = 4003,
    /// Token rejected or its user no longer exists
    AuthenticationFailed = 4004,
    AlreadyAuthenticated = 4005,
    /// No heartbeat within twice the interval
    SessionTimeout = 4009,
}

const ALL: [CloseCode; 7] = [
    CloseCode::UnknownError,
    CloseCode::UnknownOpcode,
    CloseCode::DecodeError,
    CloseCode::NotAuthenticated,
    CloseCode::AuthenticationFailed,
    CloseCode::AlreadyAuthenticated,
    CloseCode::SessionTimeout,
];

impl CloseCode {
    pub fn from_u16(value: u16) -> Option<Self> {
        ALL.into_iter().find(|code| code.as_u16() == value)
    }

    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Reason text carried in the close frame
    pub const fn reason(self) -> &'static str {
        match self {
            Self::UnknownError => "Unknown error",
            Self::UnknownOpcode => "Op not accepted from clients",
            Self::DecodeError => "Invalid frame",
            Self::NotAuthenticated => "Identify first",
            Self::AuthenticationFailed => "Authentication failed",
            Self::AlreadyAuthenticated => "Already identified",
            Self::SessionTimeout => "Heartbeat timeout",
        }
    }

    /// The client broke the protocol, as opposed to a timeout or server fault
    pub const fn is_protocol_violation(self) -> bool {
        !matches!(self, Self::UnknownError | Self::SessionTimeout)
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}
