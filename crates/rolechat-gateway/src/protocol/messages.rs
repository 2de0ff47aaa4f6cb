//! Gateway frame format
//!
//! Every frame in either direction is `{op, t?, d?}`. Only `dispatch`
//! carries `t`, the event name.

use super::{
    CloseCode, ErrorPayload, HelloPayload, MessageErrorPayload, MessageSentPayload, OpCode,
    ReadyPayload,
};
use rolechat_common::ErrorResponse;
use rolechat_core::RealtimeEvent;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event name of the sender-only send acknowledgement
pub const MESSAGE_SENT: &str = "message_sent";
/// Event name of the sender-only send failure
pub const MESSAGE_ERROR: &str = "message_error";

/// A gateway frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayMessage {
    pub op: OpCode,

    /// Event name (only for `dispatch`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,
}

impl GatewayMessage {
    fn with_payload<T: Serialize>(op: OpCode, payload: &T) -> Self {
        Self {
            op,
            t: None,
            d: Some(serde_json::to_value(payload).unwrap_or_default()),
        }
    }

    // === Server frames ===

    #[must_use]
    pub fn dispatch(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            op: OpCode::Dispatch,
            t: Some(event_type.into()),
            d: Some(data),
        }
    }

    /// `dispatch` for a realtime event
    #[must_use]
    pub fn event(event: &RealtimeEvent) -> Self {
        Self::dispatch(event.name(), event.data.clone())
    }

    #[must_use]
    pub fn hello(payload: HelloPayload) -> Self {
        Self::with_payload(OpCode::Hello, &payload)
    }

    #[must_use]
    pub fn ready(payload: &ReadyPayload) -> Self {
        Self::with_payload(OpCode::Ready, payload)
    }

    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self {
            op: OpCode::HeartbeatAck,
            t: None,
            d: None,
        }
    }

    #[must_use]
    pub fn error(op: OpCode, error: ErrorResponse) -> Self {
        Self::with_payload(OpCode::Error, &ErrorPayload { op, error })
    }

    #[must_use]
    pub fn invalid_session(error: ErrorResponse) -> Self {
        Self::with_payload(OpCode::InvalidSession, &error)
    }

    #[must_use]
    pub fn message_sent(payload: &MessageSentPayload) -> Self {
        Self::dispatch(MESSAGE_SENT, serde_json::to_value(payload).unwrap_or_default())
    }

    #[must_use]
    pub fn message_error(payload: &MessageErrorPayload) -> Self {
        Self::dispatch(MESSAGE_ERROR, serde_json::to_value(payload).unwrap_or_default())
    }

    // === Client frames ===

    /// Decode `d` as the payload of this op; a missing `d` decodes as `null`
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.d.clone().unwrap_or(Value::Null))
    }

    // === Utilities ===

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn close_frame(code: CloseCode) -> (u16, String) {
        (code.as_u16(), code.reason().to_string())
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.t {
            Some(t) => write!(f, "GatewayMessage(op={}, t={t})", self.op),
            None => write!(f, "GatewayMessage(op={})", self.op),
        }
    }
}
