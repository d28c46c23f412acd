//! JSON shapes exchanged with the chat server.
//!
//! Field names follow the server's snake_case API. Response types are
//! lenient: optional fields default to `None` so that error bodies (which
//! usually only carry `error`) still decode and can be classified by the
//! caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::{ChatMessage, Origin};
use crate::error::FrameError;

/// Body of `POST /chat/start-session/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionRequest {
    pub name: String,
    pub email: String,
}

/// Response of `POST /chat/start-session/`.
///
/// Success carries `session_key`; failure carries `error`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartSessionResponse {
    #[serde(default)]
    pub session_key: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `POST /chat/send-message/` (the HTTP fallback path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub session_key: String,
    pub message: String,
}

/// Response of `POST /chat/send-message/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendMessageResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message_id: Option<i64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl SendMessageResponse {
    /// The server reports acceptance with `status: "success"`.
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }
}

/// A message as it appears in channel frames and in the messages listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub message: String,
    #[serde(default)]
    pub is_staff_reply: bool,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,
}

impl WireMessage {
    /// Convert into a render-surface message.
    ///
    /// A missing or unparsable timestamp falls back to the local receive time.
    pub fn into_chat_message(self) -> ChatMessage {
        let timestamp = self
            .timestamp
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now);
        ChatMessage {
            body: self.message,
            origin: Origin::from_staff_flag(self.is_staff_reply),
            timestamp,
            message_id: self.message_id,
        }
    }
}

impl From<&ChatMessage> for WireMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            message: msg.body.clone(),
            is_staff_reply: msg.origin.is_staff(),
            timestamp: Some(msg.timestamp.to_rfc3339()),
            message_id: msg.message_id,
        }
    }
}

/// `session_info` block of the messages listing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SessionInfo {
    pub is_active: bool,
}

/// Response of `GET /chat/session/{key}/messages/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub messages: Option<Vec<WireMessage>>,
    #[serde(default)]
    pub session_info: Option<SessionInfo>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response of `GET /chat/session/{key}/status/`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatusResponse {
    pub is_active: bool,
}

/// Frame written to the real-time channel by the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundFrame {
    pub message: String,
    pub is_staff_reply: bool,
}

impl OutboundFrame {
    /// A customer-authored frame.
    pub fn from_user(body: impl Into<String>) -> Self {
        Self {
            message: body.into(),
            is_staff_reply: false,
        }
    }
}

/// The authoritative state of a session as returned by the messages listing.
#[derive(Debug, Clone, Default)]
pub struct MessageSnapshot {
    /// Ordered by server position. `None` when the server omitted the list.
    pub messages: Option<Vec<ChatMessage>>,
    /// `None` when the server omitted `session_info`.
    pub is_active: Option<bool>,
}

impl From<MessagesResponse> for MessageSnapshot {
    fn from(resp: MessagesResponse) -> Self {
        Self {
            messages: resp
                .messages
                .map(|list| list.into_iter().map(WireMessage::into_chat_message).collect()),
            is_active: resp.session_info.map(|info| info.is_active),
        }
    }
}

/// Decode one inbound text frame from the real-time channel.
pub fn decode_inbound_frame(text: &str) -> Result<ChatMessage, FrameError> {
    let wire: WireMessage =
        serde_json::from_str(text).map_err(|err| FrameError::Malformed(err.to_string()))?;
    Ok(wire.into_chat_message())
}

/// Encode one outbound text frame for the real-time channel.
pub fn encode_outbound_frame(frame: &OutboundFrame) -> Result<String, FrameError> {
    serde_json::to_string(frame).map_err(|err| FrameError::Malformed(err.to_string()))
}

/// Parse a server timestamp.
///
/// The HTTP API sends RFC 3339 (`2025-03-01T10:15:00+00:00`) while channel
/// broadcasts use a space separator (`2025-03-01 10:15:00.123456+00:00`).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z"))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
