//! Chat session, message, and connection types for shopchat.
//!
//! These types model one customer-support conversation as seen from the
//! client: the stored identity, the session lifecycle, the messages shown on
//! the render surface, and the state of the real-time channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a chat session.
///
/// `Unstarted -> Active` on successful creation or resume,
/// `Active -> Closed` on a server-driven closure notice. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Unstarted,
    Active,
    Closed,
}

impl SessionState {
    /// Whether the session accepts messages and keeps its background tasks alive.
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Unstarted => write!(f, "unstarted"),
            SessionState::Active => write!(f, "active"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

impl FromStr for SessionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unstarted" => Ok(SessionState::Unstarted),
            "active" => Ok(SessionState::Active),
            "closed" => Ok(SessionState::Closed),
            other => Err(format!("invalid session state: '{other}'")),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Unstarted
    }
}

/// The durable identity of a chat session.
///
/// `session_key` is issued by the server; `name` and `email` are supplied by
/// the customer and never change for the lifetime of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub session_key: String,
    pub name: String,
    pub email: String,
}

impl StoredSession {
    pub fn new(
        session_key: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            session_key: session_key.into(),
            name: name.into(),
            email: email.into(),
        }
    }

    /// A stored identity is only usable when all three fields are present.
    pub fn is_complete(&self) -> bool {
        !self.session_key.trim().is_empty()
            && !self.name.trim().is_empty()
            && !self.email.trim().is_empty()
    }
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// The customer using this client.
    User,
    /// Support staff replying from the admin side.
    Counterparty,
}

impl Origin {
    /// Map the wire flag `is_staff_reply` to an origin.
    pub fn from_staff_flag(is_staff_reply: bool) -> Self {
        if is_staff_reply {
            Origin::Counterparty
        } else {
            Origin::User
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Origin::Counterparty)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::User => write!(f, "user"),
            Origin::Counterparty => write!(f, "staff"),
        }
    }
}

/// A single message on the render surface.
///
/// The timestamp is client-generated for optimistic echoes and
/// server-assigned for messages that arrive over the channel or a fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub body: String,
    pub origin: Origin,
    pub timestamp: DateTime<Utc>,
    /// Server-side id, when the server reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,
}

impl ChatMessage {
    pub fn new(body: impl Into<String>, origin: Origin, timestamp: DateTime<Utc>) -> Self {
        Self {
            body: body.into(),
            origin,
            timestamp,
            message_id: None,
        }
    }

    /// A message authored locally, stamped with the current time.
    pub fn local_echo(body: impl Into<String>) -> Self {
        Self::new(body, Origin::User, Utc::now())
    }
}

/// State of the real-time channel for the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Idle => write!(f, "idle"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        ConnectionState::Idle
    }
}
