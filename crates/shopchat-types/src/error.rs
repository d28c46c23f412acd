use thiserror::Error;

/// Errors surfaced by the chat client's public operations.
///
/// Only session creation is ever shown to the customer; every other failure
/// in the delivery core is recovered locally and logged.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("failed to start chat session: {0}")]
    SessionCreation(String),

    #[error("name and email are required")]
    MissingIdentity,

    #[error("operation not allowed while session is {0}")]
    InvalidState(String),

    #[error("session store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors from the chat server's HTTP API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http request failed: {0}")]
    Http(String),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("server rejected request: {0}")]
    Rejected(String),
}

/// Errors from the real-time channel.
///
/// Never surfaced to the customer: the transport manager turns all of them
/// into a scheduled reconnect.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("receive failed: {0}")]
    Receive(String),

    #[error("connection closed")]
    Closed,
}

/// Errors decoding or encoding a channel frame.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Malformed(String),
}

/// Errors from the durable session mirror.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session store serialization error: {0}")]
    Serialize(String),
}

/// Errors resolving client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("failed to build http client: {0}")]
    HttpClient(String),
}
