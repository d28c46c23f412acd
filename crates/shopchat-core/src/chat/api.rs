//! ChatApi trait definition.
//!
//! The request/response half of the server protocol: session creation, the
//! HTTP fallback for outbound messages, and the two reconciliation reads.
//! The reqwest-backed implementation lives in shopchat-infra (`HttpChatApi`).

use shopchat_types::error::ApiError;
use shopchat_types::wire::{MessageSnapshot, SendMessageResponse};

/// Server endpoints used by the chat client.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait ChatApi: Send + Sync + 'static {
    /// Create a session and return its key.
    ///
    /// A response without a key is an error, whatever its HTTP status.
    fn start_session(
        &self,
        name: &str,
        email: &str,
    ) -> impl std::future::Future<Output = Result<String, ApiError>> + Send;

    /// Deliver a message over HTTP.
    ///
    /// Returns the decoded response body; the caller decides what counts as
    /// acceptance (see [`SendMessageResponse::is_success`]).
    fn send_message(
        &self,
        session_key: &str,
        body: &str,
    ) -> impl std::future::Future<Output = Result<SendMessageResponse, ApiError>> + Send;

    /// Fetch the authoritative message list and session info.
    fn fetch_messages(
        &self,
        session_key: &str,
    ) -> impl std::future::Future<Output = Result<MessageSnapshot, ApiError>> + Send;

    /// Fetch whether the session is still active.
    fn fetch_status(
        &self,
        session_key: &str,
    ) -> impl std::future::Future<Output = Result<bool, ApiError>> + Send;
}
