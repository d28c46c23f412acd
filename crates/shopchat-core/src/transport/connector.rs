//! ChannelConnector trait definition.
//!
//! A connector opens the real-time channel for one session and hands back a
//! [`ChannelLink`]: a sink for outbound text frames and a stream of inbound
//! text frames. The concrete WebSocket implementation lives in
//! shopchat-infra (`WsConnector`); the wire protocol stays behind this seam.

use std::pin::Pin;

use futures_util::{Sink, Stream};
use shopchat_types::error::TransportError;

/// Outbound half of an open channel.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;

/// Inbound half of an open channel. The stream ends when the peer closes.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

/// One open connection, split into its two halves.
pub struct ChannelLink {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl ChannelLink {
    pub fn new<K, S>(sink: K, stream: S) -> Self
    where
        K: Sink<String, Error = TransportError> + Send + 'static,
        S: Stream<Item = Result<String, TransportError>> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        }
    }
}

impl std::fmt::Debug for ChannelLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelLink").finish_non_exhaustive()
    }
}

/// Opens the real-time channel addressed by a session key.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait ChannelConnector: Send + Sync + 'static {
    fn connect(
        &self,
        session_key: &str,
    ) -> impl std::future::Future<Output = Result<ChannelLink, TransportError>> + Send;
}
