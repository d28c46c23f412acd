//! Delivery coordinator for outbound messages.
//!
//! Every accepted message is echoed on the render surface before any network
//! attempt. The real-time channel is tried first; if it reports the frame
//! unwritten, exactly one HTTP fallback request follows. The fallback result
//! is logged only: nothing is retried, queued, or re-rendered.

use std::sync::Arc;

use shopchat_types::chat::ChatMessage;
use tracing::{debug, warn};

use crate::chat::api::ChatApi;
use crate::chat::render::{RenderSink, RenderSurface};
use crate::transport::connector::ChannelConnector;
use crate::transport::manager::TransportManager;

/// Why a message was not dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Empty after trimming.
    EmptyBody,
    /// No session has been started or resumed.
    NoSession,
    /// The session was closed by support.
    SessionClosed,
}

/// Which path an outbound message took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Nothing rendered, nothing sent.
    Rejected(RejectReason),
    /// Written to the open real-time channel.
    RealTime,
    /// Sent over HTTP; `accepted` is whether the server reported success.
    Fallback { accepted: bool },
}

impl Dispatch {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Dispatch::Rejected(_))
    }
}

pub struct DeliveryCoordinator<C: ChatApi, T: ChannelConnector, R: RenderSink> {
    api: Arc<C>,
    transport: Arc<TransportManager<T>>,
    surface: RenderSurface<R>,
}

impl<C: ChatApi, T: ChannelConnector, R: RenderSink> DeliveryCoordinator<C, T, R> {
    pub fn new(
        api: Arc<C>,
        transport: Arc<TransportManager<T>>,
        surface: RenderSurface<R>,
    ) -> Self {
        Self {
            api,
            transport,
            surface,
        }
    }

    /// Send `body` for the session addressed by `session_key`.
    pub async fn send_message(&self, session_key: Option<&str>, body: &str) -> Dispatch {
        let body = body.trim();
        if body.is_empty() {
            debug!("Ignoring empty message");
            return Dispatch::Rejected(RejectReason::EmptyBody);
        }
        let Some(session_key) = session_key else {
            debug!("Ignoring message without a session");
            return Dispatch::Rejected(RejectReason::NoSession);
        };

        self.surface.append(&ChatMessage::local_echo(body));

        if self.transport.send(body).await {
            debug!(session_key, "Message sent over real-time channel");
            return Dispatch::RealTime;
        }

        debug!(session_key, "Real-time channel unavailable, using HTTP fallback");
        match self.api.send_message(session_key, body).await {
            Ok(resp) if resp.is_success() => {
                debug!(session_key, message_id = ?resp.message_id, "Message sent via HTTP fallback");
                Dispatch::Fallback { accepted: true }
            }
            Ok(resp) => {
                warn!(
                    session_key,
                    status = resp.status.as_deref().unwrap_or("none"),
                    error = resp.error.as_deref().unwrap_or("unknown error"),
                    "HTTP fallback rejected message"
                );
                Dispatch::Fallback { accepted: false }
            }
            Err(err) => {
                warn!(session_key, error = %err, "HTTP fallback failed");
                Dispatch::Fallback { accepted: false }
            }
        }
    }
}
