//! WsConnector -- concrete [`ChannelConnector`] over WebSocket.
//!
//! The channel lives at `{ws|wss}://<host>/ws/chat/{session_key}/`, where the
//! scheme follows the storefront origin (`https` -> `wss`, otherwise `ws`).
//! Only text frames carry chat messages: ping/pong and binary frames are
//! skipped, and a close frame ends the inbound stream.

use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use tokio_tungstenite::tungstenite::Message;

use shopchat_core::transport::connector::{ChannelConnector, ChannelLink};
use shopchat_types::error::TransportError;

/// Build the real-time channel URL for a session.
pub fn channel_url(base_url: &Url, session_key: &str) -> Result<Url, TransportError> {
    let mut url = base_url.clone();
    let scheme = if base_url.scheme() == "https" { "wss" } else { "ws" };
    url.set_scheme(scheme)
        .map_err(|_| TransportError::Connect(format!("cannot derive channel url from {base_url}")))?;
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| TransportError::Connect(format!("cannot derive channel url from {base_url}")))?
        .clear()
        .extend(["ws", "chat", session_key])
        .push("");
    Ok(url)
}

/// Opens the chat channel with `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct WsConnector {
    base_url: Url,
}

impl WsConnector {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }
}

impl ChannelConnector for WsConnector {
    async fn connect(&self, session_key: &str) -> Result<ChannelLink, TransportError> {
        let url = channel_url(&self.base_url, session_key)?;
        tracing::debug!(url = %url, "Connecting real-time channel");

        let (socket, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let (write, read) = socket.split();

        let sink = write
            .sink_map_err(|e| TransportError::Send(e.to_string()))
            .with(|text: String| async move { Ok::<_, TransportError>(Message::Text(text.into())) });

        let stream = futures_util::stream::unfold(read, |mut read| async move {
            loop {
                match read.next().await {
                    Some(Ok(Message::Text(text))) => {
                        return Some((Ok(text.as_str().to_owned()), read));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::debug!(?frame, "Real-time channel closed by server");
                        return None;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        return Some((Err(TransportError::Receive(e.to_string())), read));
                    }
                    None => return None,
                }
            }
        });

        Ok(ChannelLink::new(sink, stream))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::Router;
    use axum::extract::Path;
    use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
    use axum::response::IntoResponse;
    use axum::routing::get;

    use super::*;

    /// Greets with a staff frame, echoes text, and closes on "bye".
    async fn chat_socket(Path(key): Path<String>, ws: WebSocketUpgrade) -> impl IntoResponse {
        ws.on_upgrade(move |socket| serve(socket, key))
    }

    async fn serve(mut socket: WebSocket, key: String) {
        let greeting = format!(r#"{{"message":"welcome {key}","is_staff_reply":true}}"#);
        if socket.send(WsMessage::Text(greeting.into())).await.is_err() {
            return;
        }
        let _ = socket.send(WsMessage::Ping(Vec::new().into())).await;

        while let Some(Ok(msg)) = socket.recv().await {
            if let WsMessage::Text(text) = msg {
                if text.as_str().contains("bye") {
                    let _ = socket.send(WsMessage::Close(None)).await;
                    return;
                }
                if socket.send(WsMessage::Text(text)).await.is_err() {
                    return;
                }
            }
        }
    }

    async fn spawn_server() -> Url {
        let app = Router::new().route("/ws/chat/{key}/", get(chat_socket));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Url::parse(&format!("http://{addr}")).unwrap()
    }

    #[test]
    fn test_channel_url_follows_origin_scheme() {
        let https = Url::parse("https://shop.example.com/store/?ref=x#top").unwrap();
        assert_eq!(
            channel_url(&https, "sk1").unwrap().as_str(),
            "wss://shop.example.com/ws/chat/sk1/"
        );

        let http = Url::parse("http://127.0.0.1:8000").unwrap();
        assert_eq!(
            channel_url(&http, "abc123").unwrap().as_str(),
            "ws://127.0.0.1:8000/ws/chat/abc123/"
        );
    }

    #[tokio::test]
    async fn test_connect_receive_and_echo() {
        let connector = WsConnector::new(spawn_server().await);
        let mut link = connector.connect("sk1").await.unwrap();

        let greeting = tokio::time::timeout(Duration::from_secs(5), link.stream.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(greeting.contains("welcome sk1"));

        link.sink
            .send(r#"{"message":"hi","is_staff_reply":false}"#.to_string())
            .await
            .unwrap();
        // The ping in between is skipped.
        let echo = tokio::time::timeout(Duration::from_secs(5), link.stream.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(echo, r#"{"message":"hi","is_staff_reply":false}"#);
    }

    #[tokio::test]
    async fn test_server_close_ends_stream() {
        let connector = WsConnector::new(spawn_server().await);
        let mut link = connector.connect("sk1").await.unwrap();
        let _greeting = link.stream.next().await;

        link.sink.send(r#"{"message":"bye"}"#.to_string()).await.unwrap();
        let end = tokio::time::timeout(Duration::from_secs(5), link.stream.next())
            .await
            .unwrap();
        assert!(end.is_none());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let connector = WsConnector::new(Url::parse(&format!("http://{addr}")).unwrap());
        assert!(matches!(
            connector.connect("sk1").await,
            Err(TransportError::Connect(_))
        ));
    }
}
