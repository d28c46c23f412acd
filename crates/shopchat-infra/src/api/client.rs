//! HttpChatApi -- concrete [`ChatApi`] implementation over the chat server's
//! JSON endpoints.
//!
//! The server answers errors with a non-2xx status and a JSON `{error}` body,
//! so response bodies are decoded regardless of status. A body that does not
//! match the expected shape is classified as:
//! - `Rejected` when it carries an `error` message,
//! - `Decode` on a 2xx status,
//! - `Status` otherwise.
//!
//! The CSRF token is wrapped in [`secrecy::SecretString`] and is only exposed
//! when constructing request headers.

use reqwest::{RequestBuilder, Response, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use shopchat_core::chat::api::ChatApi;
use shopchat_types::config::ChatConfig;
use shopchat_types::error::{ApiError, ConfigError};
use shopchat_types::wire::{
    MessageSnapshot, MessagesResponse, SendMessageRequest, SendMessageResponse,
    StartSessionRequest, StartSessionResponse, StatusResponse,
};

use crate::config::parse_base_url;

/// Longest error body carried in [`ApiError::Status`].
const MAX_ERROR_BODY: usize = 512;

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Chat server HTTP client.
pub struct HttpChatApi {
    client: reqwest::Client,
    base_url: Url,
    csrf_token: Option<SecretString>,
}

impl HttpChatApi {
    /// Header carrying the CSRF token on POST requests.
    const CSRF_HEADER: &'static str = "X-CSRFToken";

    /// Build a client from configuration (base URL, timeout, CSRF token).
    pub fn from_config(config: &ChatConfig) -> Result<Self, ConfigError> {
        let base_url = parse_base_url(&config.base_url)?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            csrf_token: config.csrf_token.clone().map(SecretString::from),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/{segments...}/` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| ApiError::Http(format!("base url cannot carry a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments)
            .push("");
        Ok(url)
    }

    fn with_csrf(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.csrf_token {
            Some(token) => request.header(Self::CSRF_HEADER, token.expose_secret()),
            None => request,
        }
    }

    async fn send(request: RequestBuilder) -> Result<Response, ApiError> {
        request
            .send()
            .await
            .map_err(|e| ApiError::Http(format!("HTTP request failed: {e}")))
    }

    /// Decode a JSON body whatever the status code.
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Http(format!("failed to read response: {e}")))?;

        match serde_json::from_str::<T>(&body) {
            Ok(value) => Ok(value),
            Err(err) => {
                if let Ok(ErrorBody { error: Some(message) }) = serde_json::from_str(&body) {
                    return Err(ApiError::Rejected(message));
                }
                if status.is_success() {
                    Err(ApiError::Decode(format!("failed to parse response: {err}")))
                } else {
                    Err(ApiError::Status {
                        status: status.as_u16(),
                        body: truncate(body),
                    })
                }
            }
        }
    }
}

fn truncate(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}

impl ChatApi for HttpChatApi {
    async fn start_session(&self, name: &str, email: &str) -> Result<String, ApiError> {
        let url = self.endpoint(&["chat", "start-session"])?;
        tracing::debug!(url = %url, "Starting chat session");

        let request = self.with_csrf(self.client.post(url)).json(&StartSessionRequest {
            name: name.to_string(),
            email: email.to_string(),
        });
        let resp: StartSessionResponse = Self::decode(Self::send(request).await?).await?;

        match resp.session_key.filter(|key| !key.trim().is_empty()) {
            Some(key) => Ok(key),
            None => Err(ApiError::Rejected(
                resp.error
                    .unwrap_or_else(|| "response carried no session key".to_string()),
            )),
        }
    }

    async fn send_message(
        &self,
        session_key: &str,
        body: &str,
    ) -> Result<SendMessageResponse, ApiError> {
        let url = self.endpoint(&["chat", "send-message"])?;
        tracing::debug!(session_key, "Sending message over HTTP");

        let request = self.with_csrf(self.client.post(url)).json(&SendMessageRequest {
            session_key: session_key.to_string(),
            message: body.to_string(),
        });
        // An `{error}` body decodes into a non-success response.
        Self::decode(Self::send(request).await?).await
    }

    async fn fetch_messages(&self, session_key: &str) -> Result<MessageSnapshot, ApiError> {
        let url = self.endpoint(&["chat", "session", session_key, "messages"])?;
        let resp: MessagesResponse = Self::decode(Self::send(self.client.get(url)).await?).await?;

        if resp.messages.is_none() {
            if let Some(error) = resp.error {
                return Err(ApiError::Rejected(error));
            }
        }
        Ok(MessageSnapshot::from(resp))
    }

    /// An `{error}` answer means the server cannot report the session at all
    /// (a deleted session yields 500 with `{error}`), which counts as inactive.
    /// Transport failures and unparseable bodies stay errors.
    async fn fetch_status(&self, session_key: &str) -> Result<bool, ApiError> {
        let url = self.endpoint(&["chat", "session", session_key, "status"])?;
        let response = Self::send(self.client.get(url)).await?;
        match Self::decode::<StatusResponse>(response).await {
            Ok(resp) => Ok(resp.is_active),
            Err(ApiError::Rejected(reason)) => {
                tracing::warn!(session_key, %reason, "Server cannot report session status, treating as closed");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::*;

    #[derive(Clone, Default)]
    struct Recorded {
        csrf: Arc<Mutex<Vec<Option<String>>>>,
        sends: Arc<Mutex<Vec<Value>>>,
    }

    async fn start_session(
        State(recorded): State<Recorded>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> impl IntoResponse {
        recorded.csrf.lock().unwrap().push(
            headers
                .get("x-csrftoken")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        );
        let name = body["name"].as_str().unwrap_or_default();
        if name.is_empty() {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Name and email are required"})),
            );
        }
        (
            StatusCode::OK,
            Json(json!({"session_key": "sk1", "name": name, "email": body["email"]})),
        )
    }

    async fn send_message(
        State(recorded): State<Recorded>,
        Json(body): Json<Value>,
    ) -> impl IntoResponse {
        recorded.sends.lock().unwrap().push(body.clone());
        if body["message"].as_str().unwrap_or_default().is_empty() {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Session key and message are required"})),
            );
        }
        (
            StatusCode::OK,
            Json(json!({"status": "success", "message_id": 42, "timestamp": "2025-03-01T10:15:00+00:00"})),
        )
    }

    async fn messages(Path(key): Path<String>) -> impl IntoResponse {
        if key != "sk1" {
            return (StatusCode::NOT_FOUND, Json(json!({"error": "Session not found"})));
        }
        (
            StatusCode::OK,
            Json(json!({
                "messages": [
                    {"message": "Hi! How can I help you today?", "is_staff_reply": true, "timestamp": "2025-03-01T10:00:00+00:00"},
                    {"message": "where is my order", "is_staff_reply": false, "timestamp": "2025-03-01T10:01:00+00:00"}
                ],
                "session_info": {"is_active": true, "user_name": "A", "user_email": "a@x.com"}
            })),
        )
    }

    async fn status(Path(key): Path<String>) -> impl IntoResponse {
        match key.as_str() {
            "sk1" => (StatusCode::OK, Json(json!({"is_active": false}))).into_response(),
            "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>").into_response(),
            "deleted" => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "No ChatSession matches the given query."})),
            )
                .into_response(),
            _ => (StatusCode::NOT_FOUND, Json(json!({"error": "Session not found"}))).into_response(),
        }
    }

    async fn spawn_server(recorded: Recorded) -> String {
        let app = Router::new()
            .route("/chat/start-session/", post(start_session))
            .route("/chat/send-message/", post(send_message))
            .route("/chat/session/{key}/messages/", get(messages))
            .route("/chat/session/{key}/status/", get(status))
            .with_state(recorded);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client_for(base_url: String, csrf: Option<&str>) -> HttpChatApi {
        let config = ChatConfig {
            base_url,
            csrf_token: csrf.map(str::to_string),
            ..ChatConfig::default()
        };
        HttpChatApi::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn test_start_session_returns_key_and_sends_csrf() {
        let recorded = Recorded::default();
        let api = client_for(spawn_server(recorded.clone()).await, Some("tok"));

        let key = api.start_session("A", "a@x.com").await.unwrap();
        assert_eq!(key, "sk1");
        assert_eq!(*recorded.csrf.lock().unwrap(), vec![Some("tok".to_string())]);
    }

    #[tokio::test]
    async fn test_start_session_error_body_is_rejected() {
        let api = client_for(spawn_server(Recorded::default()).await, None);

        let err = api.start_session("", "a@x.com").await.unwrap_err();
        assert!(matches!(err, ApiError::Rejected(msg) if msg == "Name and email are required"));
    }

    #[tokio::test]
    async fn test_send_message_success() {
        let recorded = Recorded::default();
        let api = client_for(spawn_server(recorded.clone()).await, None);

        let resp = api.send_message("sk1", "hello").await.unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.message_id, Some(42));
        assert_eq!(
            recorded.sends.lock().unwrap()[0],
            json!({"session_key": "sk1", "message": "hello"})
        );
    }

    #[tokio::test]
    async fn test_send_message_error_body_is_not_success() {
        let api = client_for(spawn_server(Recorded::default()).await, None);

        let resp = api.send_message("sk1", "").await.unwrap();
        assert!(!resp.is_success());
        assert_eq!(resp.error.as_deref(), Some("Session key and message are required"));
    }

    #[tokio::test]
    async fn test_fetch_messages_snapshot() {
        let api = client_for(spawn_server(Recorded::default()).await, None);

        let snapshot = api.fetch_messages("sk1").await.unwrap();
        let messages = snapshot.messages.unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].origin.is_staff());
        assert_eq!(messages[1].body, "where is my order");
        assert_eq!(snapshot.is_active, Some(true));
    }

    #[tokio::test]
    async fn test_fetch_messages_unknown_session() {
        let api = client_for(spawn_server(Recorded::default()).await, None);

        let err = api.fetch_messages("nope").await.unwrap_err();
        assert!(matches!(err, ApiError::Rejected(msg) if msg == "Session not found"));
    }

    #[tokio::test]
    async fn test_fetch_status() {
        let api = client_for(spawn_server(Recorded::default()).await, None);

        assert!(!api.fetch_status("sk1").await.unwrap());
        assert!(matches!(
            api.fetch_status("broken").await.unwrap_err(),
            ApiError::Status { status: 500, .. }
        ));
    }

    #[tokio::test]
    async fn test_fetch_status_of_deleted_session_is_inactive() {
        let api = client_for(spawn_server(Recorded::default()).await, None);

        assert!(!api.fetch_status("deleted").await.unwrap());
        assert!(!api.fetch_status("unknown").await.unwrap());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_http_error() {
        // Bind and drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let api = client_for(format!("http://{addr}"), None);
        assert!(matches!(
            api.fetch_status("sk1").await.unwrap_err(),
            ApiError::Http(_)
        ));
    }

    #[test]
    fn test_endpoint_keeps_base_path_and_trailing_slash() {
        let api = client_for("https://shop.example.com/store/".to_string(), None);
        assert_eq!(
            api.endpoint(&["chat", "session", "sk1", "messages"]).unwrap().as_str(),
            "https://shop.example.com/store/chat/session/sk1/messages/"
        );

        let api = client_for("http://127.0.0.1:8000".to_string(), None);
        assert_eq!(
            api.endpoint(&["chat", "start-session"]).unwrap().as_str(),
            "http://127.0.0.1:8000/chat/start-session/"
        );
    }
}
