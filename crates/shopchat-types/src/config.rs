//! Client configuration types for shopchat.
//!
//! `ChatConfig` represents `config.toml` in the data directory. Every field
//! has a default matching the storefront widget's timings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Lower bound applied to the poll interval and reconnect delay.
pub const MIN_INTERVAL_MS: u64 = 100;

/// Text rendered when support closes the conversation.
pub const DEFAULT_CLOSURE_NOTICE: &str =
    "This chat session has been closed by our support team. Thank you for contacting us!";

/// Top-level configuration for the chat client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Storefront origin, e.g. `https://shop.example.com`. The real-time
    /// channel URL is derived from it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// How often the reconciliation poller fetches the authoritative state.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Fixed delay before reconnecting a dropped real-time channel.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Timeout applied to each HTTP request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Value sent as `X-CSRFToken` on POST requests.
    #[serde(default)]
    pub csrf_token: Option<String>,

    /// System message rendered when the session is closed by support.
    #[serde(default = "default_closure_notice")]
    pub closure_notice: String,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_reconnect_delay_ms() -> u64 {
    3_000
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_closure_notice() -> String {
    DEFAULT_CLOSURE_NOTICE.to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            poll_interval_ms: default_poll_interval_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            csrf_token: None,
            closure_notice: default_closure_notice(),
        }
    }
}

impl ChatConfig {
    /// Poll interval, floored at [`MIN_INTERVAL_MS`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_INTERVAL_MS))
    }

    /// Reconnect delay, floored at [`MIN_INTERVAL_MS`].
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms.max(MIN_INTERVAL_MS))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_config_default_values() {
        let config = ChatConfig::default();
        assert_eq!(config.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.reconnect_delay(), Duration::from_secs(3));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert!(config.csrf_token.is_none());
        assert_eq!(config.closure_notice, DEFAULT_CLOSURE_NOTICE);
    }

    #[test]
    fn test_chat_config_deserialize_with_defaults() {
        let config: ChatConfig = toml::from_str("").unwrap();
        assert_eq!(config.poll_interval_ms, 2_000);
        assert_eq!(config.reconnect_delay_ms, 3_000);
    }

    #[test]
    fn test_chat_config_deserialize_with_values() {
        let toml_str = r#"
base_url = "https://shop.example.com"
poll_interval_ms = 5000
reconnect_delay_ms = 1000
csrf_token = "abc123"
"#;
        let config: ChatConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.base_url, "https://shop.example.com");
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.reconnect_delay(), Duration::from_secs(1));
        assert_eq!(config.csrf_token.as_deref(), Some("abc123"));
        assert_eq!(config.request_timeout_secs, 10);
    }

    #[test]
    fn test_intervals_are_floored() {
        let config = ChatConfig {
            poll_interval_ms: 0,
            reconnect_delay_ms: 5,
            request_timeout_secs: 0,
            ..ChatConfig::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_millis(MIN_INTERVAL_MS));
        assert_eq!(config.reconnect_delay(), Duration::from_millis(MIN_INTERVAL_MS));
        assert_eq!(config.request_timeout(), Duration::from_secs(1));
    }
}
