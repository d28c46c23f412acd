//! Application state wiring the chat components together.
//!
//! AppState resolves the data directory and configuration, then pins the
//! generic [`ChatClient`] to the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;

use shopchat_core::chat::client::{ChatClient, ClientSettings};
use shopchat_infra::api::HttpChatApi;
use shopchat_infra::channel::WsConnector;
use shopchat_infra::config::{apply_env_overrides, load_config};
use shopchat_infra::filesystem::resolve_data_dir;
use shopchat_infra::filesystem::session_store::FileSessionStore;
use shopchat_types::config::ChatConfig;

use crate::cli::chat::renderer::TerminalSink;

/// Chat client pinned to HTTP, WebSocket, the session file and the terminal.
pub type TerminalClient = ChatClient<HttpChatApi, WsConnector, FileSessionStore, TerminalSink>;

/// Shared application state used by every command.
#[derive(Clone)]
pub struct AppState {
    pub config: ChatConfig,
    pub api: Arc<HttpChatApi>,
    pub store: FileSessionStore,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Resolve the data directory, load config, and build the HTTP client.
    ///
    /// Precedence for the base URL: `--base-url`, then `SHOPCHAT_BASE_URL`,
    /// then `config.toml`, then the built-in default.
    pub async fn init(data_dir: Option<PathBuf>, base_url: Option<String>) -> anyhow::Result<Self> {
        let data_dir = data_dir.unwrap_or_else(resolve_data_dir);

        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir).await?;

        let mut config = load_config(&data_dir).await;
        apply_env_overrides(&mut config);
        if let Some(base_url) = base_url {
            config.base_url = base_url;
        }

        let api = Arc::new(HttpChatApi::from_config(&config)?);
        let store = FileSessionStore::new(&data_dir);

        tracing::debug!(
            data_dir = %data_dir.display(),
            base_url = %api.base_url(),
            "Application state initialized"
        );

        Ok(Self {
            config,
            api,
            store,
            data_dir,
        })
    }

    /// Build a chat client that renders into `sink`.
    pub fn chat_client(&self, sink: TerminalSink) -> TerminalClient {
        let connector = Arc::new(WsConnector::new(self.api.base_url().clone()));
        ChatClient::new(
            Arc::clone(&self.api),
            connector,
            self.store.clone(),
            sink,
            ClientSettings::from(&self.config),
        )
    }
}
