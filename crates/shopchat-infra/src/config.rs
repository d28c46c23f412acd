//! Configuration loader for shopchat.
//!
//! Reads `config.toml` from the data directory (`~/.shopchat/` in production)
//! and deserializes it into [`ChatConfig`]. Falls back to defaults when the
//! file is missing or malformed, then applies environment overrides.

use std::path::Path;

use reqwest::Url;
use shopchat_types::config::ChatConfig;
use shopchat_types::error::ConfigError;

/// Overrides `base_url`.
pub const BASE_URL_ENV: &str = "SHOPCHAT_BASE_URL";

/// Overrides `csrf_token`.
pub const CSRF_TOKEN_ENV: &str = "SHOPCHAT_CSRF_TOKEN";

/// Load configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`ChatConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_config(data_dir: &Path) -> ChatConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return ChatConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return ChatConfig::default();
        }
    };

    match toml::from_str::<ChatConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            ChatConfig::default()
        }
    }
}

/// Apply `SHOPCHAT_BASE_URL` / `SHOPCHAT_CSRF_TOKEN` from the process environment.
pub fn apply_env_overrides(config: &mut ChatConfig) {
    apply_overrides(config, |key| std::env::var(key).ok());
}

/// Apply overrides from an arbitrary variable lookup. Empty values are ignored.
pub fn apply_overrides<F>(config: &mut ChatConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(base_url) = lookup(BASE_URL_ENV) {
        config.base_url = base_url;
    }
    if let Some(token) = lookup(CSRF_TOKEN_ENV) {
        config.csrf_token = Some(token);
    }
}

/// Parse and validate the storefront base URL.
///
/// Only `http` and `https` origins are accepted; the real-time channel
/// scheme is derived from it.
pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(raw.trim()).map_err(|err| invalid(&err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    Ok(url)
}
