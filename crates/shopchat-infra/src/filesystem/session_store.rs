//! JSON-file implementation of the `SessionStore` trait.
//!
//! The identity is one document, `{"session_key", "name", "email"}`, so key,
//! name, and email are always saved and cleared together. Writes go to a
//! sibling temp file that is then renamed over the target, so a reader never
//! observes a half-written identity.

use std::path::{Path, PathBuf};

use shopchat_core::session::store::SessionStore;
use shopchat_types::chat::StoredSession;
use shopchat_types::error::StoreError;

use super::session_path;

/// File-backed [`SessionStore`] at `{data_dir}/session.json`.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: session_path(data_dir),
        }
    }

    /// Store the identity at an explicit file path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Option<StoredSession>, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_str::<StoredSession>(&content) {
            Ok(session) if session.is_complete() => Ok(Some(session)),
            Ok(_) => {
                tracing::debug!("Stored session at {} is incomplete, ignoring", self.path.display());
                Ok(None)
            }
            Err(err) => {
                tracing::warn!("Failed to parse {}: {err}, ignoring", self.path.display());
                Ok(None)
            }
        }
    }

    async fn save(&self, session: &StoredSession) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(session)
            .map_err(|err| StoreError::Serialize(err.to_string()))?;

        let temp = self.temp_path();
        tokio::fs::write(&temp, json).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        tracing::debug!(session_key = %session.session_key, "Saved chat session");
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn identity() -> StoredSession {
        StoredSession::new("sk1", "A", "a@x.com")
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());

        store.save(&identity()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(identity()));
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn test_save_creates_data_dir() {
        let dir = tempdir().unwrap();
        let store = FileSessionStore::new(&dir.path().join("nested").join(".shopchat"));

        store.save(&identity()).await.unwrap();
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_save_replaces_previous_identity() {
        let dir = tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());

        store.save(&identity()).await.unwrap();
        let next = StoredSession::new("sk2", "B", "b@x.com");
        store.save(&next).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(next));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_ignores_corrupt_or_partial_file() {
        let dir = tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());

        tokio::fs::write(store.path(), "{ not json").await.unwrap();
        assert!(store.load().await.unwrap().is_none());

        tokio::fs::write(store.path(), r#"{"session_key":"sk1","name":"A"}"#)
            .await
            .unwrap();
        assert!(store.load().await.unwrap().is_none());

        tokio::fs::write(store.path(), r#"{"session_key":"sk1","name":"","email":"a@x.com"}"#)
            .await
            .unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_removes_identity() {
        let dir = tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());

        store.save(&identity()).await.unwrap();
        store.clear().await.unwrap();
        assert!(!store.path().exists());
        assert!(store.load().await.unwrap().is_none());

        // Clearing again is fine.
        store.clear().await.unwrap();
    }
}
