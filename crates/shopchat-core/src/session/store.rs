//! SessionStore trait definition.
//!
//! The store is the durable mirror of the current chat identity so that a
//! conversation survives a reload. Implementations live in shopchat-infra
//! (e.g., `FileSessionStore`); [`MemorySessionStore`] is a process-local
//! implementation for embedding and tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use shopchat_types::chat::StoredSession;
use shopchat_types::error::StoreError;

/// Durable mirror of the chat identity (session key, name, email).
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait SessionStore: Send + Sync {
    /// Read the stored identity. Returns `None` when nothing usable is stored.
    fn load(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<StoredSession>, StoreError>> + Send;

    /// Persist the identity, replacing any previous one.
    fn save(
        &self,
        session: &StoredSession,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Remove key, name, and email together. No-op if nothing is stored.
    fn clear(&self) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}

impl<S: SessionStore> SessionStore for std::sync::Arc<S> {
    async fn load(&self) -> Result<Option<StoredSession>, StoreError> {
        (**self).load().await
    }

    async fn save(&self, session: &StoredSession) -> Result<(), StoreError> {
        (**self).save(session).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        (**self).clear().await
    }
}

/// In-memory [`SessionStore`].
///
/// Holds the identity for the lifetime of the process only.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<StoredSession>>,
    clears: AtomicUsize,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a session (a "previous page load").
    pub fn with_session(session: StoredSession) -> Self {
        Self {
            slot: Mutex::new(Some(session)),
            clears: AtomicUsize::new(0),
        }
    }

    /// Current contents, without going through the async API.
    pub fn snapshot(&self) -> Option<StoredSession> {
        self.slot.lock().expect("session store lock poisoned").clone()
    }

    /// Number of `clear()` calls so far.
    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<StoredSession>, StoreError> {
        let slot = self.slot.lock().expect("session store lock poisoned");
        Ok(slot.clone().filter(StoredSession::is_complete))
    }

    async fn save(&self, session: &StoredSession) -> Result<(), StoreError> {
        *self.slot.lock().expect("session store lock poisoned") = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.slot.lock().expect("session store lock poisoned").take();
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
