//! Session lifecycle state machine.
//!
//! `Unstarted -> Active -> Closed`, with `Closed` terminal. The state is
//! published through a `tokio::sync::watch` channel: the transport manager
//! and the poller hold receivers and read the state at the moment they are
//! about to act (e.g., when a reconnect delay fires), never a cached copy.

use std::sync::Mutex;

use shopchat_types::chat::{SessionState, StoredSession};
use shopchat_types::error::ChatError;
use tokio::sync::watch;

/// Owner of the session state and the identity of the current session.
#[derive(Debug)]
pub struct SessionLifecycle {
    state: watch::Sender<SessionState>,
    session: Mutex<Option<StoredSession>>,
}

impl SessionLifecycle {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::Unstarted);
        Self {
            state,
            session: Mutex::new(None),
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// A receiver that observes every future transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Identity of the current session, if one was ever activated.
    pub fn session(&self) -> Option<StoredSession> {
        self.session.lock().expect("lifecycle lock poisoned").clone()
    }

    /// Session key for addressing requests, only while `Active`.
    pub fn active_key(&self) -> Option<String> {
        if !self.state().is_active() {
            return None;
        }
        self.session().map(|session| session.session_key)
    }

    /// Transition `Unstarted -> Active` for the given identity.
    ///
    /// Any other starting state is rejected with `InvalidState`.
    pub fn activate(&self, session: StoredSession) -> Result<(), ChatError> {
        // Readers that observe `Active` block on this guard until the
        // identity is in place.
        let mut slot = self.session.lock().expect("lifecycle lock poisoned");
        let mut rejected = None;
        self.state.send_if_modified(|state| {
            if *state == SessionState::Unstarted {
                *state = SessionState::Active;
                true
            } else {
                rejected = Some(*state);
                false
            }
        });
        if let Some(state) = rejected {
            return Err(ChatError::InvalidState(state.to_string()));
        }
        *slot = Some(session);
        Ok(())
    }

    /// Transition `Active -> Closed`.
    ///
    /// Returns the closed session only for the call that performed the
    /// transition; every later call (and a call from `Unstarted`) returns
    /// `None`, which makes closure fan-out run exactly once.
    pub fn mark_closed(&self) -> Option<StoredSession> {
        let transitioned = self.state.send_if_modified(|state| {
            if *state == SessionState::Active {
                *state = SessionState::Closed;
                true
            } else {
                false
            }
        });
        if transitioned {
            self.session()
        } else {
            None
        }
    }
}

impl Default for SessionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
