//! Reconciliation poller.
//!
//! Runs independently of the real-time channel: every poll interval it reads
//! the authoritative message list and the session status, re-renders the
//! conversation when the server knows more messages than are displayed, and
//! reports closure (once) when either read says the session is inactive.
//!
//! Fetch failures are logged and the cycle is skipped; the next tick tries
//! again with no backoff. Results that resolve after `stop()` are discarded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chat::api::ChatApi;
use crate::chat::render::{RenderSink, RenderSurface};

/// Receives the server-driven closure signal.
pub trait ClosureListener: Send + Sync + 'static {
    fn session_closed(&self) -> impl std::future::Future<Output = ()> + Send;
}

struct Worker {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct ReconciliationPoller<C: ChatApi, R: RenderSink> {
    api: Arc<C>,
    surface: RenderSurface<R>,
    interval: Duration,
    worker: Mutex<Option<Worker>>,
    retired: Mutex<Vec<JoinHandle<()>>>,
    cycles: Arc<AtomicU64>,
}

impl<C: ChatApi, R: RenderSink> ReconciliationPoller<C, R> {
    pub fn new(api: Arc<C>, surface: RenderSurface<R>, interval: Duration) -> Self {
        Self {
            api,
            surface,
            interval,
            worker: Mutex::new(None),
            retired: Mutex::new(Vec::new()),
            cycles: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Completed poll cycles (results applied, not discarded).
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .expect("poller lock poisoned")
            .as_ref()
            .is_some_and(|w| !w.token.is_cancelled() && !w.handle.is_finished())
    }

    /// Start polling for `session_key`. No-op if already running.
    ///
    /// The first cycle runs one full interval after this call.
    pub fn start<L: ClosureListener>(&self, session_key: &str, listener: L) {
        let mut worker = self.worker.lock().expect("poller lock poisoned");
        if worker
            .as_ref()
            .is_some_and(|w| !w.token.is_cancelled() && !w.handle.is_finished())
        {
            debug!(session_key, "Poller already running, ignoring start");
            return;
        }

        let token = CancellationToken::new();
        let task = PollTask {
            api: Arc::clone(&self.api),
            surface: self.surface.clone(),
            interval: self.interval,
            session_key: session_key.to_string(),
            token: token.clone(),
            cycles: Arc::clone(&self.cycles),
            listener,
        };
        debug!(session_key, interval_ms = self.interval.as_millis() as u64, "Poller started");
        let handle = tokio::spawn(task.run());
        if let Some(previous) = worker.replace(Worker { token, handle }) {
            self.retire(previous.handle);
        }
    }

    /// Keep a cancelled task's handle for `shutdown()`, dropping finished ones.
    fn retire(&self, handle: JoinHandle<()>) {
        let mut retired = self.retired.lock().expect("poller lock poisoned");
        retired.retain(|h| !h.is_finished());
        retired.push(handle);
    }

    /// Cancel the poll timer. In-flight fetches are discarded when they resolve.
    pub fn stop(&self) {
        if let Some(worker) = self.worker.lock().expect("poller lock poisoned").take() {
            worker.token.cancel();
            self.retire(worker.handle);
            debug!("Poller stopped");
        }
    }

    /// Stop and wait for the poll task to exit.
    pub async fn shutdown(&self) {
        self.stop();
        let handles: Vec<_> = self
            .retired
            .lock()
            .expect("poller lock poisoned")
            .drain(..)
            .collect();
        for handle in handles {
            let _ = handle.await;
        }
    }
}

struct PollTask<C, R, L> {
    api: Arc<C>,
    surface: RenderSurface<R>,
    interval: Duration,
    session_key: String,
    token: CancellationToken,
    cycles: Arc<AtomicU64>,
    listener: L,
}

impl<C: ChatApi, R: RenderSink, L: ClosureListener> PollTask<C, R, L> {
    async fn run(self) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut closure_reported = false;

        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => return,
                _ = ticker.tick() => {}
            }

            let (messages, status) = tokio::join!(
                self.api.fetch_messages(&self.session_key),
                self.api.fetch_status(&self.session_key),
            );
            if self.token.is_cancelled() {
                debug!(session_key = %self.session_key, "Discarding poll results after stop");
                return;
            }
            self.cycles.fetch_add(1, Ordering::SeqCst);

            let mut inactive = false;
            match messages {
                Ok(snapshot) => {
                    if let Some(list) = snapshot.messages.as_deref() {
                        if self.surface.replace_if_behind(list) {
                            debug!(
                                session_key = %self.session_key,
                                count = list.len(),
                                "Re-rendered conversation from server"
                            );
                        }
                    }
                    inactive |= snapshot.is_active == Some(false);
                }
                Err(err) => {
                    warn!(session_key = %self.session_key, error = %err, "Message fetch failed");
                }
            }
            match status {
                Ok(active) => inactive |= !active,
                Err(err) => {
                    warn!(session_key = %self.session_key, error = %err, "Status fetch failed");
                }
            }

            if inactive && !closure_reported {
                closure_reported = true;
                info!(session_key = %self.session_key, "Server reports session closed");
                self.listener.session_closed().await;
            }
        }
    }
}
