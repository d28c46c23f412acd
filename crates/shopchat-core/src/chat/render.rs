//! Render surface: where messages end up.
//!
//! A [`RenderSink`] is the UI collaborator: it appends messages and toggles
//! the few pieces of widget state the core drives (conversation visible,
//! input disabled, failure notices). The core never touches a sink directly;
//! it goes through [`RenderSurface`], which serializes every mutation behind
//! one mutex so that a reconciliation pass (clear + re-render) is atomic with
//! respect to real-time appends.

use std::sync::{Arc, Mutex};

use shopchat_types::chat::ChatMessage;

/// UI collaborator that displays the conversation.
pub trait RenderSink: Send + 'static {
    /// Display one message after the ones already shown.
    fn append(&mut self, message: &ChatMessage);

    /// Remove every displayed message.
    fn clear(&mut self);

    /// Number of messages currently displayed.
    fn rendered_count(&self) -> usize;

    /// Hide the pre-chat form and enable message input.
    fn show_conversation(&mut self);

    /// Disable message input, showing `placeholder` in its place.
    fn disable_input(&mut self, placeholder: &str);

    /// Show a user-visible failure notice (e.g., session creation failed).
    fn notify_failure(&mut self, notice: &str);
}

/// Shared, mutex-guarded handle to a [`RenderSink`].
pub struct RenderSurface<R> {
    sink: Arc<Mutex<R>>,
}

impl<R> Clone for RenderSurface<R> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<R: RenderSink> RenderSurface<R> {
    pub fn new(sink: R) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    pub fn append(&self, message: &ChatMessage) {
        self.sink.lock().expect("render lock poisoned").append(message);
    }

    /// Clear and render `messages` in order, under a single guard.
    pub fn replace_all(&self, messages: &[ChatMessage]) {
        let mut sink = self.sink.lock().expect("render lock poisoned");
        sink.clear();
        for message in messages {
            sink.append(message);
        }
    }

    /// Replace the rendered sequence only if the authoritative list is longer.
    ///
    /// The count comparison and the re-render happen under the same guard.
    /// Returns whether a replacement happened.
    pub fn replace_if_behind(&self, messages: &[ChatMessage]) -> bool {
        let mut sink = self.sink.lock().expect("render lock poisoned");
        if messages.len() <= sink.rendered_count() {
            return false;
        }
        sink.clear();
        for message in messages {
            sink.append(message);
        }
        true
    }

    pub fn rendered_count(&self) -> usize {
        self.sink.lock().expect("render lock poisoned").rendered_count()
    }

    pub fn show_conversation(&self) {
        self.sink.lock().expect("render lock poisoned").show_conversation();
    }

    pub fn disable_input(&self, placeholder: &str) {
        self.sink
            .lock()
            .expect("render lock poisoned")
            .disable_input(placeholder);
    }

    pub fn notify_failure(&self, notice: &str) {
        self.sink
            .lock()
            .expect("render lock poisoned")
            .notify_failure(notice);
    }

    /// Run `f` against the sink while holding the guard.
    pub fn with_sink<T>(&self, f: impl FnOnce(&R) -> T) -> T {
        f(&self.sink.lock().expect("render lock poisoned"))
    }

    /// Mutable variant of [`with_sink`](Self::with_sink).
    pub fn with_sink_mut<T>(&self, f: impl FnOnce(&mut R) -> T) -> T {
        f(&mut self.sink.lock().expect("render lock poisoned"))
    }
}

/// In-memory [`RenderSink`] that records everything it is asked to show.
///
/// Used for headless embedding and by the tests.
#[derive(Debug, Clone)]
pub struct MessageLog {
    messages: Vec<ChatMessage>,
    conversation_visible: bool,
    input_enabled: bool,
    input_placeholder: Option<String>,
    failures: Vec<String>,
    clears: usize,
}

impl Default for MessageLog {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            conversation_visible: false,
            input_enabled: true,
            input_placeholder: None,
            failures: Vec::new(),
            clears: 0,
        }
    }
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn bodies(&self) -> Vec<&str> {
        self.messages.iter().map(|m| m.body.as_str()).collect()
    }

    pub fn conversation_visible(&self) -> bool {
        self.conversation_visible
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    pub fn input_placeholder(&self) -> Option<&str> {
        self.input_placeholder.as_deref()
    }

    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    /// How many times the surface was cleared (one per reconciliation re-render).
    pub fn clears(&self) -> usize {
        self.clears
    }
}

impl RenderSink for MessageLog {
    fn append(&mut self, message: &ChatMessage) {
        self.messages.push(message.clone());
    }

    fn clear(&mut self) {
        self.messages.clear();
        self.clears += 1;
    }

    fn rendered_count(&self) -> usize {
        self.messages.len()
    }

    fn show_conversation(&mut self) {
        self.conversation_visible = true;
        self.input_enabled = true;
        self.input_placeholder = None;
    }

    fn disable_input(&mut self, placeholder: &str) {
        self.input_enabled = false;
        self.input_placeholder = Some(placeholder.to_string());
    }

    fn notify_failure(&mut self, notice: &str) {
        self.failures.push(notice.to_string());
    }
}
