//! Terminal render sink for the chat loop.
//!
//! Prints each message as one styled line. Output goes through a swappable
//! writer: plain stdout while the session is being set up, then the
//! readline `SharedWriter` so incoming messages never clobber the prompt.

use std::io::Write;

use chrono::Local;
use console::style;

use shopchat_core::chat::render::RenderSink;
use shopchat_types::chat::{ChatMessage, Origin};

/// Format one message: `[HH:MM] Support > body`.
pub fn format_message(message: &ChatMessage) -> String {
    let time = message.timestamp.with_timezone(&Local).format("%H:%M");
    let label = match message.origin {
        Origin::User => style("You").green().bold(),
        Origin::Counterparty => style("Support").cyan().bold(),
    };
    format!("  {} {} {} {}", style(format!("[{time}]")).dim(), label, style(">").dim(), message.body)
}

/// [`RenderSink`] that writes to the terminal.
pub struct TerminalSink {
    out: Box<dyn Write + Send>,
    rendered: usize,
    input_enabled: bool,
}

impl TerminalSink {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out,
            rendered: 0,
            input_enabled: true,
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Redirect output, e.g. to the readline `SharedWriter` once the prompt is up.
    pub fn set_writer(&mut self, out: Box<dyn Write + Send>) {
        let _ = self.out.flush();
        self.out = out;
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{text}");
        let _ = self.out.flush();
    }
}

impl RenderSink for TerminalSink {
    fn append(&mut self, message: &ChatMessage) {
        let line = format_message(message);
        self.line(&line);
        self.rendered += 1;
    }

    fn clear(&mut self) {
        // Scrollback stays; mark where the server's copy of the conversation begins.
        let marker = format!("  {}", style("--- conversation refreshed ---").dim());
        self.line(&marker);
        self.rendered = 0;
    }

    fn rendered_count(&self) -> usize {
        self.rendered
    }

    fn show_conversation(&mut self) {
        self.input_enabled = true;
    }

    fn disable_input(&mut self, placeholder: &str) {
        self.input_enabled = false;
        let line = format!("  {}", style(placeholder).dim().italic());
        self.line(&line);
    }

    fn notify_failure(&mut self, notice: &str) {
        let line = format!("  {} {}", style("!").red().bold(), notice);
        self.line(&line);
    }
}
