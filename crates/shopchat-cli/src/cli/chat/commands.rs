//! Slash command parsing for the chat loop.
//!
//! Commands start with `/`; anything else is sent to support as a message.

use std::io::Write;

use console::style;

/// Available slash commands in the chat loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    /// Show available commands.
    Help,
    /// Clear the terminal screen.
    Clear,
    /// Reprint the conversation as the server has it.
    History,
    /// Show session and connection details.
    Status,
    /// Leave the chat. The session stays stored for the next run.
    Exit,
    /// Unknown command.
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let cmd = trimmed
        .split_whitespace()
        .next()
        .unwrap_or(trimmed)
        .to_lowercase();

    match cmd.as_str() {
        "/help" | "/h" | "/?" => Some(ChatCommand::Help),
        "/clear" | "/cls" => Some(ChatCommand::Clear),
        "/history" => Some(ChatCommand::History),
        "/status" => Some(ChatCommand::Status),
        "/exit" | "/quit" | "/q" => Some(ChatCommand::Exit),
        other => Some(ChatCommand::Unknown(other.to_string())),
    }
}

/// Write the help text listing all available commands.
pub fn print_help(out: &mut impl Write) {
    let entries = [
        ("/help", "Show this help message"),
        ("/clear", "Clear the screen"),
        ("/history", "Reload the conversation from the server"),
        ("/status", "Show session and connection status"),
        ("/exit", "Leave the chat (the session is kept)"),
    ];

    let _ = writeln!(out);
    let _ = writeln!(out, "  {}", style("Available commands:").bold());
    let _ = writeln!(out);
    for (command, description) in entries {
        let _ = writeln!(out, "  {:<10} {}", style(command).cyan(), description);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "  {}", style("Ctrl+D to exit").dim());
    let _ = writeln!(out);
}
