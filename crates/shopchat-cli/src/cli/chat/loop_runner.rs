//! Main chat loop orchestration.
//!
//! Resumes the stored session or starts a new one, prints the welcome
//! banner, then reads input until the user leaves or support closes the
//! chat. Leaving keeps the session stored; a support-side closure clears it.

use std::io::Write;

use console::style;
use dialoguer::{Confirm, Input};
use tracing::{info, warn};

use shopchat_core::chat::api::ChatApi;
use shopchat_core::chat::delivery::{Dispatch, RejectReason};
use shopchat_core::session::store::SessionStore;
use shopchat_types::chat::{SessionState, StoredSession};
use shopchat_types::error::ChatError;

use crate::cli::spinner;
use crate::state::{AppState, TerminalClient};

use super::banner::print_welcome_banner;
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};
use super::renderer::TerminalSink;

/// How the input loop ended.
#[derive(Debug, PartialEq)]
enum LoopExit {
    /// Ctrl+D or `/exit`.
    Left,
    /// Support closed the session.
    ClosedBySupport,
}

/// Run the interactive chat loop.
///
/// `name` and `email` seed a new session; missing values are prompted for.
pub async fn run_chat_loop(
    state: &AppState,
    name: Option<String>,
    email: Option<String>,
) -> anyhow::Result<()> {
    let server = state.api.base_url().to_string();
    let mut stdout = std::io::stdout();

    let stored = state.store.load().await.unwrap_or_else(|err| {
        warn!(error = %err, "Could not read stored chat session");
        None
    });
    if let Some(session) = &stored {
        print_welcome_banner(&mut stdout, session, &server, true);
    }

    let mut client = state.chat_client(TerminalSink::stdout());
    let resumed = client.resume().await;

    if !resumed {
        if client.state() == SessionState::Closed {
            println!(
                "  {}",
                style("Your previous chat was closed by support. Starting a new one.").dim()
            );
            client.shutdown().await;
            client = state.chat_client(TerminalSink::stdout());
        }
        let session = start_session(&client, name, email).await?;
        print_welcome_banner(&mut stdout, &session, &server, false);
    }

    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut chat_input, writer) = ChatInput::new(prompt)
        .map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;
    let mut out = writer.clone();
    client
        .surface()
        .with_sink_mut(|sink| sink.set_writer(Box::new(writer)));

    let exit = input_loop(&client, &mut chat_input, &mut out).await;

    match exit {
        LoopExit::ClosedBySupport => {
            let _ = writeln!(out, "\n  {}", style("Support closed this chat. Session ended.").dim());
        }
        LoopExit::Left => {
            let _ = writeln!(
                out,
                "\n  {}",
                style("Session ended. Run `shopchat chat` to pick up where you left off.").dim()
            );
        }
    }
    info!(?exit, "Chat loop finished");

    client.shutdown().await;
    chat_input.finish();
    Ok(())
}

/// Prompt for any missing identity and create the session, offering a retry on failure.
async fn start_session(
    client: &TerminalClient,
    mut name: Option<String>,
    mut email: Option<String>,
) -> anyhow::Result<StoredSession> {
    loop {
        let (session_name, session_email) = prompt_identity(name.take(), email.take())?;

        let spinner = spinner("Connecting to support...");
        let result = client.start(&session_name, &session_email).await;
        spinner.finish_and_clear();

        match result {
            Ok(session) => return Ok(session),
            // The notice is already on screen; ask again.
            Err(ChatError::MissingIdentity) => continue,
            Err(err) => {
                let retry = Confirm::new()
                    .with_prompt("Try again?")
                    .default(true)
                    .interact()?;
                if !retry {
                    return Err(err.into());
                }
                name = Some(session_name);
                email = Some(session_email);
            }
        }
    }
}

fn prompt_identity(
    name: Option<String>,
    email: Option<String>,
) -> anyhow::Result<(String, String)> {
    let name = match name.filter(|n| !n.trim().is_empty()) {
        Some(name) => name,
        None => Input::<String>::new().with_prompt("Your name").interact_text()?,
    };
    let email = match email.filter(|e| !e.trim().is_empty()) {
        Some(email) => email,
        None => Input::<String>::new()
            .with_prompt("Your email")
            .validate_with(|input: &String| -> Result<(), &str> {
                if input.contains('@') {
                    Ok(())
                } else {
                    Err("Enter a valid email address")
                }
            })
            .interact_text()?,
    };
    Ok((name, email))
}

async fn input_loop(
    client: &TerminalClient,
    chat_input: &mut ChatInput,
    out: &mut impl Write,
) -> LoopExit {
    let mut session_state = client.subscribe_state();

    loop {
        tokio::select! {
            _ = session_state.wait_for(|s| *s == SessionState::Closed) => {
                break LoopExit::ClosedBySupport;
            }
            event = chat_input.read_line() => match event {
                InputEvent::Eof => break LoopExit::Left,
                InputEvent::Interrupted => {
                    let _ = writeln!(out, "  {}", style("Press Ctrl+D to exit, or keep chatting.").dim());
                }
                InputEvent::Message(text) => {
                    if text.is_empty() {
                        continue;
                    }

                    if let Some(cmd) = commands::parse(&text) {
                        match cmd {
                            ChatCommand::Help => commands::print_help(out),
                            ChatCommand::Clear => chat_input.clear(),
                            ChatCommand::History => reload_history(client, out).await,
                            ChatCommand::Status => print_status(client, out),
                            ChatCommand::Exit => break LoopExit::Left,
                            ChatCommand::Unknown(other) => {
                                let _ = writeln!(
                                    out,
                                    "  {} Unknown command {}. Type /help for commands.",
                                    style("?").yellow().bold(),
                                    style(other).cyan()
                                );
                            }
                        }
                        continue;
                    }

                    if let Dispatch::Rejected(RejectReason::SessionClosed) = client.send_message(&text).await {
                        let _ = writeln!(out, "  {}", style("This chat has been closed.").dim());
                    }
                }
            }
        }
    }
}

/// Replace the rendered conversation with the server's copy.
async fn reload_history(client: &TerminalClient, out: &mut impl Write) {
    let Some(session) = client.session() else {
        return;
    };
    match client.api().fetch_messages(&session.session_key).await {
        Ok(snapshot) => {
            let messages = snapshot.messages.unwrap_or_default();
            client.surface().replace_all(&messages);
        }
        Err(err) => {
            warn!(error = %err, "Failed to reload chat history");
            let _ = writeln!(out, "  {} Could not load history: {err}", style("!").yellow().bold());
        }
    }
}

fn print_status(client: &TerminalClient, out: &mut impl Write) {
    let key = client
        .session()
        .map(|s| s.session_key)
        .unwrap_or_else(|| "-".to_string());

    let _ = writeln!(out);
    let _ = writeln!(out, "  {} {}", style("Session:").bold(), key);
    let _ = writeln!(out, "  {}   {}", style("State:").bold(), client.state());
    let _ = writeln!(out, "  {} {}", style("Channel:").bold(), client.connection_state());
    let _ = writeln!(out, "  {} {}", style("Reconnects:").bold(), client.reconnects());
    let _ = writeln!(
        out,
        "  {} {}",
        style("Stored:").bold(),
        client.store().path().display()
    );
    let _ = writeln!(out);
}
