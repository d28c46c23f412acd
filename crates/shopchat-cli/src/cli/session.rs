//! Stored-session commands: status, history, forget.
//!
//! These talk to the storefront over HTTP only; the real-time channel is
//! never opened and no background tasks are started.

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use console::style;

use shopchat_core::chat::api::ChatApi;
use shopchat_core::session::store::SessionStore;
use shopchat_types::chat::{ChatMessage, StoredSession};

use crate::cli::chat::renderer::format_message;
use crate::cli::spinner;
use crate::state::AppState;

fn print_no_session(json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::json!({ "session": null }));
    } else {
        println!();
        println!("  {}", style("No stored chat session.").dim());
        println!(
            "  {}",
            style("Run `shopchat chat` to start one.").dim()
        );
        println!();
    }
    Ok(())
}

/// Show the stored identity and whether the server still has the session open.
pub async fn status(state: &AppState, json: bool) -> Result<()> {
    let Some(session) = state.store.load().await? else {
        return print_no_session(json);
    };

    let spinner = (!json).then(|| spinner("Checking session..."));
    let active = state.api.fetch_status(&session.session_key).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if json {
        let status = serde_json::json!({
            "session": session,
            "server": state.api.base_url().as_str(),
            "is_active": active.as_ref().ok(),
            "error": active.as_ref().err().map(|e| e.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let active_cell = match &active {
        Ok(true) => Cell::new("open").fg(Color::Green),
        Ok(false) => Cell::new("closed by support").fg(Color::Yellow),
        Err(err) => Cell::new(format!("unknown ({err})")).fg(Color::Red),
    };

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .add_row(vec![Cell::new("Session"), Cell::new(&session.session_key)])
        .add_row(vec![Cell::new("Name"), Cell::new(&session.name)])
        .add_row(vec![Cell::new("Email"), Cell::new(&session.email)])
        .add_row(vec![Cell::new("Server"), Cell::new(state.api.base_url().as_str())])
        .add_row(vec![Cell::new("Status"), active_cell]);

    println!();
    println!("{table}");
    println!();
    Ok(())
}

/// Print the server-side conversation of the stored session.
pub async fn history(state: &AppState, json: bool) -> Result<()> {
    let Some(session) = state.store.load().await? else {
        return print_no_session(json);
    };

    let spinner = (!json).then(|| spinner("Loading conversation..."));
    let snapshot = state.api.fetch_messages(&session.session_key).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let snapshot = snapshot?;
    let messages = snapshot.messages.unwrap_or_default();

    if json {
        let history = serde_json::json!({
            "session_key": session.session_key,
            "is_active": snapshot.is_active,
            "messages": messages,
        });
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    print_history(&session, &messages, snapshot.is_active);
    Ok(())
}

fn print_history(session: &StoredSession, messages: &[ChatMessage], is_active: Option<bool>) {
    println!();
    println!(
        "  {} {}",
        style("Conversation with support for").bold(),
        style(&session.name).cyan()
    );
    println!();
    if messages.is_empty() {
        println!("  {}", style("No messages yet.").dim());
    }
    for message in messages {
        println!("{}", format_message(message));
    }
    if is_active == Some(false) {
        println!();
        println!("  {}", style("This chat has been closed by support.").yellow());
    }
    println!();
}

/// Discard the stored identity. The server-side session is left alone.
pub async fn forget(state: &AppState, json: bool) -> Result<()> {
    let existing = state.store.load().await?;
    state.store.clear().await?;

    if json {
        let result = serde_json::json!({
            "forgotten": existing.as_ref().map(|s| s.session_key.as_str()),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    match existing {
        Some(session) => println!(
            "\n  {} Forgot session {} for {}.\n",
            style("✓").green().bold(),
            style(&session.session_key).dim(),
            style(&session.name).cyan()
        ),
        None => println!("\n  {}\n", style("No stored chat session.").dim()),
    }
    Ok(())
}
