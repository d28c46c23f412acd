//! Welcome banner display for chat sessions.

use std::io::Write;

use console::style;

use shopchat_types::chat::StoredSession;

/// Print the banner once the session is attached.
///
/// `resumed` distinguishes a restored conversation from a fresh one.
pub fn print_welcome_banner(out: &mut impl Write, session: &StoredSession, server: &str, resumed: bool) {
    let heading = if resumed {
        "Welcome back to support chat"
    } else {
        "Support chat started"
    };
    let short_key: String = session.session_key.chars().take(8).collect();

    let _ = writeln!(out);
    let _ = writeln!(out, "  {}", style(heading).cyan().bold());
    let _ = writeln!(
        out,
        "  {}",
        style(format!("{} <{}>", session.name, session.email)).dim()
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "  {}  {}", style("Server:").bold(), style(server).dim());
    let _ = writeln!(
        out,
        "  {} {}",
        style("Session:").bold(),
        style(short_key).dim()
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "  {}", style("Type /help for commands, Ctrl+D to exit").dim());
    let _ = writeln!(out, "  {}", style("---").dim());
    let _ = writeln!(out);
}
