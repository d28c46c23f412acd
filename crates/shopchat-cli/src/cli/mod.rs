//! CLI command definitions and dispatch for the `shopchat` binary.
//!
//! Uses clap derive macros for argument parsing. `chat` opens the live
//! conversation; `status`, `history` and `forget` operate on the stored
//! session identity without opening the real-time channel.

pub mod chat;
pub mod session;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use indicatif::{ProgressBar, ProgressStyle};

/// Talk to storefront support from the terminal.
#[derive(Parser)]
#[command(name = "shopchat", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Storefront origin, e.g. https://shop.example.com.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Directory holding config.toml and the stored session.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Export spans to stdout via OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default tracing directives for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "warn",
            1 => "info,shopchat=debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the support chat, resuming the stored session when there is one.
    Chat {
        /// Display name for a new session.
        #[arg(long)]
        name: Option<String>,

        /// Contact email for a new session.
        #[arg(long)]
        email: Option<String>,
    },

    /// Show the stored session and whether support still has it open.
    Status,

    /// Print the conversation history of the stored session.
    History,

    /// Discard the stored session so the next chat starts fresh.
    Forget,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Steady-ticking spinner shown while waiting on the storefront.
pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat_with_identity() {
        let cli = Cli::try_parse_from([
            "shopchat",
            "chat",
            "--name",
            "Ann",
            "--email",
            "ann@example.com",
        ])
        .unwrap();

        match cli.command {
            Commands::Chat { name, email } => {
                assert_eq!(name.as_deref(), Some("Ann"));
                assert_eq!(email.as_deref(), Some("ann@example.com"));
            }
            _ => panic!("expected chat command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "shopchat",
            "status",
            "--json",
            "--base-url",
            "https://shop.example.com",
            "-vv",
        ])
        .unwrap();

        assert!(cli.json);
        assert_eq!(cli.base_url.as_deref(), Some("https://shop.example.com"));
        assert_eq!(cli.log_filter(), "trace");
    }

    #[test]
    fn test_log_filter_levels() {
        let quiet = Cli::try_parse_from(["shopchat", "--quiet", "forget"]).unwrap();
        assert_eq!(quiet.log_filter(), "error");

        let default = Cli::try_parse_from(["shopchat", "history"]).unwrap();
        assert_eq!(default.log_filter(), "warn");

        let verbose = Cli::try_parse_from(["shopchat", "-v", "history"]).unwrap();
        assert_eq!(verbose.log_filter(), "info,shopchat=debug");
    }

    #[test]
    fn test_completions_requires_shell() {
        assert!(Cli::try_parse_from(["shopchat", "completions"]).is_err());
        assert!(Cli::try_parse_from(["shopchat", "completions", "zsh"]).is_ok());
    }
}
