//! shopchat terminal client entry point.
//!
//! Binary name: `shopchat`
//!
//! Parses CLI arguments, initializes tracing and application state, then
//! dispatches to the chat loop or one of the stored-session commands.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "shopchat", &mut std::io::stdout());
        return Ok(());
    }

    shopchat_observe::tracing_setup::init_tracing(cli.log_filter(), cli.otel)
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    let result = run(cli).await;

    shopchat_observe::tracing_setup::shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let state = AppState::init(cli.data_dir, cli.base_url).await?;

    match cli.command {
        Commands::Chat { name, email } => {
            cli::chat::loop_runner::run_chat_loop(&state, name, email).await?;
        }
        Commands::Status => cli::session::status(&state, cli.json).await?,
        Commands::History => cli::session::history(&state, cli.json).await?,
        Commands::Forget => cli::session::forget(&state, cli.json).await?,
        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}
