//! khoj-chat CLI binary entry point.

use clap::Parser;
use khoj_chat::cli::commands::{handle_chat, handle_new_session, handle_sessions};
use khoj_chat::cli::{recovery_hint, Cli, Commands};
use khoj_chat::error::KhojError;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Chat(args) => handle_chat(cli.url, args).await,
        Commands::Sessions => handle_sessions(cli.url).await,
        Commands::NewSession(args) => handle_new_session(cli.url, args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        if let Some(hint) = e.downcast_ref::<KhojError>().and_then(recovery_hint) {
            eprintln!("hint: {hint}");
        }
        std::process::exit(1);
    }
}
