//! CLI entry point for khoj-chat.

pub mod commands;
pub mod view;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::chat::ChatMode;
use crate::error::{KhojError, RecoverySuggestion};

/// Chat with a Khoj server from the terminal
#[derive(Parser, Debug)]
#[command(name = "khoj-chat", version, about = "Streaming chat client for Khoj")]
pub struct Cli {
    /// Server URL (overrides KHOJ_URL and the config file)
    #[arg(long, global = true)]
    pub url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send one query and stream the answer
    Chat(ChatArgs),
    /// List existing conversations
    Sessions,
    /// Create a conversation and print its id
    NewSession(NewSessionArgs),
}

/// Arguments for the `chat` subcommand.
#[derive(Parser, Debug)]
pub struct ChatArgs {
    /// Chat mode (default, general, notes, online, image, research)
    #[arg(short, long)]
    pub mode: Option<ChatMode>,

    /// Continue an existing conversation instead of creating one
    #[arg(short, long)]
    pub conversation_id: Option<String>,

    /// Agent slug for a new conversation
    #[arg(short, long)]
    pub agent: Option<String>,

    /// Markdown file shared as context and open to edits (repeatable)
    #[arg(short, long = "write", value_name = "FILE")]
    pub write: Vec<PathBuf>,

    /// Markdown file shared read-only as context (repeatable)
    #[arg(short, long = "read", value_name = "FILE")]
    pub read: Vec<PathBuf>,

    /// Mark edits inline and ask before keeping them
    #[arg(long)]
    pub preview: bool,

    /// Query text
    #[arg(required = true, num_args = 1..)]
    pub prompt: Vec<String>,
}

impl ChatArgs {
    pub fn prompt_text(&self) -> String {
        self.prompt.join(" ")
    }
}

/// Arguments for `khoj-chat new-session`.
#[derive(Parser, Debug)]
pub struct NewSessionArgs {
    /// Agent slug to bind the conversation to
    #[arg(short, long)]
    pub agent: Option<String>,
}

/// One-line hint printed under a fatal error.
pub fn recovery_hint(err: &KhojError) -> Option<&'static str> {
    match err.recovery_suggestion() {
        RecoverySuggestion::CheckCredentials => Some("check KHOJ_API_KEY or api_key in ~/.khoj/config.toml"),
        RecoverySuggestion::CheckConfiguration => Some("check --url, KHOJ_URL or ~/.khoj/config.toml"),
        RecoverySuggestion::IncreaseTimeout => Some("raise KHOJ_TIMEOUT_SECS"),
        RecoverySuggestion::RetryWithBackoff => Some("the server may be busy, retry shortly"),
        RecoverySuggestion::CheckFilePermissions => Some("check that the note files exist and are writable"),
        RecoverySuggestion::ContactSupport | RecoverySuggestion::None => None,
    }
}
