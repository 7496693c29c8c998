//! CLI command handlers.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::view::{PassthroughRenderer, TerminalView};
use super::{ChatArgs, NewSessionArgs};
use crate::chat::{compose_message, load_open_files, FileAccessMode};
use crate::client::KhojClient;
use crate::config::KhojConfig;
use crate::edit::{EditStyle, FsPatcher};
use crate::error::KhojError;
use crate::session::{TurnDriver, TurnOutcome};

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn client_for(url: Option<String>, agent: Option<String>) -> Result<KhojClient, KhojError> {
    let mut config = KhojConfig::load()?;
    if let Some(url) = url {
        config = config.with_url(url);
    }
    if agent.is_some() {
        config.agent = agent;
    }
    KhojClient::new(config)
}

/// Handle `khoj-chat chat`.
pub async fn handle_chat(url: Option<String>, args: ChatArgs) -> CliResult {
    let composed = compose_message(&args.prompt_text(), args.mode).ok_or("prompt is empty")?;
    let client = client_for(url, args.agent.clone())?;

    let conversation_id = match &args.conversation_id {
        Some(id) => id.clone(),
        None => {
            let id = client.create_session(client.config().agent.as_deref()).await?;
            eprintln!("💬 conversation {id}");
            id
        }
    };

    let access = if !args.write.is_empty() {
        FileAccessMode::Write
    } else if !args.read.is_empty() {
        FileAccessMode::Read
    } else {
        client.config().file_access
    };
    let shared: Vec<PathBuf> = args.write.iter().chain(&args.read).cloned().collect();
    let open_files = load_open_files(&shared).await;

    let style = if args.preview {
        EditStyle::Preview
    } else {
        EditStyle::Direct
    };
    let patcher = Arc::new(FsPatcher::new(args.write.clone()).with_style(style));
    let mut driver = TurnDriver::new(client.config().url.clone(), PassthroughRenderer)
        .with_file_access(access)
        .with_patcher(patcher.clone());

    let input = driver.prepare(&client, &composed.api, &conversation_id, &open_files, false);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let mut view = TerminalView::new();
    match driver.send(&client, input, &mut view, &cancel).await {
        TurnOutcome::Completed(_) => {
            if style == EditStyle::Preview && !patcher.pending().is_empty() {
                resolve_preview(&patcher).await?;
            }
            Ok(())
        }
        TurnOutcome::Interrupted { error: None } => {
            println!();
            eprintln!("⚠️  response ended early");
            Ok(())
        }
        TurnOutcome::Interrupted {
            error: Some(KhojError::Cancelled),
        } => {
            println!();
            eprintln!("cancelled");
            Ok(())
        }
        TurnOutcome::Interrupted { error: Some(err) } => Err(err.into()),
    }
}

async fn resolve_preview(patcher: &FsPatcher) -> CliResult {
    eprint!("Keep the marked changes? [y/N] ");
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    if matches!(answer.trim(), "y" | "Y" | "yes") {
        let count = patcher.accept().await?;
        eprintln!("✅ kept changes in {count} file(s)");
    } else {
        let count = patcher.revert().await?;
        eprintln!("↩️  restored {count} file(s)");
    }
    Ok(())
}

/// Handle `khoj-chat sessions`.
pub async fn handle_sessions(url: Option<String>) -> CliResult {
    let client = client_for(url, None)?;
    for session in client.list_sessions().await? {
        println!("{}\t{}", session.conversation_id, session.title());
    }
    Ok(())
}

/// Handle `khoj-chat new-session`.
pub async fn handle_new_session(url: Option<String>, args: NewSessionArgs) -> CliResult {
    let client = client_for(url, args.agent)?;
    let id = client.create_session(client.config().agent.as_deref()).await?;
    println!("{id}");
    Ok(())
}
