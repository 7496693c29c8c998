//! Terminal rendering of a streaming message.

use std::io::Write;

use crate::accumulator::FinalizedTurn;
use crate::edit::{PatchReport, PatchStatus};
use crate::render::{MarkdownRenderer, MessageView, RenderedMessage};

/// The terminal shows markdown source as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughRenderer;

impl MarkdownRenderer for PassthroughRenderer {
    fn render_markdown(&self, markdown: &str) -> String {
        markdown.to_string()
    }
}

/// Prints only what changed since the last mount. Status lines and errors
/// go to stderr so stdout carries the answer alone.
#[derive(Debug, Default)]
pub struct TerminalView {
    printed: String,
    status: Option<String>,
}

impl TerminalView {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Text to print to move the terminal from `printed` to `current`. A
/// snapshot that does not extend what is shown is reprinted in full.
pub(crate) fn delta<'a>(printed: &str, current: &'a str) -> (bool, &'a str) {
    match current.strip_prefix(printed) {
        Some(suffix) => (false, suffix),
        None => (true, current),
    }
}

impl MessageView for TerminalView {
    fn mount_message(&mut self, message: &RenderedMessage) {
        if message.status != self.status {
            if let Some(status) = &message.status {
                eprintln!("… {status}");
            }
            self.status = message.status.clone();
        }

        let (restart, text) = delta(&self.printed, &message.markdown);
        let mut stdout = std::io::stdout().lock();
        if restart && !self.printed.is_empty() {
            let _ = writeln!(stdout, "\n---");
        }
        let _ = write!(stdout, "{text}");
        let _ = stdout.flush();
        self.printed = message.markdown.clone();
    }

    fn show_error(&mut self, message: &str) {
        eprintln!("\n❌ {message}");
    }

    fn finalize_message(&mut self, turn: &FinalizedTurn) {
        println!();
        if !turn.references.is_empty() {
            eprintln!("📚 {}", turn.references.label());
        }
        if let Some(turn_id) = &turn.turn_id {
            tracing::debug!(turn_id = %turn_id, "Turn complete");
        }
    }

    fn show_patch_reports(&mut self, reports: &[PatchReport]) {
        for report in reports {
            let path = report.path.display();
            match &report.status {
                PatchStatus::Applied { edits } => eprintln!("✅ {path}: {edits} edit(s) applied"),
                PatchStatus::Unchanged => eprintln!("➖ {path}: unchanged"),
                PatchStatus::Failed(message) => eprintln!("❌ {path}: {message}"),
            }
        }
    }
}
