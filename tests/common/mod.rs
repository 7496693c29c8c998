//! Shared test helpers: recording collaborators and chunked byte streams.

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use khoj_chat::accumulator::FinalizedTurn;
use khoj_chat::edit::{EditBlock, FilePatcher, PatchReport, PatchStatus};
use khoj_chat::error::{KhojError, Result};
use khoj_chat::protocol::DELIMITER;
use khoj_chat::render::{MarkdownRenderer, MessageView, RenderedMessage};
use khoj_chat::session::SpeechSynthesizer;

/// Renders markdown unchanged.
pub struct Identity;

impl MarkdownRenderer for Identity {
    fn render_markdown(&self, markdown: &str) -> String {
        markdown.to_string()
    }
}

/// Records everything the driver shows.
#[derive(Default)]
pub struct RecordingView {
    pub mounted: Vec<RenderedMessage>,
    pub errors: Vec<String>,
    pub finalized: Vec<FinalizedTurn>,
    pub patch_reports: Vec<PatchReport>,
}

impl RecordingView {
    pub fn last_markdown(&self) -> &str {
        self.mounted.last().map(|m| m.markdown.as_str()).unwrap_or("")
    }
}

impl MessageView for RecordingView {
    fn mount_message(&mut self, message: &RenderedMessage) {
        self.mounted.push(message.clone());
    }

    fn show_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    fn finalize_message(&mut self, turn: &FinalizedTurn) {
        self.finalized.push(turn.clone());
    }

    fn show_patch_reports(&mut self, reports: &[PatchReport]) {
        self.patch_reports.extend_from_slice(reports);
    }
}

#[derive(Default)]
pub struct RecordingSpeech {
    pub spoken: Mutex<Vec<String>>,
}

#[async_trait]
impl SpeechSynthesizer for RecordingSpeech {
    async fn speak(&self, text: &str) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Accepts every block for a single virtual file.
#[derive(Default)]
pub struct RecordingPatcher {
    pub received: Mutex<Vec<EditBlock>>,
}

#[async_trait]
impl FilePatcher for RecordingPatcher {
    async fn apply(&self, blocks: &[EditBlock]) -> Vec<PatchReport> {
        self.received.lock().unwrap().extend_from_slice(blocks);
        vec![PatchReport {
            path: "virtual.md".into(),
            status: PatchStatus::Applied {
                edits: blocks.len(),
            },
        }]
    }
}

/// Frames joined by the delimiter, with a trailing delimiter.
pub fn body(frames: &[&str]) -> String {
    frames
        .iter()
        .map(|frame| format!("{frame}{DELIMITER}"))
        .collect()
}

/// `text` split into chunks of `size` bytes, ignoring char boundaries.
pub fn chunked(text: &str, size: usize) -> Vec<Vec<u8>> {
    text.as_bytes().chunks(size).map(<[u8]>::to_vec).collect()
}

/// Byte stream that yields `chunks` and then, optionally, an error.
pub fn byte_stream(
    chunks: Vec<Vec<u8>>,
    fail_with: Option<KhojError>,
) -> BoxStream<'static, std::result::Result<Vec<u8>, KhojError>> {
    let ok = stream::iter(chunks.into_iter().map(Ok));
    let err = stream::iter(fail_with.map(Err));
    ok.chain(err).boxed()
}
