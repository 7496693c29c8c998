//! One chat turn, end to end.
//!
//! [`TurnDriver`] owns the accumulator and feeds it events from the
//! transport, re-projecting after every displayable change. When the turn
//! ends it runs the finalization side effects: attaching references and the
//! turn id, speaking voice replies, and applying edit directives when the
//! user has granted write access. Interrupted turns (transport error,
//! cancellation, truncated stream) keep their partial content and skip all
//! of that.

use std::sync::Arc;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::accumulator::{Applied, FinalizedTurn, ResponseAccumulator};
use crate::chat::{final_query, open_files_context, FileAccessMode, OpenFile};
use crate::client::KhojClient;
use crate::edit::{extract_edit_blocks, EditBlock, FilePatcher, PatchReport};
use crate::error::{KhojError, Result};
use crate::render::{MarkdownRenderer, MessageView, RenderProjector};
use crate::types::{ChatEvent, ChatRequest};

/// Text-to-speech collaborator for voice replies.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn speak(&self, text: &str) -> Result<()>;
}

/// A query ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnInput {
    /// Query as the user typed it, kept for resending.
    pub raw_query: String,
    pub request: ChatRequest,
    pub is_voice: bool,
}

/// A turn that reached `end_response`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedTurn {
    pub turn: FinalizedTurn,
    /// Directives found in the response. Empty unless write access is on.
    pub edit_blocks: Vec<EditBlock>,
    pub patch_reports: Vec<PatchReport>,
}

#[derive(Debug)]
pub enum TurnOutcome {
    Completed(CompletedTurn),
    /// The turn ended early. `error` is `None` when the stream simply
    /// stopped after some content without `end_response`.
    Interrupted { error: Option<KhojError> },
}

impl TurnOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

pub struct TurnDriver<R> {
    accumulator: ResponseAccumulator,
    projector: RenderProjector<R>,
    speech: Option<Arc<dyn SpeechSynthesizer>>,
    patcher: Option<Arc<dyn FilePatcher>>,
    file_access: FileAccessMode,
    voice_entitled: bool,
}

impl<R: MarkdownRenderer> TurnDriver<R> {
    pub fn new(server_url: impl Into<String>, renderer: R) -> Self {
        Self {
            accumulator: ResponseAccumulator::new(server_url),
            projector: RenderProjector::new(renderer),
            speech: None,
            patcher: None,
            file_access: FileAccessMode::None,
            voice_entitled: false,
        }
    }

    pub fn with_projector(mut self, projector: RenderProjector<R>) -> Self {
        self.projector = projector;
        self
    }

    /// Speak voice replies. Only users entitled to speech get them.
    pub fn with_speech(mut self, speech: Arc<dyn SpeechSynthesizer>, entitled: bool) -> Self {
        self.speech = Some(speech);
        self.voice_entitled = entitled;
        self
    }

    pub fn with_patcher(mut self, patcher: Arc<dyn FilePatcher>) -> Self {
        self.patcher = Some(patcher);
        self
    }

    pub fn with_file_access(mut self, mode: FileAccessMode) -> Self {
        self.file_access = mode;
        self
    }

    pub fn accumulator(&self) -> &ResponseAccumulator {
        &self.accumulator
    }

    /// Build the request for `raw_query`, appending open files according to
    /// the current access mode.
    pub fn prepare(
        &self,
        client: &KhojClient,
        raw_query: &str,
        conversation_id: &str,
        open_files: &[OpenFile],
        is_voice: bool,
    ) -> TurnInput {
        let context = open_files_context(open_files, self.file_access);
        TurnInput {
            raw_query: raw_query.to_string(),
            request: client.request_for(final_query(raw_query, &context), conversation_id),
            is_voice,
        }
    }

    /// Send `input` and drive the response to completion.
    pub async fn send<V>(
        &mut self,
        client: &KhojClient,
        input: TurnInput,
        view: &mut V,
        cancel: &CancellationToken,
    ) -> TurnOutcome
    where
        V: MessageView + ?Sized,
    {
        let events = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(KhojError::Cancelled),
            result = client.stream_chat(&input.request) => result,
        };

        match events {
            Ok(events) => self.run_turn(input.raw_query, input.is_voice, events, view, cancel).await,
            Err(err) => {
                self.accumulator.begin(input.raw_query, input.is_voice);
                self.fail(err, view)
            }
        }
    }

    /// Drive one turn from an already-open event stream.
    pub async fn run_turn<S, V>(
        &mut self,
        query: impl Into<String>,
        is_voice: bool,
        events: S,
        view: &mut V,
        cancel: &CancellationToken,
    ) -> TurnOutcome
    where
        S: Stream<Item = Result<ChatEvent>>,
        V: MessageView + ?Sized,
    {
        futures::pin_mut!(events);
        self.accumulator.begin(query, is_voice);
        let mut received = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(received, "Turn cancelled");
                    self.accumulator.interrupt();
                    view.mount_message(&self.projector.project(&self.accumulator));
                    return TurnOutcome::Interrupted { error: Some(KhojError::Cancelled) };
                }
                next = events.next() => next,
            };

            match next {
                Some(Ok(event)) => {
                    received += 1;
                    match self.accumulator.apply(event) {
                        Applied::Ignored => {}
                        Applied::Updated => {
                            view.mount_message(&self.projector.project(&self.accumulator));
                        }
                        Applied::Finalized(turn) => {
                            return TurnOutcome::Completed(self.finalize(turn, view).await);
                        }
                    }
                }
                Some(Err(err)) => return self.fail(err, view),
                None if received == 0 => {
                    return self.fail(KhojError::Stream("empty response body".into()), view);
                }
                None => {
                    warn!(received, "Chat stream ended without end_response");
                    self.accumulator.interrupt();
                    view.mount_message(&self.projector.project(&self.accumulator));
                    return TurnOutcome::Interrupted { error: None };
                }
            }
        }
    }

    fn fail<V>(&mut self, err: KhojError, view: &mut V) -> TurnOutcome
    where
        V: MessageView + ?Sized,
    {
        warn!(error = %err, category = ?err.category(), "Chat turn failed");
        self.accumulator.interrupt();
        view.mount_message(&self.projector.project(&self.accumulator));
        if !matches!(err, KhojError::Cancelled) {
            view.show_error(&err.display_message());
        }
        TurnOutcome::Interrupted { error: Some(err) }
    }

    async fn finalize<V>(&self, turn: FinalizedTurn, view: &mut V) -> CompletedTurn
    where
        V: MessageView + ?Sized,
    {
        view.finalize_message(&turn);

        if turn.is_voice_reply && self.voice_entitled {
            if let Some(speech) = &self.speech {
                if let Err(e) = speech.speak(&turn.raw_text).await {
                    warn!(error = %e, "Speech synthesis failed");
                }
            }
        }

        let edit_blocks = if self.file_access.can_write() {
            extract_edit_blocks(&turn.raw_text)
        } else {
            Vec::new()
        };

        let patch_reports = match (&self.patcher, edit_blocks.is_empty()) {
            (Some(patcher), false) => {
                let reports = patcher.apply(&edit_blocks).await;
                info!(
                    blocks = edit_blocks.len(),
                    files = reports.len(),
                    applied = reports.iter().filter(|r| r.is_applied()).count(),
                    "Applied edit directives"
                );
                view.show_patch_reports(&reports);
                reports
            }
            _ => Vec::new(),
        };

        CompletedTurn {
            turn,
            edit_blocks,
            patch_reports,
        }
    }
}
