//! Per-turn response state.
//!
//! One [`ResponseAccumulator`] holds the assistant message being streamed.
//! Events mutate it in place; it is the single source of truth for what is
//! currently displayed. Text deltas append to `raw_text`, while a structured
//! `response` snapshot replaces it wholesale. Assets accumulate separately
//! and are shown after the text.

pub mod assets;

pub use assets::{AssetFragment, AssetKind, GeneratedAssets};

use chrono::{DateTime, Utc};
use strum::Display;
use tracing::{debug, warn};

use crate::types::{AssetPayload, ChatEvent, MessagePayload, References};

/// Lifecycle phase of the accumulator.
///
/// Finalization is not a resting state: on `end_response` the accumulator
/// hands back a [`FinalizedTurn`] and returns to `Idle` in the same call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TurnPhase {
    Idle,
    Streaming,
}

/// Effect of applying one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// Nothing displayable changed.
    Ignored,
    /// Displayable state changed; re-project.
    Updated,
    /// The turn ended. The accumulator has already been reset.
    Finalized(FinalizedTurn),
}

/// Snapshot of a completed turn, used for finalization side effects.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedTurn {
    pub raw_text: String,
    pub generated_assets_text: String,
    pub references: References,
    pub turn_id: Option<String>,
    pub is_voice_reply: bool,
    pub raw_query: String,
    pub completed_at: DateTime<Utc>,
}

/// Mutable in-progress assistant message.
#[derive(Debug, Clone)]
pub struct ResponseAccumulator {
    phase: TurnPhase,
    raw_text: String,
    assets: GeneratedAssets,
    references: References,
    turn_id: Option<String>,
    is_voice_reply: bool,
    status: Option<String>,
    raw_query: String,
    interrupted: bool,
    server_url: String,
}

impl ResponseAccumulator {
    /// `server_url` is shown to the user for content this client cannot
    /// draw itself.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            phase: TurnPhase::Idle,
            raw_text: String::new(),
            assets: GeneratedAssets::default(),
            references: References::default(),
            turn_id: None,
            is_voice_reply: false,
            status: None,
            raw_query: String::new(),
            interrupted: false,
            server_url: server_url.into(),
        }
    }

    /// Start a turn for `query`.
    ///
    /// Callers must not submit a new query while a turn is streaming. If
    /// they do, the unfinished turn is dropped.
    pub fn begin(&mut self, query: impl Into<String>, is_voice_reply: bool) {
        if self.phase == TurnPhase::Streaming {
            warn!(
                turn_id = ?self.turn_id,
                len = self.raw_text.len(),
                "New turn started while previous turn was still streaming"
            );
        }
        self.clear_turn();
        self.raw_query = query.into();
        self.is_voice_reply = is_voice_reply;
        self.phase = TurnPhase::Streaming;
    }

    /// Apply one event. Events outside a streaming turn are dropped.
    pub fn apply(&mut self, event: ChatEvent) -> Applied {
        if self.phase != TurnPhase::Streaming {
            debug!(kind = ?event.kind(), "Dropping event received outside of a turn");
            return Applied::Ignored;
        }

        match event {
            ChatEvent::Status(text) => {
                self.status = Some(text);
                Applied::Updated
            }
            ChatEvent::GeneratedAssets(payload) => self.merge_assets(&payload),
            ChatEvent::Message(MessagePayload::Text(delta)) => {
                if delta.is_empty() {
                    return Applied::Ignored;
                }
                self.status = None;
                self.raw_text.push_str(&delta);
                Applied::Updated
            }
            ChatEvent::Message(MessagePayload::Structured(payload)) => self.apply_structured(payload),
            ChatEvent::References(references) => {
                if !self.references.is_empty() {
                    debug!("Replacing references received earlier in this turn");
                }
                self.references = references;
                Applied::Ignored
            }
            ChatEvent::Metadata(metadata) => {
                if let Some(turn_id) = metadata.turn_id {
                    self.turn_id = Some(turn_id);
                }
                Applied::Ignored
            }
            ChatEvent::EndResponse => Applied::Finalized(self.finalize()),
            ChatEvent::StartLlmResponse | ChatEvent::EndLlmResponse | ChatEvent::Empty => {
                Applied::Ignored
            }
            ChatEvent::Unknown { kind, .. } => {
                debug!(kind = %kind, "Ignoring unknown event");
                Applied::Ignored
            }
        }
    }

    fn apply_structured(&mut self, payload: AssetPayload) -> Applied {
        if payload.has_assets() {
            return self.merge_assets(&payload);
        }
        match payload.response {
            Some(response) => {
                self.status = None;
                self.raw_text = response;
                Applied::Updated
            }
            None => {
                debug!(fields = ?payload.extra.keys().collect::<Vec<_>>(), "Structured message without content");
                Applied::Ignored
            }
        }
    }

    fn merge_assets(&mut self, payload: &AssetPayload) -> Applied {
        if self.assets.merge(payload, &self.server_url) {
            self.status = None;
            Applied::Updated
        } else {
            Applied::Ignored
        }
    }

    fn finalize(&mut self) -> FinalizedTurn {
        let turn = FinalizedTurn {
            raw_text: std::mem::take(&mut self.raw_text),
            generated_assets_text: self.assets.text(),
            references: std::mem::take(&mut self.references),
            turn_id: self.turn_id.take(),
            is_voice_reply: self.is_voice_reply,
            raw_query: self.raw_query.clone(),
            completed_at: Utc::now(),
        };
        self.clear_turn();
        self.phase = TurnPhase::Idle;
        turn
    }

    /// Mark the turn as cut short by the transport. Displayed content is
    /// kept but is not guaranteed complete, and no finalization happens.
    pub fn interrupt(&mut self) {
        if self.phase == TurnPhase::Streaming {
            self.interrupted = true;
            self.status = None;
            self.phase = TurnPhase::Idle;
        }
    }

    fn clear_turn(&mut self) {
        self.raw_text.clear();
        self.assets.clear();
        self.references = References::default();
        self.turn_id = None;
        self.is_voice_reply = false;
        self.status = None;
        self.interrupted = false;
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn is_streaming(&self) -> bool {
        self.phase == TurnPhase::Streaming
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn assets(&self) -> &GeneratedAssets {
        &self.assets
    }

    pub fn generated_assets_text(&self) -> String {
        self.assets.text()
    }

    /// Text to display: accumulated response followed by generated assets.
    pub fn display_text(&self) -> String {
        let mut text = self.raw_text.clone();
        text.push_str(&self.assets.text());
        text
    }

    pub fn references(&self) -> &References {
        &self.references
    }

    pub fn turn_id(&self) -> Option<&str> {
        self.turn_id.as_deref()
    }

    pub fn is_voice_reply(&self) -> bool {
        self.is_voice_reply
    }

    /// Transient progress text, cleared by the next content update.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Query of the current or most recent turn, kept after finalization so
    /// it can be resent.
    pub fn last_query(&self) -> &str {
        &self.raw_query
    }
}
