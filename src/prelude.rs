//! Convenience re-exports for common use.

pub use crate::accumulator::{Applied, FinalizedTurn, ResponseAccumulator, TurnPhase};
pub use crate::chat::{compose_message, ChatMode, FileAccessMode, OpenFile};
pub use crate::client::KhojClient;
pub use crate::config::KhojConfig;
pub use crate::edit::{extract_edit_blocks, EditBlock, FilePatcher, FsPatcher, PatchReport};
pub use crate::error::{KhojError, Result};
pub use crate::protocol::{classify, event_stream, FrameDecoder};
pub use crate::render::{MarkdownRenderer, MessageView, RenderProjector, RenderedMessage};
pub use crate::session::{SpeechSynthesizer, TurnDriver, TurnOutcome};
pub use crate::types::{ChatEvent, ChatRequest, MessagePayload, References};
