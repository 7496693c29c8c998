//! Projection of accumulator state into displayable content.
//!
//! Markdown rendering and mounting are external collaborators, reached
//! through [`MarkdownRenderer`] and [`MessageView`]. The projector derives the
//! content kind afresh on every call so partial states always render.

pub mod markdown;

pub use markdown::{collapse_edit_directives, EscapingRenderer};

use strum::Display;

use crate::accumulator::{FinalizedTurn, ResponseAccumulator};
use crate::edit::PatchReport;

/// Black-box markdown to sanitized HTML conversion.
pub trait MarkdownRenderer: Send + Sync {
    fn render_markdown(&self, markdown: &str) -> String;
}

/// Where rendered messages end up.
pub trait MessageView {
    /// Replace the in-progress message with `message`.
    fn mount_message(&mut self, message: &RenderedMessage);

    /// Show an inline error in place of, or after, the response.
    fn show_error(&mut self, message: &str);

    /// Attach references and turn id once the response is complete.
    fn finalize_message(&mut self, turn: &FinalizedTurn);

    /// Per-file outcome of applying edit directives.
    fn show_patch_reports(&mut self, _reports: &[PatchReport]) {}
}

/// Which kind of content currently dominates the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ContentKind {
    Image,
    Diagram,
    Markdown,
}

impl ContentKind {
    /// Images take precedence over diagrams, diagrams over plain text.
    pub fn of(accumulator: &ResponseAccumulator) -> Self {
        let assets = accumulator.assets();
        if assets.has_image() {
            Self::Image
        } else if assets.has_diagram() {
            Self::Diagram
        } else {
            Self::Markdown
        }
    }
}

/// Output of one projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub kind: ContentKind,
    /// Markdown source that was rendered.
    pub markdown: String,
    pub html: String,
    /// Transient progress text, shown alongside the message.
    pub status: Option<String>,
    /// The stream was cut short; content may be incomplete.
    pub interrupted: bool,
}

/// Turns accumulator state into a [`RenderedMessage`].
pub struct RenderProjector<R> {
    renderer: R,
    collapse_edits: bool,
}

impl<R: MarkdownRenderer> RenderProjector<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            collapse_edits: true,
        }
    }

    /// Show edit directives verbatim instead of folding them.
    pub fn with_raw_edit_directives(mut self) -> Self {
        self.collapse_edits = false;
        self
    }

    pub fn project(&self, accumulator: &ResponseAccumulator) -> RenderedMessage {
        let kind = ContentKind::of(accumulator);
        let markdown = accumulator.display_text();
        let html = if self.collapse_edits {
            self.renderer.render_markdown(&collapse_edit_directives(&markdown))
        } else {
            self.renderer.render_markdown(&markdown)
        };

        RenderedMessage {
            kind,
            markdown,
            html,
            status: accumulator.status().map(str::to_string),
            interrupted: accumulator.is_interrupted(),
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AssetPayload, ChatEvent, MessagePayload};

    struct Identity;

    impl MarkdownRenderer for Identity {
        fn render_markdown(&self, markdown: &str) -> String {
            markdown.to_string()
        }
    }

    fn streaming() -> ResponseAccumulator {
        let mut acc = ResponseAccumulator::new("https://app.khoj.dev");
        acc.begin("q", false);
        acc
    }

    fn structured(payload: AssetPayload) -> ChatEvent {
        ChatEvent::Message(MessagePayload::Structured(payload))
    }

    #[test]
    fn plain_text_is_markdown() {
        let mut acc = streaming();
        acc.apply(ChatEvent::text("**bold**"));
        let rendered = RenderProjector::new(Identity).project(&acc);
        assert_eq!(rendered.kind, ContentKind::Markdown);
        assert_eq!(rendered.html, "**bold**");
    }

    #[test]
    fn image_wins_over_diagram_and_text() {
        let mut acc = streaming();
        acc.apply(ChatEvent::text("text"));
        acc.apply(structured(AssetPayload {
            mermaidjs_diagram: Some("graph LR; a-->b".into()),
            ..Default::default()
        }));
        let projector = RenderProjector::new(Identity);
        assert_eq!(projector.project(&acc).kind, ContentKind::Diagram);

        acc.apply(ChatEvent::GeneratedAssets(AssetPayload {
            images: Some(vec!["https://x/i.png".into()]),
            ..Default::default()
        }));
        assert_eq!(projector.project(&acc).kind, ContentKind::Image);
    }

    #[test]
    fn diagram_renders_as_mermaid_fence() {
        let mut acc = streaming();
        acc.apply(structured(AssetPayload {
            mermaidjs_diagram: Some("graph LR; a-->b".into()),
            ..Default::default()
        }));
        let rendered = RenderProjector::new(Identity).project(&acc);
        assert_eq!(rendered.markdown, "```mermaid\ngraph LR; a-->b\n```");
    }

    #[test]
    fn status_and_interruption_are_projected() {
        let mut acc = streaming();
        acc.apply(ChatEvent::Status("Reading notes".into()));
        let projector = RenderProjector::new(Identity);
        assert_eq!(projector.project(&acc).status.as_deref(), Some("Reading notes"));

        acc.apply(ChatEvent::text("half"));
        acc.interrupt();
        let rendered = projector.project(&acc);
        assert!(rendered.interrupted);
        assert_eq!(rendered.status, None);
    }
}
