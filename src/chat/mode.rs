//! Chat modes and the slash commands that select them.

use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Conversation mode, selected in the UI or by a leading `/command`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ChatMode {
    #[default]
    Default,
    General,
    Notes,
    Online,
    Image,
    Research,
}

impl ChatMode {
    pub fn command(self) -> &'static str {
        match self {
            Self::Default => "/default",
            Self::General => "/general",
            Self::Notes => "/notes",
            Self::Online => "/online",
            Self::Image => "/image",
            Self::Research => "/research",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Self::Default => "🎯",
            Self::General => "💭",
            Self::Notes => "📝",
            Self::Online => "🌐",
            Self::Image => "🖼️",
            Self::Research => "🔬",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::General => "General",
            Self::Notes => "Notes",
            Self::Online => "Online",
            Self::Image => "Image",
            Self::Research => "Research",
        }
    }

    /// Mode whose command starts `text`, if any.
    pub fn from_command_prefix(text: &str) -> Option<Self> {
        Self::iter().find(|mode| text.starts_with(mode.command()))
    }

    /// Replace a leading command with the mode's emoji for display.
    pub fn decorate(text: &str) -> String {
        match Self::from_command_prefix(text) {
            Some(mode) => text.replacen(mode.command(), mode.emoji(), 1),
            None => text.to_string(),
        }
    }
}

/// A user message in its two forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedMessage {
    /// Shown in the transcript.
    pub display: String,
    /// Sent to the server.
    pub api: String,
}

/// Prepare raw input for sending. An explicit leading command wins over the
/// selected mode. Returns `None` for blank input.
pub fn compose_message(input: &str, selected: Option<ChatMode>) -> Option<ComposedMessage> {
    let message = input.trim();
    if message.is_empty() {
        return None;
    }

    let composed = match (ChatMode::from_command_prefix(message), selected) {
        (Some(_), _) | (None, None) => ComposedMessage {
            display: ChatMode::decorate(message),
            api: message.to_string(),
        },
        (None, Some(mode)) => ComposedMessage {
            display: format!("{} {message}", mode.emoji()),
            api: format!("{} {message}", mode.command()),
        },
    };
    Some(composed)
}

/// Query text sent as `q`: the mode command, the query, then any open-files
/// context.
pub fn final_query(query: &str, files_context: &str) -> String {
    match ChatMode::from_command_prefix(query) {
        Some(mode) => {
            let rest = query[mode.command().len()..].trim();
            format!("{} {rest}{files_context}", mode.command())
        }
        None => format!("{query}{files_context}"),
    }
}
