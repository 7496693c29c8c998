//! Edit directives embedded in assistant responses.
//!
//! The assistant proposes changes to the user's open notes with fenced
//! blocks:
//!
//! ````text
//! ```khoj-edit
//! "<start words>", "<end words>", "<complete new content>"
//! ```
//! ````
//!
//! [`extract_edit_blocks`] turns them into [`EditBlock`]s, [`apply_edits`]
//! splices them into a document, and [`FilePatcher`] is the seam through
//! which a finished turn hands them to whatever owns the documents.

pub mod apply;
pub mod parser;
pub mod patcher;

pub use apply::{accept_preview, apply_edits, plan_edits, EditOutcome, EditStyle, PlannedEdit};
pub use parser::extract_edit_blocks;
pub use patcher::{FilePatcher, FsPatcher, PatchReport, PatchStatus};

use serde::{Deserialize, Serialize};

/// Marker in `before` anchoring the edit at the start of the document.
pub const FILE_START: &str = "<file-start>";

/// Marker in `after` anchoring the edit at the end of the document.
pub const FILE_END: &str = "<file-end>";

/// One targeted replacement: the span from the first occurrence of `before`
/// through the following occurrence of `after` becomes `replacement`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditBlock {
    /// Note title given after the fence tag (` ```khoj-edit:Title `), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub before: String,
    pub after: String,
    pub replacement: String,
}

impl EditBlock {
    pub fn new(
        before: impl Into<String>,
        after: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            target: None,
            before: before.into(),
            after: after.into(),
            replacement: replacement.into(),
        }
    }

    pub fn anchored_at_start(&self) -> bool {
        self.before.contains(FILE_START)
    }

    pub fn anchored_at_end(&self) -> bool {
        self.after.contains(FILE_END)
    }

    /// `before` with the start-of-document marker removed.
    pub fn before_text(&self) -> String {
        self.before.replacen(FILE_START, "", 1)
    }

    /// `after` with the end-of-document marker removed.
    pub fn after_text(&self) -> String {
        self.after.replacen(FILE_END, "", 1)
    }

    /// Whether this block applies to a document titled `title`. Blocks
    /// without a target apply everywhere.
    pub fn targets(&self, title: &str) -> bool {
        self.target
            .as_deref()
            .map_or(true, |target| target.trim().eq_ignore_ascii_case(title.trim()))
    }
}
