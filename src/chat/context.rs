//! Open-files context appended to queries.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::warn;

/// How much the assistant may see of, and do to, the user's open files.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FileAccessMode {
    #[default]
    None,
    Read,
    Write,
}

impl FileAccessMode {
    pub fn can_read(self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn can_write(self) -> bool {
        matches!(self, Self::Write)
    }

    /// Next mode in the none → read → write cycle of the access toggle.
    pub fn cycle(self) -> Self {
        match self {
            Self::None => Self::Read,
            Self::Read => Self::Write,
            Self::Write => Self::None,
        }
    }
}

/// A markdown document open in the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFile {
    pub title: String,
    pub path: Option<PathBuf>,
    pub content: String,
}

impl OpenFile {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            path: None,
            content: content.into(),
        }
    }
}

/// Read markdown files from disk. Unreadable files are logged and kept
/// with empty content so they still appear in the context.
pub async fn load_open_files(paths: &[PathBuf]) -> Vec<OpenFile> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        if !is_markdown(path) {
            continue;
        }
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read open file");
                String::new()
            }
        };
        files.push(OpenFile {
            title: path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: Some(path.clone()),
            content,
        });
    }
    files
}

fn is_markdown(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "md")
}

const EDIT_INSTRUCTIONS: &str = r#"[EDIT INSTRUCTIONS] You can edit the notes below with targeted modifications. Prefer several small edit blocks over rewriting whole sections.

```khoj-edit
"<start words>", "<end words>", "<complete new content>"
```

Example note:

```
# Meeting Notes
Action items from today:
- Review Q4 metrics
- Schedule follow-up with marketing team about new campaign launch

Next steps:
- Send summary to team
```

Updating one item, identified by its first and last words:
```khoj-edit
"- Schedule follow-up", "campaign launch", "- Schedule follow-up with marketing team by Wednesday about the campaign launch"
```

Inserting content between two headings:
```khoj-edit
"Action items from today:", "Next steps:", "Action items from today:\n- Review Q4 metrics\n\nDiscussion points:\n- Budget review\n\nNext steps:"
```

Rules:
- First argument: a few words from the start of the target text
- Second argument: a few words from the end of the target text
- Third argument: the complete new content for that span
- The words must identify the location unambiguously
- Use <file-start> or <file-end> to anchor at the start or end of a note
- Use \n for line breaks
- Changes apply to the first matching location

[END OF EDIT INSTRUCTIONS]

"#;

/// `[SYSTEM]` block describing the open files. Empty when access is `None`
/// or nothing is open.
pub fn open_files_context(files: &[OpenFile], mode: FileAccessMode) -> String {
    if !mode.can_read() || files.is_empty() {
        return String::new();
    }

    let mut context = String::from(
        "\n\n[SYSTEM]The user is currently working on the following files (content provided for context):\n\n",
    );
    if mode.can_write() {
        context.push_str(EDIT_INSTRUCTIONS);
    }

    context.push_str("[OPEN FILES CONTEXT]\n\n");
    for file in files {
        context.push_str(&format!("# {}\n```markdown\n{}\n```\n\n", file.title, file.content));
    }
    context.push_str("[END OF CURRENT FILES CONTEXT]\n\n");
    context.push_str("[END OF SYSTEM INSTRUCTIONS]\n\n");
    context
}
