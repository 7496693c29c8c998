//! Splicing edit blocks into document content.

use std::sync::OnceLock;

use regex::Regex;
use strum::{Display, EnumString};
use tracing::{debug, warn};

use super::EditBlock;

/// How a matched span is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum EditStyle {
    /// Write the replacement as is.
    #[default]
    Direct,
    /// Keep removed text wrapped in `~~` and mark added text with `==`, for
    /// review before [`accept_preview`].
    Preview,
}

/// A block located in the original content. Offsets are byte offsets into
/// that content, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedEdit {
    pub block_index: usize,
    pub start: usize,
    pub end: usize,
}

/// Result of [`apply_edits`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub content: String,
    /// Number of blocks spliced in.
    pub applied: usize,
    /// Indices of blocks that were not found or overlapped another edit.
    pub unmatched: Vec<usize>,
}

impl EditOutcome {
    pub fn changed(&self) -> bool {
        self.applied > 0
    }
}

/// Locate every block in `content`. All spans refer to the original
/// content; blocks whose anchors are not found are left out.
pub fn plan_edits(content: &str, blocks: &[EditBlock]) -> Vec<PlannedEdit> {
    blocks
        .iter()
        .enumerate()
        .filter_map(|(block_index, block)| {
            let span = locate(content, block);
            if span.is_none() {
                debug!(block_index, before = %block.before, "Edit anchors not found");
            }
            span.map(|(start, end)| PlannedEdit {
                block_index,
                start,
                end,
            })
        })
        .collect()
}

fn locate(content: &str, block: &EditBlock) -> Option<(usize, usize)> {
    let start = if block.anchored_at_start() {
        0
    } else {
        content.find(&block.before_text())?
    };

    let end = if block.anchored_at_end() {
        content.len()
    } else {
        let after = block.after_text();
        start + content[start..].find(&after)? + after.len()
    };

    Some((start, end))
}

/// Apply `blocks` to `content`, last span first so earlier offsets stay
/// valid. A span overlapping one already applied is skipped.
pub fn apply_edits(content: &str, blocks: &[EditBlock], style: EditStyle) -> EditOutcome {
    let mut planned = plan_edits(content, blocks);
    planned.sort_by(|a, b| b.start.cmp(&a.start).then(b.end.cmp(&a.end)));

    let mut applied_indices = Vec::with_capacity(planned.len());
    let mut output = content.to_string();
    let mut floor = content.len();

    for edit in planned {
        if edit.end > floor {
            warn!(
                block_index = edit.block_index,
                start = edit.start,
                end = edit.end,
                "Skipping edit overlapping a later edit"
            );
            continue;
        }

        let original = &content[edit.start..edit.end];
        let replacement = &blocks[edit.block_index].replacement;
        let text = match style {
            EditStyle::Direct => replacement.clone(),
            EditStyle::Preview => preview(original, replacement),
        };
        output.replace_range(edit.start..edit.end, &text);
        floor = edit.start;
        applied_indices.push(edit.block_index);
    }

    let unmatched = (0..blocks.len())
        .filter(|i| !applied_indices.contains(i))
        .collect();

    EditOutcome {
        content: output,
        applied: applied_indices.len(),
        unmatched,
    }
}

/// Common prefix, removed lines in `~~`, added lines in `==`, common suffix.
fn preview(original: &str, replacement: &str) -> String {
    let prefix = common_prefix_len(original, replacement);
    let suffix = common_suffix_len(&original[prefix..], &replacement[prefix..]);

    let removed = &original[prefix..original.len() - suffix];
    let added = &replacement[prefix..replacement.len() - suffix];

    let mut out = String::with_capacity(original.len() + replacement.len() + 8);
    out.push_str(&original[..prefix]);
    out.push_str(&mark_lines(removed, "~~"));
    out.push_str(&mark_lines(added, "=="));
    out.push_str(&original[original.len() - suffix..]);
    out
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, x), y)| x != y)
        .map_or_else(|| a.len().min(b.len()), |((i, _), _)| i)
}

fn common_suffix_len(a: &str, b: &str) -> usize {
    let mut len = 0;
    for (x, y) in a.chars().rev().zip(b.chars().rev()) {
        if x != y {
            break;
        }
        len += x.len_utf8();
    }
    len
}

/// Wrap each non-blank line in `marker`, keeping surrounding whitespace and
/// a list dash outside.
fn mark_lines(text: &str, marker: &str) -> String {
    text.split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let body = line.trim();
            let lead = &line[..line.len() - line.trim_start().len()];
            let trail = &line[line.trim_end().len()..];
            match body.strip_prefix("- ") {
                Some(item) => format!("{lead}- {marker}{item}{marker}{trail}"),
                None => format!("{lead}{marker}{body}{marker}{trail}"),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

static STRUCK: OnceLock<Regex> = OnceLock::new();
static BLANK_RUN: OnceLock<Regex> = OnceLock::new();

/// Resolve a preview: drop `~~removed~~` spans and lines left empty by
/// them, unwrap `==added==` markers, and collapse runs of blank lines.
pub fn accept_preview(text: &str) -> String {
    let struck = STRUCK.get_or_init(|| Regex::new(r"~~[^~]*~~").expect("struck pattern is valid"));
    let blank_run =
        BLANK_RUN.get_or_init(|| Regex::new(r"\n{3,}").expect("blank run pattern is valid"));

    let kept = text
        .split('\n')
        .filter_map(|line| {
            if !struck.is_match(line) {
                return Some(line.to_string());
            }
            let stripped = struck.replace_all(line, "");
            let stripped = stripped.trim();
            match stripped {
                "" | "-" => None,
                _ => Some(stripped.to_string()),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
        .replace("==", "");

    blank_run.replace_all(&kept, "\n\n").into_owned()
}
