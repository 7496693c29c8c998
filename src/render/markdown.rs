//! Markdown helpers applied before handing text to the external renderer.

use std::sync::OnceLock;

use regex::Regex;

use super::MarkdownRenderer;

static EDIT_FENCE: OnceLock<Regex> = OnceLock::new();

fn edit_fence() -> &'static Regex {
    EDIT_FENCE.get_or_init(|| {
        Regex::new(r"(?s)```khoj-edit[^\n\r]*(?:\n|\r\n?)(.*?)```")
            .expect("edit fence pattern is valid")
    })
}

/// Fold every complete edit directive into a collapsed `<details>` block so
/// the raw directive syntax does not dominate the message. Unterminated
/// directives (still streaming) are left as they are.
pub fn collapse_edit_directives(markdown: &str) -> String {
    edit_fence()
        .replace_all(markdown, |caps: &regex::Captures<'_>| {
            format!(
                "<details class=\"khoj-edit-accordion\">\n<summary>Khoj edited file</summary>\n<div class=\"khoj-edit-content\">\n<pre><code class=\"language-khoj-edit\">{}</code></pre>\n</div>\n</details>",
                escape_html(&caps[1])
            )
        })
        .into_owned()
}

/// Minimal escape for text placed inside HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Renderer for hosts without a markdown engine: escapes the text and keeps
/// line breaks.
#[derive(Debug, Clone, Copy, Default)]
pub struct EscapingRenderer;

impl MarkdownRenderer for EscapingRenderer {
    fn render_markdown(&self, markdown: &str) -> String {
        escape_html(markdown).replace('\n', "<br>\n")
    }
}
