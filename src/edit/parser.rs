//! Extraction of edit directives from message text.
//!
//! Grammar (one directive):
//!
//! ```text
//! directive := "```khoj-edit" [ ":" target ] "\n" field "," " "* field "," " "* field "\n" "```"
//! target    := one or more characters other than "\n"
//! field     := '"' ( escape | any character except '"' )* '"'
//! escape    := "\\\"" | "\\n"
//! ```
//!
//! Directives are written by a language model and are not guaranteed to be
//! well formed. Anything that does not match is skipped, never an error.

use std::iter::Peekable;
use std::str::CharIndices;

use tracing::debug;

use super::EditBlock;

const FENCE_OPEN: &str = "```khoj-edit";
const FENCE_CLOSE: &str = "```";

/// All well-formed directives in `text`, in order of appearance.
pub fn extract_edit_blocks(text: &str) -> Vec<EditBlock> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(FENCE_OPEN) {
        let body = &rest[start + FENCE_OPEN.len()..];
        match parse_directive(body) {
            Some((block, consumed)) => {
                blocks.push(block);
                rest = &body[consumed..];
            }
            None => {
                debug!(offset = text.len() - body.len(), "Skipping malformed edit directive");
                rest = body;
            }
        }
    }

    blocks
}

/// Parse a directive body (text right after the opening tag). Returns the
/// block and the number of bytes consumed, including the closing fence.
fn parse_directive(body: &str) -> Option<(EditBlock, usize)> {
    let mut cursor = Cursor::new(body);

    let target = if cursor.eat(':') {
        let target = cursor.take_line();
        if target.is_empty() {
            return None;
        }
        Some(target.to_string())
    } else {
        None
    };

    cursor.expect('\n')?;
    let before = cursor.quoted()?;
    cursor.separator()?;
    let after = cursor.quoted()?;
    cursor.separator()?;
    let replacement = cursor.quoted()?;
    cursor.expect('\n')?;
    cursor.expect_str(FENCE_CLOSE)?;

    Some((
        EditBlock {
            target,
            before,
            after,
            replacement,
        },
        cursor.offset(),
    ))
}

struct Cursor<'a> {
    text: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.char_indices().peekable(),
        }
    }

    fn offset(&mut self) -> usize {
        self.chars.peek().map_or(self.text.len(), |(i, _)| *i)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.chars.peek().map(|(_, c)| *c) == Some(expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Option<()> {
        self.eat(expected).then_some(())
    }

    fn expect_str(&mut self, expected: &str) -> Option<()> {
        expected.chars().try_for_each(|c| self.expect(c))
    }

    fn take_line(&mut self) -> &'a str {
        let start = self.offset();
        while self.chars.next_if(|(_, c)| *c != '\n').is_some() {}
        &self.text[start..self.offset()]
    }

    /// `,` followed by any number of spaces.
    fn separator(&mut self) -> Option<()> {
        self.expect(',')?;
        while self.eat(' ') {}
        Some(())
    }

    /// A double-quoted field with `\"` and `\n` un-escaped.
    fn quoted(&mut self) -> Option<String> {
        self.expect('"')?;
        let mut value = String::new();
        loop {
            let (_, c) = self.chars.next()?;
            match c {
                '"' => return Some(value),
                '\\' => match self.chars.peek().map(|(_, c)| *c) {
                    Some('"') => {
                        self.chars.next();
                        value.push('"');
                    }
                    Some('n') => {
                        self.chars.next();
                        value.push('\n');
                    }
                    _ => value.push('\\'),
                },
                other => value.push(other),
            }
        }
    }
}
