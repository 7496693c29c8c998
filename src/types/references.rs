//! Citation data attached to a finalized response.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Result lists inside each online sub-query that count as references.
const ONLINE_RESULT_KINDS: [&str; 4] = ["organic", "knowledgeGraph", "peopleAlsoAsk", "webpages"];

/// Notes and online search results the backend consulted for a response.
///
/// The wire format uses `context` / `onlineContext`; both spellings are
/// accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct References {
    #[serde(default, alias = "context", skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<NoteReference>>,
    /// Online results keyed by sub-query. Anything other than a JSON
    /// object is dropped so it cannot take the notes down with it.
    #[serde(
        default,
        alias = "onlineContext",
        deserialize_with = "online_object",
        skip_serializing_if = "Option::is_none"
    )]
    pub online: Option<Map<String, Value>>,
}

fn online_object<'de, D>(deserializer: D) -> Result<Option<Map<String, Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Object(map)) => Some(map),
        _ => None,
    })
}

/// One note the response drew on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NoteReference {
    Snippet(String),
    Entry {
        compiled: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file: Option<String>,
    },
    Other(Value),
}

impl NoteReference {
    /// Text of the reference, when it has any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Snippet(text) => Some(text),
            Self::Entry { compiled, .. } => Some(compiled),
            Self::Other(_) => None,
        }
    }
}

impl References {
    pub fn is_empty(&self) -> bool {
        self.notes.as_ref().map_or(true, Vec::is_empty)
            && self.online.as_ref().map_or(true, Map::is_empty)
    }

    /// Number of individual references across notes and online results.
    pub fn count(&self) -> usize {
        let notes = self.notes.as_ref().map_or(0, Vec::len);
        let online = self.online.as_ref().map_or(0, |online| {
            online
                .values()
                .map(|subquery| {
                    ONLINE_RESULT_KINDS
                        .iter()
                        .filter_map(|kind| subquery.get(*kind).and_then(Value::as_array))
                        .map(Vec::len)
                        .sum::<usize>()
                })
                .sum()
        });
        notes + online
    }

    /// Collapsed-section label, e.g. `"1 reference"` or `"3 references"`.
    pub fn label(&self) -> String {
        match self.count() {
            1 => "1 reference".to_string(),
            n => format!("{n} references"),
        }
    }
}
