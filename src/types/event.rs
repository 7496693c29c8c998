//! Typed stream events.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

use super::references::References;

/// Wire tag carried in the `type` field of a recognised frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    Status,
    GeneratedAssets,
    StartLlmResponse,
    EndLlmResponse,
    EndResponse,
    References,
    Message,
    Metadata,
}

/// One classified frame of the chat stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// Transient progress text shown in place of the loading indicator.
    Status(String),
    /// Image or diagram payload produced by the backend.
    GeneratedAssets(AssetPayload),
    StartLlmResponse,
    EndLlmResponse,
    /// Terminal event for the turn.
    EndResponse,
    References(References),
    Message(MessagePayload),
    Metadata(TurnMetadata),
    /// A recognised JSON frame whose tag or payload shape is not understood.
    Unknown { kind: String, data: Value },
    /// Empty frame. Carries nothing and is dropped by consumers.
    Empty,
}

impl ChatEvent {
    /// Wire tag of this event, or `None` for empty/unknown frames.
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            Self::Status(_) => Some(EventKind::Status),
            Self::GeneratedAssets(_) => Some(EventKind::GeneratedAssets),
            Self::StartLlmResponse => Some(EventKind::StartLlmResponse),
            Self::EndLlmResponse => Some(EventKind::EndLlmResponse),
            Self::EndResponse => Some(EventKind::EndResponse),
            Self::References(_) => Some(EventKind::References),
            Self::Message(_) => Some(EventKind::Message),
            Self::Metadata(_) => Some(EventKind::Metadata),
            Self::Unknown { .. } | Self::Empty => None,
        }
    }

    /// Shorthand for a plain text delta.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Message(MessagePayload::Text(text.into()))
    }
}

/// Payload of a `message` event.
///
/// Text payloads are deltas. Structured payloads are complete snapshots:
/// either a `response` that replaces the accumulated text, or an asset.
#[derive(Debug, Clone, PartialEq)]
pub enum MessagePayload {
    Text(String),
    Structured(AssetPayload),
}

/// Structured message body: generated images, diagrams, error details or
/// a full response snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inferred_queries: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mermaidjs_diagram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excalidraw_diagram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Fields this client does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AssetPayload {
    /// Build from a JSON object, ignoring fields whose value has an
    /// unexpected type instead of rejecting the whole payload.
    pub fn from_object(object: Map<String, Value>) -> Self {
        let mut payload = Self::default();
        for (key, value) in object {
            match key.as_str() {
                "image" => payload.image = non_empty_string(&value),
                "images" => payload.images = string_list(&value),
                "detail" => payload.detail = non_empty_string(&value),
                "intentType" => payload.intent_type = non_empty_string(&value),
                "inferredQueries" => payload.inferred_queries = string_list(&value),
                "mermaidjsDiagram" => payload.mermaidjs_diagram = non_empty_string(&value),
                "excalidrawDiagram" => payload.excalidraw_diagram = diagram_source(&value),
                "response" => payload.response = non_empty_string(&value),
                _ => {
                    payload.extra.insert(key, value);
                }
            }
        }
        payload
    }

    /// Whether this payload carries anything routed through asset handling.
    pub fn has_assets(&self) -> bool {
        self.image.is_some()
            || self.images.is_some()
            || self.detail.is_some()
            || self.mermaidjs_diagram.is_some()
            || self.excalidraw_diagram.is_some()
    }
}

fn non_empty_string(value: &Value) -> Option<String> {
    value.as_str().filter(|s| !s.is_empty()).map(str::to_string)
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
    )
}

// Excalidraw scenes arrive either as a JSON string or as the raw element list.
fn diagram_source(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
        _ => None,
    }
}

/// Payload of a `metadata` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnMetadata {
    #[serde(rename = "turnId", default, skip_serializing_if = "Option::is_none")]
    pub turn_id: Option<String>,
}
