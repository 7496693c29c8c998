//! Frame classification into typed events.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::types::{AssetPayload, ChatEvent, EventKind, MessagePayload, References, TurnMetadata};

/// Classify one frame into exactly one event. Never fails.
///
/// - `{"type": "...", "data": ...}` becomes the event named by `type`.
/// - A JSON object without `type` becomes a structured message.
/// - Anything else that is not empty, including JSON-looking text that does
///   not parse, becomes a text message carrying the frame unchanged.
pub fn classify(frame: &str) -> ChatEvent {
    if frame.is_empty() {
        return ChatEvent::Empty;
    }

    if !(frame.starts_with('{') && frame.ends_with('}')) {
        return ChatEvent::text(frame);
    }

    let mut object = match serde_json::from_str::<Value>(frame) {
        Ok(Value::Object(object)) => object,
        Ok(_) => return ChatEvent::text(frame),
        Err(err) => {
            debug!(error = %err, len = frame.len(), "JSON-looking frame did not parse, treating as text");
            return ChatEvent::text(frame);
        }
    };

    match object.remove("type") {
        Some(Value::String(kind)) if !kind.is_empty() => {
            let data = object.remove("data").unwrap_or(Value::Null);
            typed_event(kind, data)
        }
        Some(Value::String(_)) | Some(Value::Null) | None => {
            ChatEvent::Message(MessagePayload::Structured(AssetPayload::from_object(object)))
        }
        Some(other) => {
            warn!(kind = %other, "Frame has a non-string type tag");
            ChatEvent::Unknown {
                kind: other.to_string(),
                data: object.remove("data").unwrap_or(Value::Null),
            }
        }
    }
}

fn typed_event(kind: String, data: Value) -> ChatEvent {
    let Ok(parsed) = kind.parse::<EventKind>() else {
        debug!(kind = %kind, "Unrecognised event type");
        return ChatEvent::Unknown { kind, data };
    };

    match parsed {
        EventKind::Status => ChatEvent::Status(match data {
            Value::String(text) => text,
            Value::Null => String::new(),
            other => other.to_string(),
        }),
        EventKind::GeneratedAssets => match data {
            Value::Object(object) => ChatEvent::GeneratedAssets(AssetPayload::from_object(object)),
            other => mismatched(kind, other),
        },
        EventKind::StartLlmResponse => ChatEvent::StartLlmResponse,
        EventKind::EndLlmResponse => ChatEvent::EndLlmResponse,
        EventKind::EndResponse => ChatEvent::EndResponse,
        EventKind::References => match serde_json::from_value::<References>(data.clone()) {
            Ok(references) => ChatEvent::References(references),
            Err(err) => {
                warn!(error = %err, "Malformed references payload");
                ChatEvent::Unknown { kind, data }
            }
        },
        EventKind::Message => ChatEvent::Message(message_payload(data)),
        EventKind::Metadata => match data {
            Value::Object(object) => ChatEvent::Metadata(TurnMetadata {
                turn_id: object
                    .get("turnId")
                    .and_then(Value::as_str)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string),
            }),
            other => mismatched(kind, other),
        },
    }
}

fn mismatched(kind: String, data: Value) -> ChatEvent {
    warn!(kind = %kind, "Event payload has unexpected shape");
    ChatEvent::Unknown { kind, data }
}

/// Shape the `data` of a `message` event. Strings that hold a JSON object
/// are unpacked into a structured payload.
fn message_payload(data: Value) -> MessagePayload {
    match data {
        Value::String(text) => match parse_embedded_object(&text) {
            Some(object) => MessagePayload::Structured(AssetPayload::from_object(object)),
            None => MessagePayload::Text(text),
        },
        Value::Object(object) => MessagePayload::Structured(AssetPayload::from_object(object)),
        Value::Null => MessagePayload::Text(String::new()),
        other => MessagePayload::Text(other.to_string()),
    }
}

fn parse_embedded_object(text: &str) -> Option<Map<String, Value>> {
    let trimmed = text.trim();
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}
