//! Chat request body.

use bon::Builder;
use serde::{Deserialize, Serialize};

/// JSON body POSTed to the chat endpoint.
///
/// Example:
/// ```
/// use khoj_chat::types::{ChatRequest, Location};
///
/// let request = ChatRequest::builder()
///     .q("/notes what did I plan for Q1?")
///     .conversation_id("c-42")
///     .location(Location { city: Some("Lisbon".into()), ..Default::default() })
///     .build();
/// assert_eq!(request.n, 5);
/// assert!(request.stream);
/// ```
#[derive(Debug, Clone, Builder, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    /// Final composed query, after mode command and file context injection.
    #[builder(into)]
    pub q: String,
    /// Number of note results the backend should retrieve.
    #[builder(default = 5)]
    pub n: u32,
    #[builder(default = true)]
    pub stream: bool,
    #[builder(into)]
    pub conversation_id: String,
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_slug: Option<String>,
    #[builder(default)]
    #[serde(flatten)]
    pub location: Location,
}

/// Coarse user location forwarded with each query. Blank fields are omitted
/// from the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, skip_serializing_if = "is_blank")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub timezone: Option<String>,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Response body of session creation.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionCreated {
    pub conversation_id: String,
}

/// One entry of the conversation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation_id: String,
    /// Server-generated title; absent for new conversations.
    #[serde(default)]
    pub slug: Option<String>,
}

impl ConversationSummary {
    pub fn title(&self) -> &str {
        self.slug
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("New conversation")
    }
}
