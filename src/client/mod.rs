//! HTTP client for the Khoj chat API.

pub mod http;

pub use http::{bearer_headers, build_http_client, status_to_error};

use futures::stream::BoxStream;
use reqwest::header::RETRY_AFTER;
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::config::KhojConfig;
use crate::error::Result;
use crate::protocol::event_stream;
use crate::types::{ChatEvent, ChatRequest, ConversationSummary, SessionCreated};
use crate::util::{with_timeout, RetryPolicy};

/// Client bound to one server and API key.
#[derive(Debug, Clone)]
pub struct KhojClient {
    config: KhojConfig,
    http: reqwest::Client,
    retry: RetryPolicy,
}

impl KhojClient {
    pub fn new(config: KhojConfig) -> Result<Self> {
        config.validate()?;
        let http = build_http_client(config.request_timeout())?;
        Ok(Self {
            config,
            http,
            retry: RetryPolicy::default(),
        })
    }

    /// Retry policy for listing sessions. Session creation and chat streams
    /// are never retried.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &KhojConfig {
        &self.config
    }

    /// Create a conversation, optionally bound to an agent. Returns its id.
    ///
    /// Sent exactly once: a retried POST could leave duplicate
    /// conversations on the server.
    pub async fn create_session(&self, agent_slug: Option<&str>) -> Result<String> {
        let url = self.config.sessions_url();
        debug!(url = %url, agent = ?agent_slug, "Creating chat session");

        let mut request = self
            .http
            .post(&url)
            .headers(bearer_headers(self.config.api_key.as_deref()))
            .json(&json!({}));
        if let Some(slug) = agent_slug {
            request = request.query(&[("agent_slug", slug)]);
        }
        let created: SessionCreated = with_timeout(self.config.request_timeout(), async move {
            let resp = check_status(request.send().await?).await?;
            decode_json(resp).await
        })
        .await?;

        debug!(conversation_id = %created.conversation_id, "Chat session created");
        Ok(created.conversation_id)
    }

    /// Conversations of the current user, most recent first.
    pub async fn list_sessions(&self) -> Result<Vec<ConversationSummary>> {
        let url = self.config.sessions_url();
        self.retry
            .execute(|| {
                let request = self
                    .http
                    .get(&url)
                    .headers(bearer_headers(self.config.api_key.as_deref()))
                    .query(&[("client", self.config.client.as_str())]);
                with_timeout(self.config.request_timeout(), async move {
                    let resp = check_status(request.send().await?).await?;
                    decode_json(resp).await
                })
            })
            .await
    }

    /// Send a chat query and stream the response as events.
    ///
    /// Non-success statuses fail before any event is produced. Once the
    /// stream starts, transport failures arrive as a final `Err` item.
    pub async fn stream_chat(
        &self,
        request: &ChatRequest,
    ) -> Result<BoxStream<'static, Result<ChatEvent>>> {
        let url = self.config.chat_url();
        debug!(
            url = %url,
            conversation_id = %request.conversation_id,
            query_len = request.q.len(),
            "Sending chat query"
        );

        let send = self
            .http
            .post(&url)
            .headers(bearer_headers(self.config.api_key.as_deref()))
            .json(request)
            .send();
        let resp = with_timeout(self.config.request_timeout(), async move {
            Ok(send.await?)
        })
        .await?;
        let resp = check_status(resp).await?;

        Ok(event_stream(resp.bytes_stream()))
    }

    /// Request for `query` using the configured result count, agent and
    /// location.
    pub fn request_for(&self, query: impl Into<String>, conversation_id: impl Into<String>) -> ChatRequest {
        ChatRequest::builder()
            .q(query)
            .n(self.config.results_count)
            .conversation_id(conversation_id)
            .maybe_agent_slug(self.config.agent.clone())
            .location(self.config.location.clone())
            .build()
    }
}

/// Read the body and parse it. A body of the wrong shape is a
/// serialization error, which is never retried.
async fn decode_json<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let body = resp.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

async fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let retry_after = resp
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = resp.text().await.unwrap_or_default();
    Err(status_to_error(status.as_u16(), &body, retry_after.as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KhojError;
    use crate::types::Location;

    #[test]
    fn request_for_uses_config_defaults() {
        let mut config = KhojConfig::default();
        config.results_count = 7;
        config.agent = Some("research-bot".into());
        config.location = Location {
            city: Some("Porto".into()),
            ..Default::default()
        };
        let client = KhojClient::new(config).unwrap();

        let request = client.request_for("hello", "c-1");
        assert_eq!(request.n, 7);
        assert_eq!(request.agent_slug.as_deref(), Some("research-bot"));
        assert_eq!(request.location.city.as_deref(), Some("Porto"));
        assert!(request.stream);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = KhojClient::new(KhojConfig::default().with_url("ftp://x")).unwrap_err();
        assert!(matches!(err, KhojError::Configuration(_)));
    }
}
