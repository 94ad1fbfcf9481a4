//! Remote news API access.
//!
//! Two read-only JSON endpoints: the ranked top-story ids and one
//! record per item id. No authentication, no retries.

use crate::error::{PipelineError, Result};
use crate::models::{IdentifierList, ItemId, ItemRecord};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// The two calls the pipeline needs from the news service.
#[allow(async_fn_in_trait)]
pub trait StoryApi {
    /// Ranked top-story identifiers, in the service's order.
    async fn top_story_ids(&self) -> Result<IdentifierList>;

    /// One item record. Anything other than a JSON object is an error.
    async fn item(&self, id: ItemId) -> Result<ItemRecord>;
}

/// Settings for the HTTP client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl From<&crate::config::ApiConfig> for ClientConfig {
    fn from(config: &crate::config::ApiConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_seconds: config.timeout_seconds,
        }
    }
}

/// reqwest-backed client for the Hacker News Firebase API.
pub struct HnClient {
    config: ClientConfig,
    http_client: reqwest::Client,
}

impl HnClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("hnpulse/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PipelineError::network(&config.base_url, e))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn top_stories_url(&self) -> String {
        format!("{}/topstories.json", self.config.base_url)
    }

    pub fn item_url(&self, id: ItemId) -> String {
        format!("{}/item/{}.json", self.config.base_url, id)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET {}", url);

        let response = self.http_client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                PipelineError::network(
                    url,
                    format!("timed out after {}s", self.config.timeout_seconds),
                )
            } else {
                PipelineError::network(url, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::network(url, format!("HTTP {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| PipelineError::network(url, e))?;

        serde_json::from_slice(&body).map_err(|e| PipelineError::decode(url, e))
    }
}

impl StoryApi for HnClient {
    async fn top_story_ids(&self) -> Result<IdentifierList> {
        self.get_json(&self.top_stories_url()).await
    }

    async fn item(&self, id: ItemId) -> Result<ItemRecord> {
        let value: Value = self.get_json(&self.item_url(id)).await?;
        into_record(id, value)
    }
}

/// Accept only JSON objects as item records.
pub(crate) fn into_record(id: ItemId, value: Value) -> Result<ItemRecord> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(PipelineError::UnexpectedPayload {
            id,
            found: describe(&other).to_string(),
        }),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(base_url: &str) -> HnClient {
        HnClient::new(ClientConfig {
            base_url: base_url.to_string(),
            timeout_seconds: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_urls() {
        let client = client("https://hacker-news.firebaseio.com/v0");
        assert_eq!(
            client.top_stories_url(),
            "https://hacker-news.firebaseio.com/v0/topstories.json"
        );
        assert_eq!(
            client.item_url(8863),
            "https://hacker-news.firebaseio.com/v0/item/8863.json"
        );
    }

    #[test]
    fn test_client_config_trims_trailing_slash() {
        let api = crate::config::ApiConfig {
            base_url: "http://localhost:9000/v0/".to_string(),
            timeout_seconds: 3,
        };
        let config = ClientConfig::from(&api);
        assert_eq!(config.base_url, "http://localhost:9000/v0");
    }

    #[test]
    fn test_into_record_rejects_non_objects() {
        assert!(into_record(1, json!({"id": 1})).is_ok());

        let err = into_record(2, Value::Null).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UnexpectedPayload { id: 2, ref found } if found == "null"
        ));

        assert!(into_record(3, json!([1, 2])).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        // Port 9 on loopback (discard) is expected to refuse connections.
        let client = client("http://127.0.0.1:9");
        let err = client.top_story_ids().await.unwrap_err();
        assert!(matches!(err, PipelineError::Network { .. }));
    }
}
