//! Engine client seam and its HTTP implementation

use crate::config::EngineConfig;
use crate::query::SearchRequest;
use crate::status::{is_success, status_name};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Raw engine reply: status plus undecoded body
#[derive(Debug, Clone)]
pub struct EngineResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl EngineResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }
}

/// Trait for search engine clients.
///
/// Implementations only transport: any HTTP status is returned as-is and
/// classified by the caller. Errors are reserved for failures to reach the
/// engine or to read its reply.
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<EngineResponse>;
}

/// Elasticsearch REST client
pub struct HttpSearchClient {
    client: Client,
    base_url: Url,
    config: EngineConfig,
}

impl HttpSearchClient {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let base_url = Url::parse(&config.url)?;
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/{indices}/_search` with index resolution and request-level parameters.
    ///
    /// The index list is one percent-encoded path segment, so `?` or `#` in a
    /// name cannot turn into a query string or fragment.
    pub(crate) fn search_url(&self, request: &SearchRequest) -> Result<Url> {
        if let Some(index) = request.indices.iter().find(|i| !is_valid_index(i)) {
            return Err(Error::InvalidIndex(index.clone()));
        }

        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::Transport(format!("engine URL {} cannot take a path", self.base_url)))?;
            segments.pop_if_empty();
            if !request.indices.is_empty() {
                segments.push(&request.indices.join(","));
            }
            segments.push("_search");
        }

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("typed_keys", "true");
            if let Some(allow) = request.allow_partial_search_results {
                query.append_pair("allow_partial_search_results", &allow.to_string());
            }
            if let Some(options) = &request.indices_options {
                for (key, value) in options.to_query_pairs() {
                    query.append_pair(key, &value);
                }
            }
        }

        Ok(url)
    }
}

#[async_trait]
impl SearchClient for HttpSearchClient {
    async fn search(&self, request: &SearchRequest) -> Result<EngineResponse> {
        let url = self.search_url(request)?;
        debug!(url = %url, "POST search");

        let mut builder = self.client.post(url).json(&request.source);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.header(reqwest::header::AUTHORIZATION, format!("ApiKey {}", api_key));
        } else if let Some(username) = &self.config.username {
            builder = builder.basic_auth(username, self.config.password.as_ref());
        }

        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let body = decode_body(status, &bytes)?;

        Ok(EngineResponse { status, body })
    }
}

/// Refuses `.`, `..` and names with path separators. The URL builder would
/// silently drop the first two.
fn is_valid_index(name: &str) -> bool {
    name != "." && name != ".." && !name.contains(|c: char| c == '/' || c == '\\')
}

/// Success bodies must be JSON. Failure bodies often come from a proxy as
/// HTML or plain text; those are kept as a string so the status still gets
/// classified.
fn decode_body(status: StatusCode, bytes: &[u8]) -> Result<Value> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    if is_success(&status_name(status)) {
        return Ok(serde_json::from_slice(bytes)?);
    }
    Ok(serde_json::from_slice(bytes).unwrap_or_else(|_| {
        debug!(status = %status, bytes = bytes.len(), "non-JSON error body");
        Value::String(String::from_utf8_lossy(bytes).into_owned())
    }))
}
