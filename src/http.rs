use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Result of a best-effort JSON fetch. Failures are never errors for the
/// caller, they only mean there is nothing to contribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    Json(Value),
    Unavailable,
}

impl Fetched {
    pub fn into_json(self) -> Option<Value> {
        match self {
            Fetched::Json(v) => Some(v),
            Fetched::Unavailable => None,
        }
    }
}

#[derive(Debug, Error)]
enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("request failed: {0}")]
    Request(reqwest::Error),
    #[error("invalid header {name}")]
    Header { name: String },
    #[error("response is not JSON: {0}")]
    Decode(serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct JsonFetcher {
    client: Client,
    timeout: Duration,
}

impl JsonFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, timeout }
    }

    /// Performs one GET and parses the body as JSON. The status code is not
    /// inspected: an error body that is valid JSON is returned as-is.
    pub async fn get_json(&self, url: &str, headers: &[(&str, &str)]) -> Fetched {
        match self.try_get_json(url, headers).await {
            Ok(value) => Fetched::Json(value),
            Err(err) => {
                warn!(url = %redact_query(url), error = %err, "fetch unavailable");
                Fetched::Unavailable
            }
        }
    }

    async fn try_get_json(&self, url: &str, headers: &[(&str, &str)]) -> Result<Value, FetchError> {
        let header_map = build_headers(headers)?;
        let resp = self
            .client
            .get(url)
            .headers(header_map)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| self.classify(err))?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(|err| self.classify(err))?;
        debug!(url = %redact_query(url), status = status.as_u16(), bytes = body.len(), "fetched");

        serde_json::from_slice(&body).map_err(FetchError::Decode)
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Request(err)
        }
    }
}

fn build_headers(headers: &[(&str, &str)]) -> Result<HeaderMap, FetchError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|_| FetchError::Header {
                name: name.to_string(),
            })?;
        let mut header_value = HeaderValue::from_str(value).map_err(|_| FetchError::Header {
            name: name.to_string(),
        })?;
        if header_name == reqwest::header::AUTHORIZATION {
            header_value.set_sensitive(true);
        }
        map.insert(header_name, header_value);
    }
    Ok(map)
}

fn redact_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}
