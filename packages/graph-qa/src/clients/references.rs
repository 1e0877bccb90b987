//! HTTP client for the URL forwarding (reference-resolution) service.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::ReferenceError;
use crate::traits::references::ReferenceResolver;
use crate::types::answer::UrlCandidate;

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    results: Vec<UrlCandidate>,
}

/// Resolves URIs with `GET <base>/url/translate.json?query=<uri>`.
pub struct HttpReferenceResolver {
    client: reqwest::Client,
    base_url: String,
}

impl HttpReferenceResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Set a custom HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn translate_url(&self) -> String {
        format!("{}/url/translate.json", self.base_url.trim_end_matches('/'))
    }
}

/// Whether a request failure means the service is simply not reachable.
fn is_unreachable(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_timeout()
}

#[async_trait]
impl ReferenceResolver for HttpReferenceResolver {
    async fn resolve(&self, uri: &str) -> Result<Option<Vec<UrlCandidate>>, ReferenceError> {
        let response = match self
            .client
            .get(self.translate_url())
            .query(&[("query", uri)])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if is_unreachable(&e) => {
                debug!(
                    url = %self.base_url,
                    error = %e,
                    "Failed to connect to the URL forwarding service, continuing without references"
                );
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if response.status() != reqwest::StatusCode::OK {
            debug!(uri, status = %response.status(), "URL forwarding service has no data");
            return Ok(None);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if is_unreachable(&e) => {
                debug!(url = %self.base_url, error = %e, "URL forwarding response timed out");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let parsed: TranslateResponse = serde_json::from_str(&body)?;
        Ok(Some(parsed.results))
    }
}
