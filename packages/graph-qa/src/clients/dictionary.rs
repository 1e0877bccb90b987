//! HTTP client for the term dictionary.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{LookupError, LookupResult};
use crate::traits::terms::TermMapper;
use crate::types::pattern::Mappings;

/// Dictionary reached over HTTP.
///
/// Keywords are POSTed as a JSON array; the dictionary answers with a JSON
/// object from keyword to candidate term URIs.
pub struct HttpTermMapper {
    client: reqwest::Client,
    url: String,
}

impl HttpTermMapper {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// Set a custom HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl TermMapper for HttpTermMapper {
    async fn find(&self, keywords: &[String]) -> LookupResult<Mappings> {
        debug!(url = %self.url, keywords = keywords.len(), "Dictionary lookup starting");

        let response = self
            .client
            .post(&self.url)
            .json(keywords)
            .send()
            .await
            .map_err(|source| LookupError::Http {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| LookupError::Http {
            url: self.url.clone(),
            source,
        })?;

        parse_mappings(&body)
    }
}

/// Decode a dictionary response. `null` candidate lists become empty.
pub fn parse_mappings(body: &str) -> LookupResult<Mappings> {
    let raw: BTreeMap<String, Option<Vec<String>>> =
        serde_json::from_str(body).map_err(|e| LookupError::Decode(e.to_string()))?;

    Ok(raw
        .into_iter()
        .map(|(k, v)| (k, v.unwrap_or_default()))
        .collect())
}
