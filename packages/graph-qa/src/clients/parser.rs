//! HTTP client for a CoNLL-producing parser service.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use crate::error::{ParserError, ParserResult};
use crate::traits::parser::ParserService;

/// Parser service reached over HTTP (`GET ?sentence=...&format=conll`).
pub struct HttpParserService {
    client: reqwest::Client,
    url: String,
}

impl HttpParserService {
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

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ParserService for HttpParserService {
    async fn parse_conll(&self, sentence: &str) -> ParserResult<String> {
        debug!(url = %self.url, "Parser request starting");
        let unreachable = |e: reqwest::Error| {
            warn!(url = %self.url, error = %e, "Parser request failed");
            ParserError::Unreachable {
                url: self.url.clone(),
                source: Box::new(e),
            }
        };

        let response = self
            .client
            .get(&self.url)
            .query(&[("sentence", sentence), ("format", "conll")])
            .send()
            .await
            .map_err(unreachable)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response.text().await.map_err(unreachable)?;

        check_response(status, content_type.as_deref(), body)
    }
}

/// Reject parser responses that carry no usable rows.
pub fn check_response(
    status: u16,
    content_type: Option<&str>,
    body: String,
) -> ParserResult<String> {
    if !(200..300).contains(&status) {
        return Err(ParserError::Status { status });
    }
    if body.lines().any(|l| l.starts_with("Empty line")) {
        return Err(ParserError::EmptyLine);
    }
    let is_html = content_type
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("text/html"));
    if is_html {
        return Err(ParserError::Html);
    }
    Ok(body)
}
