//! Reference-resolution (URL forwarding) trait.

use async_trait::async_trait;

use crate::error::ReferenceError;
use crate::types::answer::UrlCandidate;

/// Finds pages and renderings outside the knowledge base for a URI.
#[async_trait]
pub trait ReferenceResolver: Send + Sync {
    /// Candidates for `uri` in the order the service returned them.
    ///
    /// Connection failures, timeouts, DNS failures and non-success
    /// responses are not errors: they yield `Ok(None)`.
    async fn resolve(&self, uri: &str) -> Result<Option<Vec<UrlCandidate>>, ReferenceError>;
}
