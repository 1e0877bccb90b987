//! Dictionary (term lookup) trait.

use async_trait::async_trait;

use crate::error::LookupResult;
use crate::types::pattern::Mappings;

/// Maps keywords of a question to candidate knowledge-base terms.
#[async_trait]
pub trait TermMapper: Send + Sync {
    /// Look up every keyword. Keywords without candidates may be missing
    /// from the result or map to an empty list.
    async fn find(&self, keywords: &[String]) -> LookupResult<Mappings>;
}
