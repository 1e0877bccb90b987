//! Parser service trait.

use async_trait::async_trait;

use crate::error::ParserResult;

/// An external dependency parser that returns CoNLL-style rows.
///
/// Implementations are responsible for rejecting unusable responses
/// (non-success status, "Empty line" bodies, HTML pages) with a
/// [`ParserError`](crate::error::ParserError). The returned body is
/// interpreted by [`SentenceParser`](crate::parser::SentenceParser).
#[async_trait]
pub trait ParserService: Send + Sync {
    /// Parse an already trimmed, non-empty sentence.
    async fn parse_conll(&self, sentence: &str) -> ParserResult<String>;
}
