//! Parser output: tokens, base noun chunks and relations.

use serde::{Deserialize, Serialize};

/// A semantic argument of a token: the role label and the index of the
/// argument token. Arguments pointing at the discarded root row are `-1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub role: String,
    pub target: isize,
}

impl Argument {
    pub fn new(role: impl Into<String>, target: isize) -> Self {
        Self {
            role: role.into(),
            target,
        }
    }

    /// The argument target as a token index, if it points at a real token.
    pub fn index(&self) -> Option<usize> {
        usize::try_from(self.target).ok()
    }
}

/// One token of a parsed sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// 0-based position after the synthetic root row is removed
    pub idx: usize,

    /// Surface form
    pub lex: String,

    /// Base (lemma) form
    pub base: String,

    /// Part of speech
    pub pos: String,

    /// Phrase category
    pub cat: String,

    /// Semantic frame type
    pub frame: String,

    /// Semantic arguments
    pub args: Vec<Argument>,

    /// Character offset where the token starts in the trimmed sentence
    pub beg: usize,

    /// Character offset just past the token
    pub end: usize,
}

impl Token {
    /// Whether the token carries any semantic argument.
    pub fn has_args(&self) -> bool {
        !self.args.is_empty()
    }
}

/// A maximal run of noun-phrase tokens with one designated head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseNounChunk {
    pub head: usize,
    pub beg: usize,
    pub end: usize,
}

impl BaseNounChunk {
    pub fn contains(&self, idx: usize) -> bool {
        self.beg <= idx && idx <= self.end
    }
}

/// Shortest path between two chunk heads that crosses no other chunk head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub subject: usize,
    pub path: Vec<usize>,
    pub object: usize,
}

/// Everything the analyzer derives from one sentence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseResult {
    pub tokens: Vec<Token>,

    /// Index of the syntactic root; absent for empty input
    pub root: Option<usize>,

    /// Index of the token the question asks about; absent for empty input
    pub focus: Option<usize>,

    pub base_noun_chunks: Vec<BaseNounChunk>,

    pub relations: Vec<Relation>,
}

impl ParseResult {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
