//! Semantic pattern construction from a parse.

use crate::types::parse::ParseResult;
use crate::types::pattern::{Edge, Node, Pgp};

/// Builds the semantic pattern of a question.
pub struct PatternFactory;

impl PatternFactory {
    /// One node per base noun chunk, one edge per relation.
    ///
    /// `sentence` must be the trimmed sentence the parse was made from, since
    /// node texts are cut out of it by token span.
    pub fn create(parse: &ParseResult, sentence: &str) -> Pgp {
        let chars: Vec<char> = sentence.trim().chars().collect();
        let span = |beg: usize, end: usize| -> String {
            let end = end.min(chars.len());
            let beg = beg.min(end);
            chars[beg..end].iter().collect()
        };

        let nodes: Vec<Node> = parse
            .base_noun_chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                let beg = parse.tokens.get(chunk.beg).map_or(0, |t| t.beg);
                let end = parse.tokens.get(chunk.end).map_or(0, |t| t.end);
                Node {
                    id: format!("t{}", i + 1),
                    head: chunk.head,
                    text: span(beg, end),
                }
            })
            .collect();

        let node_of = |head: usize| nodes.iter().find(|n| n.head == head).map(|n| n.id.clone());

        let edges = parse
            .relations
            .iter()
            .filter_map(|rel| {
                let subject = node_of(rel.subject)?;
                let object = node_of(rel.object)?;
                let text = rel
                    .path
                    .iter()
                    .filter_map(|&i| parse.tokens.get(i))
                    .map(|t| t.lex.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                Some(Edge {
                    subject,
                    object,
                    text,
                })
            })
            .collect();

        let focus = parse
            .focus
            .and_then(|f| {
                parse
                    .base_noun_chunks
                    .iter()
                    .position(|c| c.head == f || c.contains(f))
            })
            .and_then(|i| nodes.get(i))
            .or_else(|| nodes.first())
            .map(|n| n.id.clone())
            .unwrap_or_default();

        Pgp {
            nodes,
            edges,
            focus,
        }
    }
}
