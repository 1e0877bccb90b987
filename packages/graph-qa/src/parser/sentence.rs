//! Sentence analysis: tokens, base noun chunks, relations and focus.
//!
//! The parser service does the linguistic work; this module turns its rows
//! into the structures the pattern builder needs.

use std::sync::Arc;
use tracing::debug;

use super::graph::DependencyGraph;
use crate::error::{ParserError, ParserResult};
use crate::traits::parser::ParserService;
use crate::types::parse::{Argument, BaseNounChunk, ParseResult, Relation, Token};

/// Categories that may be part of a base noun chunk.
///
/// PRP is left out on purpose; dialog analysis would need it.
pub const NC_CAT: &[&str] = &["NN", "NNP", "CD", "FW", "JJ", "WP"];

/// Categories that may be the head of a base noun chunk.
pub const NC_HEAD_CAT: &[&str] = &["NN", "NNP", "CD", "FW", "WP"];

/// wh-pronouns and wh-determiners.
pub const WH_CAT: &[&str] = &["WP", "WDT"];

fn is_chunk_cat(cat: &str) -> bool {
    NC_CAT.contains(&cat)
}

fn is_head_cat(cat: &str) -> bool {
    NC_HEAD_CAT.contains(&cat)
}

fn is_wh_cat(cat: &str) -> bool {
    WH_CAT.contains(&cat)
}

/// Parses questions through a [`ParserService`].
#[derive(Clone)]
pub struct SentenceParser {
    service: Arc<dyn ParserService>,
}

impl SentenceParser {
    pub fn new(service: Arc<dyn ParserService>) -> Self {
        Self { service }
    }

    /// Parse a sentence.
    ///
    /// Empty or whitespace-only input yields an empty result without
    /// calling the service.
    pub async fn parse(&self, sentence: &str) -> ParserResult<ParseResult> {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            return Ok(ParseResult::default());
        }

        let body = self.service.parse_conll(sentence).await?;
        analyze(sentence, &body)
    }
}

/// Analyze the parser rows for an already trimmed sentence.
pub fn analyze(sentence: &str, conll: &str) -> ParserResult<ParseResult> {
    let (mut tokens, root) = read_rows(conll)?;
    assign_spans(sentence, &mut tokens);

    let mut base_noun_chunks = base_noun_chunks(&tokens)?;
    let mut relations = relations(&tokens, &base_noun_chunks);
    let focus = focus(&tokens, &mut base_noun_chunks, &mut relations)?;

    debug!(
        tokens = tokens.len(),
        chunks = base_noun_chunks.len(),
        relations = relations.len(),
        ?focus,
        "Parsed sentence"
    );

    Ok(ParseResult {
        tokens,
        root: Some(root),
        focus,
        base_noun_chunks,
        relations,
    })
}

/// Read CoNLL rows into tokens and resolve the root.
///
/// Row 0 is the synthetic root; its first argument names the real root.
/// It is discarded and the remaining rows are indexed from 0.
fn read_rows(conll: &str) -> ParserResult<(Vec<Token>, usize)> {
    let mut rows = conll
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.is_empty())
        .enumerate()
        .map(|(row, line)| read_row(row, line));

    let root_row = rows.next().ok_or_else(|| ParserError::MalformedRow {
        row: 0,
        reason: "response has no rows".to_string(),
    })??;

    let tokens = rows.collect::<ParserResult<Vec<Token>>>()?;

    let root = root_row
        .args
        .first()
        .and_then(Argument::index)
        .filter(|&r| r < tokens.len())
        .ok_or_else(|| ParserError::MalformedRow {
            row: 0,
            reason: "root row does not name a token".to_string(),
        })?;

    Ok((tokens, root))
}

fn read_row(row: usize, line: &str) -> ParserResult<Token> {
    let malformed = |reason: &str| ParserError::MalformedRow {
        row,
        reason: reason.to_string(),
    };

    let fields: Vec<&str> = line.splitn(7, '\t').collect();
    if fields.len() < 6 {
        return Err(malformed("expected at least 6 tab-separated fields"));
    }

    let args = match fields.get(6) {
        Some(raw) => raw
            .split_whitespace()
            .map(|a| {
                let (role, target) = a
                    .rsplit_once(':')
                    .ok_or_else(|| malformed("argument is not role:index"))?;
                let target: isize = target
                    .parse()
                    .map_err(|_| malformed("argument index is not a number"))?;
                Ok(Argument::new(role, target - 1))
            })
            .collect::<ParserResult<Vec<_>>>()?,
        None => Vec::new(),
    };

    Ok(Token {
        // row 0 is the synthetic root and never becomes a token
        idx: row.saturating_sub(1),
        lex: fields[1].to_string(),
        base: fields[2].to_string(),
        pos: fields[3].to_string(),
        cat: fields[4].to_string(),
        frame: fields[5].to_string(),
        args,
        beg: 0,
        end: 0,
    })
}

/// Assign character spans, assuming tokens appear in sentence order.
fn assign_spans(sentence: &str, tokens: &mut [Token]) {
    let chars: Vec<char> = sentence.chars().collect();
    let mut i = 0;
    for token in tokens {
        while i < chars.len() && matches!(chars[i], ' ' | '\t' | '\n') {
            i += 1;
        }
        token.beg = i;
        token.end = i + token.lex.chars().count();
        i = token.end;
    }
}

/// Find base noun chunks from the category pattern.
///
/// The head is the last head-eligible token without arguments. A chunk that
/// closes without one falls back to the closing token; a chunk running to
/// the end of the sentence without one is an inconsistent parse.
pub fn base_noun_chunks(tokens: &[Token]) -> ParserResult<Vec<BaseNounChunk>> {
    let mut chunks = Vec::new();
    let mut beg: Option<usize> = None;
    let mut head: Option<usize> = None;

    for (i, t) in tokens.iter().enumerate() {
        let eligible = is_chunk_cat(&t.cat);
        if beg.is_none() && eligible {
            beg = Some(t.idx);
        }
        let Some(b) = beg else {
            continue;
        };
        if is_head_cat(&t.cat) && !t.has_args() {
            head = Some(t.idx);
        }
        if !eligible {
            chunks.push(BaseNounChunk {
                head: head.unwrap_or(t.idx),
                beg: b,
                end: tokens[i - 1].idx,
            });
            beg = None;
            head = None;
        }
    }

    if let Some(b) = beg {
        let head = head.ok_or_else(|| {
            ParserError::Invariant(format!("base noun chunk starting at token {b} has no head"))
        })?;
        let end = tokens.last().map_or(b, |t| t.idx);
        chunks.push(BaseNounChunk { head, beg: b, end });
    }

    Ok(chunks)
}

/// Shortest paths between chunk heads that are not interrupted by another
/// chunk head.
///
/// Each argument link is walkable both ways so that two nouns governed by
/// the same predicate are connected through it.
pub fn relations(tokens: &[Token], chunks: &[BaseNounChunk]) -> Vec<Relation> {
    let mut graph = DependencyGraph::new();
    for t in tokens {
        for target in t.args.iter().filter_map(Argument::index) {
            graph.add_edge(t.idx, target, 1);
            graph.add_edge(target, t.idx, 1);
        }
    }

    let heads: Vec<usize> = chunks.iter().map(|c| c.head).collect();
    let mut relations = Vec::new();

    for (i, a) in chunks.iter().enumerate() {
        for b in &chunks[i + 1..] {
            let Some(path) = graph.shortest_path(a.head, b.head) else {
                continue;
            };
            let [subject, inner @ .., object] = path.as_slice() else {
                continue;
            };
            if inner.iter().any(|p| heads.contains(p)) {
                continue;
            }
            relations.push(Relation {
                subject: *subject,
                path: inner.to_vec(),
                object: *object,
            });
        }
    }

    relations
}

/// Index of the focus word, i.e. the one the question asks about.
///
/// For an apposition ("What is the capital of Japan?") the interrogative
/// chunk and its copula relation are removed and the apposed noun becomes
/// the focus.
pub fn focus(
    tokens: &[Token],
    chunks: &mut Vec<BaseNounChunk>,
    relations: &mut Vec<Relation>,
) -> ParserResult<Option<usize>> {
    if tokens.is_empty() {
        return Ok(None);
    }

    // assumption: one question has only one wh-word
    let Some(wh) = tokens.iter().find(|t| is_wh_cat(&t.cat)) else {
        return Ok(Some(chunks.first().map_or(0, |c| c.head)));
    };

    if let Some(arg) = wh.args.first() {
        return arg
            .index()
            .filter(|&i| i < tokens.len())
            .map(Some)
            .ok_or_else(|| {
                ParserError::Invariant(format!(
                    "interrogative token {} points at missing token {}",
                    wh.idx, arg.target
                ))
            });
    }

    let wh_rel = relations.iter().position(|r| r.subject == wh.idx);
    if let Some(pos) = wh_rel {
        let is_copula = relations[pos]
            .path
            .first()
            .and_then(|&p| tokens.get(p))
            .is_some_and(|t| t.base == "be");
        if is_copula {
            let rel = relations.remove(pos);
            if !chunks.is_empty() {
                chunks.remove(0);
            }
            return Ok(Some(rel.object));
        }
    }

    Ok(Some(wh.idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockParserService;
    use proptest::prelude::*;

    /// "What devices are used to treat heart failure ?" with the
    /// interrogative as a bare pronoun.
    const DEVICES: &str = "\
0\tROOT\tROOT\tROOT\tROOT\tROOT\tARG1:4
1\tWhat\twhat\tWP\tWP\tnoun_arg0
2\tdevices\tdevice\tNNS\tNN\tnoun_arg0
3\tare\tbe\tVBP\tVBP\tbe_arg1_arg2\tARG1:1 ARG2:4
4\tused\tuse\tVBN\tVBN\tverb_arg12\tARG2:2 ARG1:6
5\tto\tto\tTO\tTO\taux_arg12\tARG2:6
6\ttreat\ttreat\tVB\tVB\tverb_arg12\tARG1:2 ARG2:8
7\theart\theart\tNN\tNN\tnoun_arg0
8\tfailure\tfailure\tNN\tNN\tnoun_arg0
9\t?\t?\t.\t.\tpunct";

    /// "What is the capital of Japan ?"
    const CAPITAL: &str = "\
0\tROOT\tROOT\tROOT\tROOT\tROOT\tARG1:2
1\tWhat\twhat\tWP\tWP\tnoun_arg0
2\tis\tbe\tVBZ\tVBZ\tbe_arg1_arg2\tARG1:1 ARG2:4
3\tthe\tthe\tDT\tDT\td_arg1\tARG1:4
4\tcapital\tcapital\tNN\tNN\tnoun_arg0
5\tof\tof\tIN\tIN\tprep_arg12\tARG1:4 ARG2:6
6\tJapan\tjapan\tNNP\tNN\tnoun_arg0
7\t?\t?\t.\t.\tpunct";

    fn token(idx: usize, cat: &str, args: Vec<Argument>) -> Token {
        Token {
            idx,
            lex: format!("w{idx}"),
            base: format!("w{idx}"),
            pos: cat.to_string(),
            cat: cat.to_string(),
            frame: String::new(),
            args,
            beg: 0,
            end: 0,
        }
    }

    #[test]
    fn test_root_row_is_removed_and_indices_shift() {
        let conll = "0\tROOT\tROOT\tROOT\tROOT\tROOT\tARG1:2\n\
                     1\tdogs\tdog\tNNS\tNN\tnoun_arg0\n\
                     2\tbark\tbark\tVBP\tVBP\tverb_arg1\tARG1:1\n";

        let parse = analyze("dogs bark", conll).unwrap();

        assert_eq!(parse.tokens.len(), 2);
        assert_eq!(parse.tokens[0].idx, 0);
        assert_eq!(parse.tokens[1].idx, 1);
        assert_eq!(parse.root, Some(1));
        assert_eq!(parse.tokens[1].args, vec![Argument::new("ARG1", 0)]);
    }

    #[test]
    fn test_spans_skip_whitespace() {
        let parse = analyze("What  devices are used to treat heart failure ?", DEVICES).unwrap();

        let spans: Vec<(usize, usize)> = parse.tokens.iter().map(|t| (t.beg, t.end)).collect();
        assert_eq!(spans[0], (0, 4));
        assert_eq!(spans[1], (6, 13));
        assert_eq!(spans[2], (14, 17));
        assert_eq!(parse.tokens.last().map(|t| t.end), Some(47));
    }

    #[test]
    fn test_chunks_relations_and_focus() {
        let parse = analyze("What devices are used to treat heart failure ?", DEVICES).unwrap();

        assert_eq!(
            parse.base_noun_chunks,
            vec![
                BaseNounChunk { head: 1, beg: 0, end: 1 },
                BaseNounChunk { head: 7, beg: 6, end: 7 },
            ]
        );
        assert_eq!(
            parse.relations,
            vec![Relation {
                subject: 1,
                path: vec![5],
                object: 7
            }]
        );
        // the bare wh-word heads no chunk, so no relation starts from it
        assert_eq!(parse.focus, Some(0));
    }

    #[test]
    fn test_interrogative_without_args_is_focus() {
        // "What treats headache" with "What" as its own chunk head
        let tokens = vec![
            token(0, "WP", vec![]),
            token(1, "VBZ", vec![Argument::new("ARG1", 0), Argument::new("ARG2", 2)]),
            token(2, "NN", vec![]),
        ];
        let mut chunks = base_noun_chunks(&tokens).unwrap();
        let mut rels = relations(&tokens, &chunks);

        assert_eq!(chunks.len(), 2);
        assert_eq!(rels.len(), 1);

        let focus = focus(&tokens, &mut chunks, &mut rels).unwrap();
        assert_eq!(focus, Some(0));
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_apposition_drops_first_chunk_and_relation() {
        let parse = analyze("What is the capital of Japan ?", CAPITAL).unwrap();

        assert_eq!(parse.focus, Some(3));
        assert_eq!(parse.base_noun_chunks.first().map(|c| c.head), Some(3));
        assert!(parse.relations.iter().all(|r| r.subject != 0));
    }

    #[test]
    fn test_wh_determiner_with_argument_points_at_noun() {
        let tokens = vec![
            token(0, "WDT", vec![Argument::new("ARG1", 1)]),
            token(1, "NN", vec![]),
            token(2, "VBP", vec![Argument::new("ARG1", 1)]),
        ];
        let mut chunks = base_noun_chunks(&tokens).unwrap();
        let mut rels = relations(&tokens, &chunks);

        assert_eq!(focus(&tokens, &mut chunks, &mut rels).unwrap(), Some(1));
    }

    #[test]
    fn test_wh_argument_to_root_is_rejected() {
        let tokens = vec![token(0, "WDT", vec![Argument::new("ARG1", -1)])];
        let mut chunks = vec![];
        let mut rels = vec![];

        assert!(matches!(
            focus(&tokens, &mut chunks, &mut rels),
            Err(ParserError::Invariant(_))
        ));
    }

    #[test]
    fn test_no_interrogative_uses_first_chunk_head() {
        let tokens = vec![
            token(0, "DT", vec![]),
            token(1, "JJ", vec![]),
            token(2, "NN", vec![]),
        ];
        let mut chunks = base_noun_chunks(&tokens).unwrap();
        let mut rels = relations(&tokens, &chunks);
        assert_eq!(focus(&tokens, &mut chunks, &mut rels).unwrap(), Some(2));

        let tokens = vec![token(0, "VB", vec![])];
        let mut chunks = base_noun_chunks(&tokens).unwrap();
        assert_eq!(focus(&tokens, &mut chunks, &mut vec![]).unwrap(), Some(0));
    }

    #[test]
    fn test_chunk_without_head_falls_back_to_boundary() {
        let tokens = vec![token(0, "JJ", vec![]), token(1, "VB", vec![])];
        let chunks = base_noun_chunks(&tokens).unwrap();
        assert_eq!(chunks, vec![BaseNounChunk { head: 1, beg: 0, end: 0 }]);
    }

    #[test]
    fn test_trailing_chunk_without_head_is_invariant_violation() {
        let tokens = vec![token(0, "VB", vec![]), token(1, "JJ", vec![])];
        assert!(matches!(
            base_noun_chunks(&tokens),
            Err(ParserError::Invariant(_))
        ));
    }

    #[test]
    fn test_noun_with_args_is_not_head() {
        let tokens = vec![
            token(0, "NN", vec![]),
            token(1, "NN", vec![Argument::new("ARG1", 0)]),
            token(2, "VB", vec![]),
        ];
        let chunks = base_noun_chunks(&tokens).unwrap();
        assert_eq!(chunks[0].head, 0);
    }

    #[test]
    fn test_relation_blocked_by_other_head() {
        // 0 -> 1 -> 2 where every node heads its own chunk
        let tokens = vec![
            token(0, "NN", vec![]),
            token(1, "VB", vec![Argument::new("ARG1", 0), Argument::new("ARG2", 2)]),
            token(2, "NN", vec![]),
            token(3, "IN", vec![Argument::new("ARG1", 2), Argument::new("ARG2", 4)]),
            token(4, "NN", vec![]),
        ];
        let chunks = base_noun_chunks(&tokens).unwrap();
        let rels = relations(&tokens, &chunks);

        let pairs: Vec<(usize, usize)> = rels.iter().map(|r| (r.subject, r.object)).collect();
        assert_eq!(pairs, vec![(0, 2), (2, 4)]);
    }

    #[test]
    fn test_malformed_rows_are_rejected() {
        assert!(matches!(
            analyze("x", "0\tROOT\tROOT"),
            Err(ParserError::MalformedRow { row: 0, .. })
        ));
        assert!(matches!(
            analyze("x", "0\tROOT\tROOT\tROOT\tROOT\tROOT\n1\tx\tx\tNN\tNN\tn"),
            Err(ParserError::MalformedRow { row: 0, .. })
        ));
        assert!(matches!(
            analyze(
                "x",
                "0\tROOT\tROOT\tROOT\tROOT\tROOT\tARG1:1\n1\tx\tx\tNN\tNN\tn\tARG1:q"
            ),
            Err(ParserError::MalformedRow { row: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_input_skips_service() {
        let service = Arc::new(MockParserService::new());
        let parser = SentenceParser::new(service.clone());

        let parse = parser.parse("   \t ").await.unwrap();

        assert!(parse.is_empty());
        assert_eq!(parse.root, None);
        assert_eq!(parse.focus, None);
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn test_parse_trims_before_calling_service() {
        let service = Arc::new(
            MockParserService::new()
                .with_response("What devices are used to treat heart failure ?", DEVICES),
        );
        let parser = SentenceParser::new(service.clone());

        let parse = parser
            .parse("  What devices are used to treat heart failure ?\n")
            .await
            .unwrap();

        assert_eq!(parse.tokens.len(), 9);
        assert_eq!(
            service.calls(),
            vec!["What devices are used to treat heart failure ?".to_string()]
        );
    }

    fn arb_tokens() -> impl Strategy<Value = Vec<Token>> {
        let cats = prop::sample::select(vec!["NN", "NNP", "JJ", "WP", "WDT", "VB", "IN", "DT", "CD"]);
        prop::collection::vec((cats, prop::collection::vec(0usize..12, 0..3)), 1..12).prop_map(
            |rows| {
                let n = rows.len();
                rows.into_iter()
                    .enumerate()
                    .map(|(i, (cat, targets))| {
                        let args = targets
                            .into_iter()
                            .filter(|&t| t < n && t != i)
                            .map(|t| Argument::new("ARG1", t as isize))
                            .collect();
                        token(i, cat, args)
                    })
                    .collect()
            },
        )
    }

    proptest! {
        #[test]
        fn prop_chunks_are_ordered_and_disjoint(tokens in arb_tokens()) {
            if let Ok(chunks) = base_noun_chunks(&tokens) {
                for c in &chunks {
                    prop_assert!(c.beg <= c.end);
                    prop_assert!(c.end < tokens.len());
                }
                for pair in chunks.windows(2) {
                    prop_assert!(pair[0].end < pair[1].beg);
                }
            }
        }

        #[test]
        fn prop_relation_paths_avoid_chunk_heads(tokens in arb_tokens()) {
            if let Ok(chunks) = base_noun_chunks(&tokens) {
                let heads: Vec<usize> = chunks.iter().map(|c| c.head).collect();
                for rel in relations(&tokens, &chunks) {
                    prop_assert!(rel.path.iter().all(|p| !heads.contains(p)));
                    prop_assert!(heads.contains(&rel.subject));
                    prop_assert!(heads.contains(&rel.object));
                }
            }
        }

        #[test]
        fn prop_focus_is_a_token_index(tokens in arb_tokens()) {
            if let Ok(mut chunks) = base_noun_chunks(&tokens) {
                let mut rels = relations(&tokens, &chunks);
                if let Ok(Some(focus)) = focus(&tokens, &mut chunks, &mut rels) {
                    prop_assert!(focus < tokens.len());
                }
            }
        }
    }
}
