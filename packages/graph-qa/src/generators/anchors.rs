//! Cartesian anchoring of pattern nodes to dictionary candidates.

use crate::traits::generators::{AnchoredPatterns, PatternAnchorGenerator};
use crate::types::pattern::{AnchoredNode, AnchoredPattern, Mappings, Pgp};

/// Binds every node to each of its candidate terms in turn.
///
/// Patterns are produced in odometer order: the last node's candidates
/// vary fastest. A node without candidates stays open (`term: None`) in
/// every pattern. Nothing is materialized beyond the current combination.
#[derive(Debug, Clone, Default)]
pub struct CartesianAnchors;

impl CartesianAnchors {
    pub fn new() -> Self {
        Self
    }
}

impl PatternAnchorGenerator for CartesianAnchors {
    fn anchor<'a>(&'a self, pgp: &'a Pgp, mappings: &'a Mappings) -> AnchoredPatterns<'a> {
        Box::new(Odometer::new(pgp, mappings))
    }
}

struct Odometer<'a> {
    pgp: &'a Pgp,
    candidates: Vec<&'a [String]>,
    positions: Vec<usize>,
    exhausted: bool,
}

impl<'a> Odometer<'a> {
    fn new(pgp: &'a Pgp, mappings: &'a Mappings) -> Self {
        let candidates = pgp
            .nodes
            .iter()
            .map(|node| mappings.get(&node.text).map(Vec::as_slice).unwrap_or(&[]))
            .collect();

        Self {
            pgp,
            candidates,
            positions: vec![0; pgp.nodes.len()],
            exhausted: pgp.nodes.is_empty(),
        }
    }

    fn current(&self) -> AnchoredPattern {
        let nodes = self
            .pgp
            .nodes
            .iter()
            .zip(&self.candidates)
            .zip(&self.positions)
            .map(|((node, terms), &pos)| AnchoredNode {
                id: node.id.clone(),
                head: node.head,
                text: node.text.clone(),
                term: terms.get(pos).cloned(),
            })
            .collect();

        AnchoredPattern {
            nodes,
            edges: self.pgp.edges.clone(),
            focus: self.pgp.focus.clone(),
        }
    }

    /// Advance to the next combination; false once every one was visited.
    fn advance(&mut self) -> bool {
        for i in (0..self.positions.len()).rev() {
            let width = self.candidates[i].len().max(1);
            if self.positions[i] + 1 < width {
                self.positions[i] += 1;
                return true;
            }
            self.positions[i] = 0;
        }
        false
    }
}

impl Iterator for Odometer<'_> {
    type Item = AnchoredPattern;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let pattern = self.current();
        self.exhausted = !self.advance();
        Some(pattern)
    }
}
