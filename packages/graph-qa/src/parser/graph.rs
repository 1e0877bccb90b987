//! Weighted directed graph over token indices.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

/// Minimal directed graph with positive edge weights.
///
/// Only used to find shortest paths between chunk heads.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: BTreeMap<usize, Vec<(usize, u32)>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directed edge. Re-adding an edge keeps the lighter weight.
    pub fn add_edge(&mut self, from: usize, to: usize, weight: u32) {
        let weight = weight.max(1);
        let out = self.edges.entry(from).or_default();
        match out.iter_mut().find(|(t, _)| *t == to) {
            Some((_, w)) => *w = (*w).min(weight),
            None => out.push((to, weight)),
        }
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    /// Shortest path from `from` to `to`, both included.
    ///
    /// Returns `None` when `to` is unreachable and `Some(vec![from])` when
    /// `from == to`. Ties are broken by edge insertion order.
    pub fn shortest_path(&self, from: usize, to: usize) -> Option<Vec<usize>> {
        if from == to {
            return Some(vec![from]);
        }

        let mut dist: HashMap<usize, u64> = HashMap::new();
        let mut prev: HashMap<usize, usize> = HashMap::new();
        // (distance, insertion sequence) keeps pops deterministic
        let mut heap = BinaryHeap::new();
        let mut seq = 0u64;

        dist.insert(from, 0);
        heap.push(Reverse((0u64, seq, from)));

        while let Some(Reverse((d, _, node))) = heap.pop() {
            if node == to {
                break;
            }
            if dist.get(&node).is_some_and(|&best| d > best) {
                continue;
            }
            let Some(out) = self.edges.get(&node) else {
                continue;
            };
            for &(next, w) in out {
                let nd = d + u64::from(w);
                if dist.get(&next).map_or(true, |&best| nd < best) {
                    dist.insert(next, nd);
                    prev.insert(next, node);
                    seq += 1;
                    heap.push(Reverse((nd, seq, next)));
                }
            }
        }

        if !dist.contains_key(&to) {
            return None;
        }

        let mut path = vec![to];
        let mut cur = to;
        while let Some(&p) = prev.get(&cur) {
            path.push(p);
            cur = p;
        }
        path.reverse();
        Some(path)
    }
}
