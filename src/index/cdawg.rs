//! Compact DAWG (CDAWG) construction
//!
//! The compact automaton merges every non-branching chain of DAWG states
//! into one edge labelled by a token span `[start, end)` of the text. It is
//! built online (Inenaga et al., "On-line construction of compact directed
//! acyclic word graphs"):
//!
//! - The *active point* `(node, start)` names the longest repeated suffix of
//!   the text read so far: the tokens `text[start..]` read from `node`.
//! - Each new token either extends the active point (it already occurs) or
//!   hangs an open edge to the sink from every explicit or implicit point on
//!   the suffix chain, splitting edges where the point is implicit.
//! - Edges ending in the same node are redirected instead of split again.
//! - A node reached through a non-solid edge is separated (cloned) so node
//!   lengths stay exact.
//!
//! There is one sink. Open edges end at the current text length. Every EOS
//! occurrence is its own symbol (see [`edge_key`]), so after the final EOS
//! every suffix of the text ends in the sink and the number of source-to-sink
//! paths through a node is its occurrence count.

use crate::index::counter::count_paths;
use crate::index::tokens::TokenStore;
use crate::index::types::{edge_key, NodeId, Token, EOS, OPEN_END};
use crate::index::writer::CdawgWriter;
use crate::query::cdawg::{CdawgGraph, EdgeSpan};
use anyhow::Result;
use std::path::Path;

/// Id of the source node
pub const CDAWG_SOURCE: NodeId = 0;

/// Id of the sink node
pub const CDAWG_SINK: NodeId = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Edge {
    key: u64,
    start: usize,
    end: usize,
    target: NodeId,
}

#[derive(Debug, Clone)]
struct Node {
    length: u64,
    failure: Option<NodeId>,
    /// Sorted by key
    edges: Vec<Edge>,
}

/// In-memory compact automaton together with the text it spans
#[derive(Debug, Clone)]
pub struct Cdawg {
    tokens: Vec<Token>,
    nodes: Vec<Node>,
    edge_count: usize,
    active_node: NodeId,
    active_start: usize,
    counts: Option<Vec<u64>>,
}

impl Default for Cdawg {
    fn default() -> Self {
        Self::new()
    }
}

impl Cdawg {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Preallocate for a corpus of `tokens` tokens
    pub fn with_capacity(tokens: usize) -> Self {
        let mut nodes = Vec::with_capacity(tokens / 2 + 2);
        nodes.push(Node {
            length: 0,
            failure: None,
            edges: Vec::new(),
        });
        nodes.push(Node {
            length: 0,
            failure: Some(CDAWG_SOURCE),
            edges: Vec::new(),
        });
        Self {
            tokens: Vec::with_capacity(tokens),
            nodes,
            edge_count: 0,
            active_node: CDAWG_SOURCE,
            active_start: 0,
            counts: None,
        }
    }

    /// Build the compact automaton for a whole token store (counts not filled)
    pub fn build(tokens: &TokenStore) -> Self {
        let mut cdawg = Self::with_capacity(tokens.len());
        for &token in tokens.as_slice() {
            cdawg.extend(token);
        }
        cdawg
    }

    /// Append one token to the indexed text
    pub fn extend(&mut self, token: Token) {
        self.tokens.push(token);
        let position = self.tokens.len() - 1;
        self.nodes[CDAWG_SINK].length = self.tokens.len() as u64;
        self.update(position);
        self.counts = None;
    }

    /// Seal the text with `EOS` (if needed) and count suffix occurrences.
    /// Calling it again without further construction is a no-op.
    pub fn fill_counts(&mut self) {
        if self.counts.is_some() {
            return;
        }
        self.seal();

        let nodes = &self.nodes;
        let counts = count_paths(nodes.len(), CDAWG_SOURCE, |node| {
            nodes[node].edges.iter().map(|edge| edge.target).collect()
        });
        self.counts = Some(counts);
        log::debug!("filled counts for {} CDAWG nodes", self.nodes.len());
    }

    /// Append `EOS` unless the text already ends with it
    pub fn seal(&mut self) {
        if !self.is_sealed() {
            self.extend(EOS);
        }
    }

    /// Whether the text ends with `EOS`. Path counts are only occurrence
    /// counts for a sealed text.
    pub fn is_sealed(&self) -> bool {
        self.tokens.last() == Some(&EOS)
    }

    pub fn has_counts(&self) -> bool {
        self.counts.is_some()
    }

    /// The indexed text
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Save as a directory holding `tokens.bin`, `cdawg.bin` and `meta.json`.
    /// The text must be sealed.
    pub fn save(&self, dir: &Path) -> Result<()> {
        CdawgWriter::write(dir, self, None)
    }

    #[inline]
    fn key_at(&self, position: usize) -> u64 {
        edge_key(self.tokens[position], position)
    }

    #[inline]
    fn resolve_end(&self, end: usize) -> usize {
        if end == OPEN_END { self.tokens.len() } else { end }
    }

    /// Index of the out-edge of `node` whose label starts like `tokens[position..]`
    #[inline]
    fn edge_from(&self, node: NodeId, position: usize) -> Option<usize> {
        let key = self.key_at(position);
        self.nodes[node]
            .edges
            .binary_search_by_key(&key, |edge| edge.key)
            .ok()
    }

    fn add_edge(&mut self, node: NodeId, edge: Edge) {
        let edges = &mut self.nodes[node].edges;
        match edges.binary_search_by_key(&edge.key, |e| e.key) {
            Ok(i) => edges[i] = edge,
            Err(i) => {
                edges.insert(i, edge);
                self.edge_count += 1;
            }
        }
    }

    fn push_node(&mut self, length: u64, failure: Option<NodeId>, edges: Vec<Edge>) -> NodeId {
        let id = self.nodes.len();
        self.edge_count += edges.len();
        self.nodes.push(Node {
            length,
            failure,
            edges,
        });
        id
    }

    /// Walk whole edges of `tokens[start..end]` from `node`.
    ///
    /// `None` stands for the auxiliary node below the source, which reads
    /// any single token into the source.
    fn canonize(&self, node: Option<NodeId>, mut start: usize, end: usize) -> (Option<NodeId>, usize) {
        if start >= end {
            return (node, start);
        }

        let mut node = match node {
            Some(node) => node,
            None => {
                start += 1;
                CDAWG_SOURCE
            }
        };

        while start < end {
            let Some(i) = self.edge_from(node, start) else {
                break;
            };
            let edge = self.nodes[node].edges[i];
            let span = self.resolve_end(edge.end) - edge.start;
            if span > end - start {
                break;
            }
            start += span;
            node = edge.target;
        }

        (Some(node), start)
    }

    /// Whether `tokens[start..end]` read from `node` can be followed by `tokens[end]`
    fn check_end_point(&self, node: Option<NodeId>, start: usize, end: usize) -> bool {
        let Some(node) = node else {
            return true;
        };

        if start < end {
            let Some(i) = self.edge_from(node, start) else {
                return false;
            };
            let probe = self.nodes[node].edges[i].start + (end - start);
            self.key_at(probe) == self.key_at(end)
        } else {
            self.edge_from(node, end).is_some()
        }
    }

    /// Cut edge `index` of `node` after `offset` tokens, returning the new middle node
    fn split_edge(&mut self, node: NodeId, index: usize, offset: usize) -> NodeId {
        let edge = self.nodes[node].edges[index];
        let middle = edge.start + offset;
        let length = self.nodes[node].length + offset as u64;
        let split = self.push_node(length, None, Vec::new());

        let shortened = &mut self.nodes[node].edges[index];
        shortened.end = middle;
        shortened.target = split;

        let key = self.key_at(middle);
        self.add_edge(
            split,
            Edge {
                key,
                start: middle,
                end: edge.end,
                target: edge.target,
            },
        );
        split
    }

    /// Point the first `offset` tokens of edge `index` of `node` at `target`
    fn redirect_edge(&mut self, node: NodeId, index: usize, offset: usize, target: NodeId) {
        let edge = &mut self.nodes[node].edges[index];
        edge.end = edge.start + offset;
        edge.target = target;
    }

    fn update(&mut self, position: usize) {
        let mut node = Some(self.active_node);
        let mut start = self.active_start;
        let mut destination: Option<NodeId> = None;
        let mut branch = CDAWG_SOURCE;
        let mut previous: Option<NodeId> = None;

        while !self.check_end_point(node, start, position) {
            let Some(current) = node else {
                break;
            };

            if start < position {
                let Some(index) = self.edge_from(current, start) else {
                    break;
                };
                let target = self.nodes[current].edges[index].target;
                if destination == Some(target) {
                    self.redirect_edge(current, index, position - start, branch);
                    (node, start) = self.canonize(self.nodes[current].failure, start, position);
                    continue;
                }
                destination = Some(target);
                branch = self.split_edge(current, index, position - start);
            } else {
                branch = current;
            }

            let key = self.key_at(position);
            self.add_edge(
                branch,
                Edge {
                    key,
                    start: position,
                    end: OPEN_END,
                    target: CDAWG_SINK,
                },
            );
            if let Some(prev) = previous {
                self.nodes[prev].failure = Some(branch);
            }
            previous = Some(branch);
            (node, start) = self.canonize(self.nodes[current].failure, start, position);
        }

        if let Some(prev) = previous {
            self.nodes[prev].failure = node;
        }

        let (active_node, active_start) = self.separate_node(node, start, position + 1);
        self.active_node = active_node;
        self.active_start = active_start;
    }

    /// Canonize the new active point, cloning its node if it is reached by
    /// a non-solid edge.
    fn separate_node(&mut self, node: Option<NodeId>, start: usize, end: usize) -> (NodeId, usize) {
        let canonical = self.canonize(node, start, end);
        let (Some(reached), reached_start) = canonical else {
            return (CDAWG_SOURCE, end);
        };
        if reached_start < end {
            return (reached, reached_start);
        }

        let base = node.map_or(-1, |n| self.nodes[n].length as i64);
        let length = base + (end - start) as i64;
        if self.nodes[reached].length as i64 == length {
            return (reached, reached_start);
        }

        let edges = self.nodes[reached].edges.clone();
        let failure = self.nodes[reached].failure;
        let copy = self.push_node(length as u64, failure, edges);
        self.nodes[reached].failure = Some(copy);

        let (mut node, mut start) = (node, start);
        while let Some(current) = node {
            let Some(index) = self.edge_from(current, start) else {
                break;
            };
            let edge = &mut self.nodes[current].edges[index];
            edge.start = start;
            edge.end = end;
            edge.target = copy;

            (node, start) = self.canonize(self.nodes[current].failure, start, end - 1);
            if self.canonize(node, start, end) != canonical {
                break;
            }
        }

        (copy, end)
    }

    fn span(&self, edge: &Edge) -> EdgeSpan {
        EdgeSpan {
            start: edge.start,
            end: self.resolve_end(edge.end),
            target: edge.target,
        }
    }
}

impl CdawgGraph for Cdawg {
    fn source(&self) -> NodeId {
        CDAWG_SOURCE
    }

    fn sink(&self) -> NodeId {
        CDAWG_SINK
    }

    fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    fn num_edges(&self) -> usize {
        self.edge_count
    }

    fn length(&self, node: NodeId) -> u64 {
        self.nodes[node].length
    }

    fn failure(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node].failure
    }

    fn token(&self, index: usize) -> Token {
        self.tokens[index]
    }

    fn text_len(&self) -> usize {
        self.tokens.len()
    }

    fn edge(&self, node: NodeId, key: u64) -> Option<EdgeSpan> {
        let edges = &self.nodes[node].edges;
        edges
            .binary_search_by_key(&key, |edge| edge.key)
            .ok()
            .map(|i| self.span(&edges[i]))
    }

    fn edges(&self, node: NodeId) -> Vec<EdgeSpan> {
        self.nodes[node].edges.iter().map(|edge| self.span(edge)).collect()
    }

    fn get_count(&self, node: NodeId) -> Option<u64> {
        self.counts.as_ref().map(|counts| counts[node])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SuffixIndex;

    const C: Token = 1;
    const O: Token = 2;
    const A: Token = 3;

    fn counted(tokens: &[Token]) -> Cdawg {
        let mut cdawg = Cdawg::build(&TokenStore::from_tokens(tokens.to_vec()));
        cdawg.fill_counts();
        cdawg
    }

    fn child(cdawg: &Cdawg, node: NodeId, token: Token) -> NodeId {
        cdawg.edge(node, token as u64).unwrap().target
    }

    #[test]
    fn test_build_cocoa() {
        let cdawg = counted(&[C, O, C, O, A]);

        // source, sink and the node for {co, o}
        assert_eq!(cdawg.num_nodes(), 3);
        let co = child(&cdawg, CDAWG_SOURCE, C);
        assert_eq!(child(&cdawg, CDAWG_SOURCE, O), co);
        assert_eq!(cdawg.length(co), 2);
        assert_eq!(cdawg.failure(co), Some(CDAWG_SOURCE));
        assert_eq!(child(&cdawg, CDAWG_SOURCE, A), CDAWG_SINK);

        let c_edge = cdawg.edge(CDAWG_SOURCE, C as u64).unwrap();
        assert_eq!(c_edge.end - c_edge.start, 2);

        let mut arities = cdawg.traverse_arities();
        arities.sort();
        assert_eq!(arities, vec![0, 2, 4]);
        assert_eq!(cdawg.num_edges(), 6);

        assert_eq!(cdawg.get_count(CDAWG_SOURCE), Some(6));
        assert_eq!(cdawg.get_count(co), Some(2));
        assert_eq!(cdawg.get_count(CDAWG_SINK), Some(1));
    }

    #[test]
    fn test_build_cocoao_separates_node() {
        let mut cdawg = Cdawg::new();
        for token in [C, O, C, O, A, O] {
            cdawg.extend(token);
        }

        // "o" is cloned out of the {co, o} node
        assert_eq!(cdawg.num_nodes(), 4);
        let o = child(&cdawg, CDAWG_SOURCE, O);
        let co = child(&cdawg, CDAWG_SOURCE, C);
        assert_ne!(o, co);
        assert_eq!(cdawg.length(o), 1);
        assert_eq!(cdawg.length(co), 2);
        assert_eq!(cdawg.failure(co), Some(o));
        assert_eq!(cdawg.failure(o), Some(CDAWG_SOURCE));

        cdawg.fill_counts();
        assert_eq!(cdawg.get_count(o), Some(3));
        assert_eq!(cdawg.get_count(co), Some(2));
        assert_eq!(cdawg.get_count(CDAWG_SOURCE), Some(7));
    }

    #[test]
    fn test_counts_before_fill_are_unset() {
        let cdawg = Cdawg::build(&TokenStore::from_tokens(vec![C, O]));
        assert_eq!(cdawg.get_count(CDAWG_SOURCE), None);
        assert!(!cdawg.has_counts());
    }

    #[test]
    fn test_query_cocoa() {
        let cdawg = counted(&[C, O, C, O, A]);

        let first = cdawg.transition_and_count(cdawg.get_initial(), C);
        assert_eq!(first.length, 1);
        assert!(first.edge.is_some());
        assert_eq!(cdawg.get_suffix_count(first), Some(2));

        let second = cdawg.transition_and_count(first, O);
        assert_eq!(second.length, 2);
        assert!(second.edge.is_none());

        let third = cdawg.transition_and_count(second, A);
        assert_eq!(third.length, 3);
        assert_eq!(cdawg.get_suffix_count(third), Some(1));

        // "coac" never occurs; the longest suffix that does is "c"
        let fourth = cdawg.transition_and_count(third, C);
        assert_eq!(fourth.length, 1);
        assert_eq!(cdawg.get_suffix_count(fourth), Some(2));
    }

    #[test]
    fn test_documents_do_not_merge_at_eos() {
        let store = TokenStore::from_documents([vec![C, O], vec![C, O]]);
        let mut cdawg = Cdawg::build(&store);
        cdawg.fill_counts();

        // Two distinct EOS edges from the node for "co"
        let co = child(&cdawg, CDAWG_SOURCE, C);
        let eos_edges = cdawg
            .edges(co)
            .iter()
            .filter(|edge| cdawg.token(edge.start) == EOS)
            .count();
        assert_eq!(eos_edges, 2);
        assert_eq!(cdawg.get_count(co), Some(2));
        assert_eq!(cdawg.get_count(CDAWG_SOURCE), Some(6));
    }

    #[test]
    fn test_single_token_corpus() {
        let cdawg = counted(&[]);
        assert_eq!(cdawg.tokens(), &[EOS]);
        assert_eq!(cdawg.num_nodes(), 2);
        assert_eq!(cdawg.get_count(CDAWG_SOURCE), Some(1));
        let position = cdawg.transition_and_count(cdawg.get_initial(), 4);
        assert_eq!(position, cdawg.get_initial());
    }
}
