//! Compact automaton queries
//!
//! A compact position may sit strictly inside an edge. On a mismatch there,
//! the pending part of the edge (`gamma`) is replayed from the suffix link
//! of the node the edge leaves, skipping whole edges at a time.

use crate::index::counter::reachable_arities;
use crate::index::types::{NodeId, Token, EOS};
use crate::query::{continuation_entropy, rank_continuations, NextToken};
use serde::{Deserialize, Serialize};

/// Read access to a compact automaton and the text its edges span
pub trait CdawgGraph {
    fn source(&self) -> NodeId;
    fn sink(&self) -> NodeId;
    fn num_nodes(&self) -> usize;
    fn num_edges(&self) -> usize;
    fn length(&self, node: NodeId) -> u64;
    fn failure(&self, node: NodeId) -> Option<NodeId>;

    /// Token at `index` of the indexed text
    fn token(&self, index: usize) -> Token;
    fn text_len(&self) -> usize;

    /// Out-edge of `node` with the given first-token key
    fn edge(&self, node: NodeId, key: u64) -> Option<EdgeSpan>;
    fn edges(&self, node: NodeId) -> Vec<EdgeSpan>;

    /// Number of suffixes of the text passing through `node`, or `None`
    /// before counts are filled
    fn get_count(&self, node: NodeId) -> Option<u64>;
}

/// Resolved edge label `[start, end)` and target node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeSpan {
    pub start: usize,
    pub end: usize,
    pub target: NodeId,
}

impl EdgeSpan {
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Edge being traversed and how many of its tokens were consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActiveEdge {
    pub span: EdgeSpan,
    /// Always strictly between 0 and `span.len()`
    pub offset: usize,
}

/// Query position in a compact automaton
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CdawgPosition {
    /// Node the match last passed through
    pub node: NodeId,
    /// Set while the match ends inside an edge leaving `node`
    pub edge: Option<ActiveEdge>,
    /// Length of the longest matched suffix
    pub length: u64,
}

pub fn initial<G: CdawgGraph + ?Sized>(graph: &G) -> CdawgPosition {
    CdawgPosition {
        node: graph.source(),
        edge: None,
        length: 0,
    }
}

#[inline]
fn descend(node: NodeId, span: EdgeSpan, offset: usize, length: u64) -> CdawgPosition {
    if offset == span.len() {
        CdawgPosition {
            node: span.target,
            edge: None,
            length,
        }
    } else {
        CdawgPosition {
            node,
            edge: Some(ActiveEdge { span, offset }),
            length,
        }
    }
}

/// Follow `token`, falling back along suffix links until it matches
pub fn step<G: CdawgGraph + ?Sized>(graph: &G, position: CdawgPosition, token: Token) -> CdawgPosition {
    if token == EOS {
        return initial(graph);
    }

    let mut position = position;
    loop {
        match position.edge {
            None => {
                if let Some(span) = graph.edge(position.node, token as u64) {
                    return descend(position.node, span, 1, position.length + 1);
                }
                match graph.failure(position.node) {
                    Some(parent) => {
                        position = CdawgPosition {
                            node: parent,
                            edge: None,
                            length: graph.length(parent),
                        };
                    }
                    None => return initial(graph),
                }
            }
            Some(active) => {
                let next = active.span.start + active.offset;
                if graph.token(next) == token {
                    return descend(position.node, active.span, active.offset + 1, position.length + 1);
                }
                position = implicit_fail(graph, position.node, active.span.start, next);
            }
        }
    }
}

/// Replay `tokens[start..end]` from the suffix link of `node`.
///
/// From the source, which has no suffix link, the first token is dropped.
fn implicit_fail<G: CdawgGraph + ?Sized>(
    graph: &G,
    node: NodeId,
    mut start: usize,
    end: usize,
) -> CdawgPosition {
    let (mut node, mut length) = match graph.failure(node) {
        Some(parent) => (parent, graph.length(parent)),
        None => {
            start += 1;
            (graph.source(), 0)
        }
    };

    while start < end {
        let Some(span) = graph.edge(node, graph.token(start) as u64) else {
            return initial(graph);
        };
        let remaining = end - start;
        if span.len() > remaining {
            return CdawgPosition {
                node,
                edge: Some(ActiveEdge {
                    span,
                    offset: remaining,
                }),
                length: length + remaining as u64,
            };
        }
        start += span.len();
        length += span.len() as u64;
        node = span.target;
    }

    CdawgPosition {
        node,
        edge: None,
        length,
    }
}

/// Occurrences of the matched suffix
pub fn suffix_count<G: CdawgGraph + ?Sized>(graph: &G, position: &CdawgPosition) -> Option<u64> {
    match position.edge {
        Some(active) => graph.get_count(active.span.target),
        None => graph.get_count(position.node),
    }
}

fn continuations<G: CdawgGraph + ?Sized>(graph: &G, position: &CdawgPosition) -> Vec<(Token, u64)> {
    match position.edge {
        Some(active) => {
            let token = graph.token(active.span.start + active.offset);
            vec![(token, graph.get_count(active.span.target).unwrap_or(0))]
        }
        None => graph
            .edges(position.node)
            .iter()
            .map(|span| (graph.token(span.start), graph.get_count(span.target).unwrap_or(0)))
            .collect(),
    }
}

pub fn next_tokens<G: CdawgGraph + ?Sized>(graph: &G, position: &CdawgPosition, k: i64) -> Vec<NextToken> {
    if k == 0 {
        return Vec::new();
    }
    rank_continuations(suffix_count(graph, position), continuations(graph, position), k)
}

pub fn entropy<G: CdawgGraph + ?Sized>(graph: &G, position: &CdawgPosition) -> f64 {
    if position.edge.is_some() {
        return 0.0;
    }
    continuation_entropy(suffix_count(graph, position), continuations(graph, position))
}

pub fn arities<G: CdawgGraph + ?Sized>(graph: &G) -> Vec<usize> {
    reachable_arities(graph.num_nodes(), graph.source(), |node| {
        graph.edges(node).iter().map(|span| span.target).collect()
    })
}

macro_rules! impl_suffix_index {
    ($ty:ty) => {
        impl $crate::query::SuffixIndex for $ty {
            type Position = CdawgPosition;

            fn get_initial(&self) -> CdawgPosition {
                initial(self)
            }

            fn transition_and_count(&self, position: CdawgPosition, token: Token) -> CdawgPosition {
                step(self, position, token)
            }

            fn get_length(&self, position: CdawgPosition) -> u64 {
                position.length
            }

            fn get_suffix_count(&self, position: CdawgPosition) -> Option<u64> {
                suffix_count(self, &position)
            }

            fn get_entropy(&self, position: CdawgPosition) -> f64 {
                entropy(self, &position)
            }

            fn get_next_tokens(&self, position: CdawgPosition, k: i64) -> Vec<NextToken> {
                next_tokens(self, &position, k)
            }

            fn node_count(&self) -> usize {
                self.num_nodes()
            }

            fn edge_count(&self) -> usize {
                self.num_edges()
            }

            fn traverse_arities(&self) -> Vec<usize> {
                arities(self)
            }
        }
    };
}

impl_suffix_index!(crate::index::Cdawg);
impl_suffix_index!(crate::index::DiskCdawg);
