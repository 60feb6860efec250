//! Suffix automaton queries

use crate::index::counter::reachable_arities;
use crate::index::types::{NodeId, Token, EOS};
use crate::query::{continuation_entropy, rank_continuations, NextToken};
use serde::{Deserialize, Serialize};

/// Read access to a suffix automaton, in memory or memory-mapped
pub trait DawgGraph {
    fn initial_state(&self) -> NodeId;
    fn num_states(&self) -> usize;
    fn num_transitions(&self) -> usize;
    fn length(&self, state: NodeId) -> u64;
    fn failure(&self, state: NodeId) -> Option<NodeId>;
    fn transition(&self, state: NodeId, token: Token) -> Option<NodeId>;

    /// Outgoing transitions sorted by token
    fn transitions(&self, state: NodeId) -> Vec<(Token, NodeId)>;

    /// Occurrence count of the strings in `state`, or `None` before counts
    /// are filled
    fn get_count(&self, state: NodeId) -> Option<u64>;
}

/// Query position in a suffix automaton
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DawgPosition {
    pub state: NodeId,
    /// Length of the longest matched suffix
    pub length: u64,
}

pub fn initial<G: DawgGraph + ?Sized>(graph: &G) -> DawgPosition {
    DawgPosition {
        state: graph.initial_state(),
        length: 0,
    }
}

/// Follow `token`, shrinking to suffix-link parents until it matches
pub fn step<G: DawgGraph + ?Sized>(graph: &G, position: DawgPosition, token: Token) -> DawgPosition {
    if token == EOS {
        return initial(graph);
    }

    let DawgPosition { mut state, mut length } = position;
    loop {
        if let Some(next) = graph.transition(state, token) {
            return DawgPosition {
                state: next,
                length: length + 1,
            };
        }
        match graph.failure(state) {
            Some(parent) => {
                state = parent;
                length = graph.length(parent);
            }
            None => return initial(graph),
        }
    }
}

fn continuations<G: DawgGraph + ?Sized>(graph: &G, state: NodeId) -> Vec<(Token, u64)> {
    graph
        .transitions(state)
        .into_iter()
        .map(|(token, target)| (token, graph.get_count(target).unwrap_or(0)))
        .collect()
}

pub fn next_tokens<G: DawgGraph + ?Sized>(graph: &G, position: &DawgPosition, k: i64) -> Vec<NextToken> {
    if k == 0 {
        return Vec::new();
    }
    rank_continuations(
        graph.get_count(position.state),
        continuations(graph, position.state),
        k,
    )
}

pub fn entropy<G: DawgGraph + ?Sized>(graph: &G, position: &DawgPosition) -> f64 {
    continuation_entropy(
        graph.get_count(position.state),
        continuations(graph, position.state),
    )
}

pub fn arities<G: DawgGraph + ?Sized>(graph: &G) -> Vec<usize> {
    reachable_arities(graph.num_states(), graph.initial_state(), |state| {
        graph.transitions(state).into_iter().map(|(_, target)| target).collect()
    })
}

macro_rules! impl_suffix_index {
    ($ty:ty) => {
        impl $crate::query::SuffixIndex for $ty {
            type Position = DawgPosition;

            fn get_initial(&self) -> DawgPosition {
                initial(self)
            }

            fn transition_and_count(&self, position: DawgPosition, token: Token) -> DawgPosition {
                step(self, position, token)
            }

            fn get_length(&self, position: DawgPosition) -> u64 {
                position.length
            }

            fn get_suffix_count(&self, position: DawgPosition) -> Option<u64> {
                self.get_count(position.state)
            }

            fn get_entropy(&self, position: DawgPosition) -> f64 {
                entropy(self, &position)
            }

            fn get_next_tokens(&self, position: DawgPosition, k: i64) -> Vec<NextToken> {
                next_tokens(self, &position, k)
            }

            fn node_count(&self) -> usize {
                self.num_states()
            }

            fn edge_count(&self) -> usize {
                self.num_transitions()
            }

            fn traverse_arities(&self) -> Vec<usize> {
                arities(self)
            }
        }
    };
}

impl_suffix_index!(crate::index::Dawg);
impl_suffix_index!(crate::index::DiskDawg);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Dawg, TokenStore};
    use crate::query::SuffixIndex;

    fn counted(tokens: &[Token]) -> Dawg {
        let mut dawg = Dawg::build(&TokenStore::from_tokens(tokens.to_vec()));
        dawg.fill_counts();
        dawg
    }

    #[test]
    fn test_failure_shrinks_length() {
        let dawg = counted(&[1, 2, 3, 2, 4]);
        let mut position = dawg.get_initial();
        for token in [1, 2, 4] {
            position = dawg.transition_and_count(position, token);
        }
        // "1 2 4" does not occur, "2 4" does
        assert_eq!(position.length, 2);
        assert_eq!(dawg.get_suffix_count(position), Some(1));
    }

    #[test]
    fn test_root_count_is_text_length() {
        let dawg = counted(&[3, 3, 3]);
        let initial = dawg.get_initial();
        assert_eq!(dawg.get_suffix_count(initial), Some(4));

        let next = dawg.get_next_tokens(initial, -1);
        assert_eq!(next[0].token, 3);
        assert_eq!(next[0].count, 3);
        assert_eq!(next[1].token, EOS);
    }

    #[test]
    fn test_entropy_two_equal_successors() {
        let dawg = counted(&[8, 1, 8, 2]);
        let position = dawg.transition_and_count(dawg.get_initial(), 8);
        assert!((dawg.get_entropy(position) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_max_factor_length() {
        let dawg = counted(&[1, 2, 3, 4, 1, 2]);
        assert_eq!(dawg.get_max_factor_length(&[9, 2, 3, 4, 9, 1]), 3);
        assert_eq!(dawg.get_max_factor_length(&[]), 0);
    }
}
