//! Occurrence counting
//!
//! Two passes, one per automaton shape:
//!
//! - [`propagate_suffix_counts`]: DAWG states. Every state created as the
//!   new `last` state starts at 1, clones and the initial state at 0. States
//!   are visited by decreasing length (suffix-link children before parents)
//!   and each count is added to its suffix-link parent.
//! - [`count_paths`]: CDAWG nodes. A node's count is the number of paths
//!   from it to the sink, i.e. the number of suffixes of the text that pass
//!   through it. Computed by an iterative DFS so deep graphs cannot overflow
//!   the call stack.

use crate::index::types::NodeId;

/// Accumulate counts up the suffix-link tree.
///
/// `counts` holds the initial per-state counts on entry and the final
/// occurrence counts on return.
pub fn propagate_suffix_counts(
    lengths: &[u64],
    failures: &[Option<NodeId>],
    counts: &mut [u64],
) {
    debug_assert_eq!(lengths.len(), failures.len());
    debug_assert_eq!(lengths.len(), counts.len());

    let Some(&max_length) = lengths.iter().max() else {
        return;
    };

    // Counting sort by length
    let mut buckets = vec![0usize; max_length as usize + 2];
    for &length in lengths {
        buckets[length as usize + 1] += 1;
    }
    for i in 1..buckets.len() {
        buckets[i] += buckets[i - 1];
    }
    let mut order = vec![0 as NodeId; lengths.len()];
    for (state, &length) in lengths.iter().enumerate() {
        let slot = &mut buckets[length as usize];
        order[*slot] = state;
        *slot += 1;
    }

    for &state in order.iter().rev() {
        if let Some(parent) = failures[state] {
            counts[parent] += counts[state];
        }
    }
}

enum Visit {
    Open(NodeId),
    Close(NodeId),
}

const UNSEEN: u8 = 0;
const OPENED: u8 = 1;
const DONE: u8 = 2;

/// Count source-to-leaf paths below every node reachable from `source`.
///
/// Leaves (nodes without out-edges) count 1. Unreachable nodes count 0.
pub fn count_paths<F>(node_count: usize, source: NodeId, mut targets: F) -> Vec<u64>
where
    F: FnMut(NodeId) -> Vec<NodeId>,
{
    let mut counts = vec![0u64; node_count];
    let mut state = vec![UNSEEN; node_count];
    let mut stack = vec![Visit::Open(source)];

    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Open(node) => {
                if state[node] != UNSEEN {
                    continue;
                }
                state[node] = OPENED;
                stack.push(Visit::Close(node));
                for target in targets(node) {
                    if state[target] == UNSEEN {
                        stack.push(Visit::Open(target));
                    }
                }
            }
            Visit::Close(node) => {
                let children = targets(node);
                counts[node] = if children.is_empty() {
                    1
                } else {
                    children.iter().map(|&child| counts[child]).sum()
                };
                state[node] = DONE;
            }
        }
    }

    counts
}

/// Out-degree of every node reachable from `source`, in DFS visit order
pub fn reachable_arities<F>(node_count: usize, source: NodeId, mut targets: F) -> Vec<usize>
where
    F: FnMut(NodeId) -> Vec<NodeId>,
{
    let mut visited = vec![false; node_count];
    let mut arities = Vec::new();
    let mut stack = vec![source];
    visited[source] = true;

    while let Some(node) = stack.pop() {
        let children = targets(node);
        arities.push(children.len());
        for child in children {
            if !visited[child] {
                visited[child] = true;
                stack.push(child);
            }
        }
    }

    arities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_propagate_chain() {
        // 0 <- 1 <- 2, lengths 0, 1, 2
        let lengths = [0, 1, 2];
        let failures = [None, Some(0), Some(1)];
        let mut counts = [0, 1, 1];
        propagate_suffix_counts(&lengths, &failures, &mut counts);
        assert_eq!(counts, [2, 2, 1]);
    }

    #[test]
    fn test_propagate_respects_length_order() {
        // State 1 is listed before its child 2 but must receive 2's count first
        let lengths = [0, 1, 3, 2];
        let failures = [None, Some(0), Some(1), Some(1)];
        let mut counts = [0, 0, 1, 1];
        propagate_suffix_counts(&lengths, &failures, &mut counts);
        assert_eq!(counts, [2, 2, 1, 1]);
    }

    #[test]
    fn test_count_paths_diamond() {
        // 0 -> {1, 2}, 1 -> 3, 2 -> 3, 2 -> 3 (parallel edges)
        let edges: Vec<Vec<NodeId>> = vec![vec![1, 2], vec![3], vec![3, 3], vec![]];
        let counts = count_paths(4, 0, |n| edges[n].clone());
        assert_eq!(counts, vec![3, 1, 2, 1]);
    }

    #[test]
    fn test_count_paths_deep_chain() {
        let n = 200_000;
        let counts = count_paths(n, 0, |i| if i + 1 < n { vec![i + 1] } else { vec![] });
        assert!(counts.iter().all(|&c| c == 1));
    }

    #[test]
    fn test_reachable_arities() {
        let edges: Vec<Vec<NodeId>> = vec![vec![1, 2], vec![2], vec![], vec![0]];
        let mut arities = reachable_arities(4, 0, |n| edges[n].clone());
        arities.sort();
        // Node 3 is unreachable
        assert_eq!(arities, vec![0, 1, 2]);
    }
}
