//! Query Façade
//!
//! Every automaton, in memory or memory-mapped, answers the same streaming
//! queries through [`SuffixIndex`]. All mutable query state lives in the
//! caller's position value; the index itself is only read, so one loaded
//! index can serve any number of concurrent readers.
//!
//! ```no_run
//! use tokdawg::index::{Cdawg, TokenStore};
//! use tokdawg::query::SuffixIndex;
//!
//! let store = TokenStore::from_tokens(vec![21, 34, 32]);
//! let mut cdawg = Cdawg::build(&store);
//! cdawg.fill_counts();
//!
//! let mut position = cdawg.get_initial();
//! for token in [21, 34] {
//!     position = cdawg.transition_and_count(position, token);
//!     println!("{} {:?}", cdawg.get_length(position), cdawg.get_suffix_count(position));
//! }
//! ```

pub mod cache;
pub mod cdawg;
pub mod dawg;
pub mod loaded;
pub mod verify;

pub use cache::CachedIndex;
pub use cdawg::{ActiveEdge, CdawgGraph, CdawgPosition, EdgeSpan};
pub use dawg::{DawgGraph, DawgPosition};
pub use loaded::{AnyPosition, LoadedIndex};
pub use verify::{compare_traces, Mismatch};

use crate::index::types::Token;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// A token observed after a matched context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextToken {
    pub token: Token,
    pub count: u64,
    /// `count` over the occurrences of the matched context
    pub probability: f64,
}

/// Which optional statistics [`SuffixIndex::trace`] collects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceOptions {
    #[serde(default)]
    pub entropies: bool,
    /// Top-k next tokens per position: negative for all, 0 for none
    #[serde(default)]
    pub next_tokens: Option<i64>,
}

/// Per-token results of streaming a query through an index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub lengths: Vec<u64>,
    /// `None` entries mean counts were never filled
    pub counts: Vec<Option<u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entropies: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_tokens: Option<Vec<Vec<NextToken>>>,
}

/// Streaming suffix queries shared by all automata
pub trait SuffixIndex {
    type Position: Copy + Eq + Hash + Debug;

    fn get_initial(&self) -> Self::Position;

    /// Consume one query token. Never fails: a token that matches nothing
    /// yields the initial position with length 0.
    fn transition_and_count(&self, position: Self::Position, token: Token) -> Self::Position;

    /// Length of the longest suffix of the query so far that occurs in the corpus
    fn get_length(&self, position: Self::Position) -> u64;

    /// Occurrences of that suffix, or `None` before counts are filled
    fn get_suffix_count(&self, position: Self::Position) -> Option<u64>;

    /// Shannon entropy (bits) of the next-token distribution
    fn get_entropy(&self, position: Self::Position) -> f64;

    /// Observed next tokens by decreasing count. `k < 0` returns all,
    /// `k == 0` none, `k > 0` at most `k`.
    fn get_next_tokens(&self, position: Self::Position, k: i64) -> Vec<NextToken>;

    fn node_count(&self) -> usize;
    fn edge_count(&self) -> usize;

    /// Out-degree of every node reachable from the initial one
    fn traverse_arities(&self) -> Vec<usize>;

    /// Longest corpus substring found anywhere in `tokens`
    fn get_max_factor_length(&self, tokens: &[Token]) -> u64 {
        let mut position = self.get_initial();
        let mut longest = 0;
        for &token in tokens {
            position = self.transition_and_count(position, token);
            longest = longest.max(self.get_length(position));
        }
        longest
    }

    fn trace(&self, tokens: &[Token], options: &TraceOptions) -> Trace {
        let mut trace = Trace {
            lengths: Vec::with_capacity(tokens.len()),
            counts: Vec::with_capacity(tokens.len()),
            entropies: options.entropies.then(Vec::new),
            next_tokens: options.next_tokens.map(|_| Vec::new()),
        };

        let mut position = self.get_initial();
        for &token in tokens {
            position = self.transition_and_count(position, token);
            trace.lengths.push(self.get_length(position));
            trace.counts.push(self.get_suffix_count(position));
            if let Some(entropies) = trace.entropies.as_mut() {
                entropies.push(self.get_entropy(position));
            }
            if let (Some(next), Some(k)) = (trace.next_tokens.as_mut(), options.next_tokens) {
                next.push(self.get_next_tokens(position, k));
            }
        }

        trace
    }
}

fn group_by_token<I>(outcomes: I) -> Vec<(Token, u64)>
where
    I: IntoIterator<Item = (Token, u64)>,
{
    let mut grouped: FxHashMap<Token, u64> = FxHashMap::default();
    for (token, count) in outcomes {
        *grouped.entry(token).or_insert(0) += count;
    }
    grouped.into_iter().filter(|&(_, count)| count > 0).collect()
}

/// Rank continuations by count, then token. Continuations sharing a token
/// (document ends) are merged.
pub(crate) fn rank_continuations<I>(total: Option<u64>, outcomes: I, k: i64) -> Vec<NextToken>
where
    I: IntoIterator<Item = (Token, u64)>,
{
    let total = match total {
        Some(total) if total > 0 && k != 0 => total,
        _ => return Vec::new(),
    };

    let mut grouped = group_by_token(outcomes);
    grouped.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    if k > 0 {
        grouped.truncate(k as usize);
    }

    grouped
        .into_iter()
        .map(|(token, count)| NextToken {
            token,
            count,
            probability: count as f64 / total as f64,
        })
        .collect()
}

/// Entropy in bits of the continuation distribution
pub(crate) fn continuation_entropy<I>(total: Option<u64>, outcomes: I) -> f64
where
    I: IntoIterator<Item = (Token, u64)>,
{
    let total = match total {
        Some(total) if total > 0 => total as f64,
        _ => return 0.0,
    };

    let grouped = group_by_token(outcomes);
    if grouped.len() <= 1 {
        return 0.0;
    }

    let mut entropy = 0.0;
    for (_, count) in grouped {
        let p = count as f64 / total;
        entropy -= p * p.log2();
    }
    entropy
}
