//! Suffix automaton (DAWG) construction
//!
//! States live in one arena and refer to each other by index. After the
//! first `i` tokens the automaton accepts exactly the suffixes of that
//! prefix; each state is a class of substrings sharing the same set of end
//! positions.
//!
//! Construction is online: [`Dawg::extend`] adds one token in amortized
//! constant time. Counts are filled by a separate pass
//! ([`Dawg::fill_counts`]) and read as `None` until then.

use crate::index::counter::propagate_suffix_counts;
use crate::index::tokens::TokenStore;
use crate::index::types::{NodeId, Token, EOS};
use crate::index::writer::DawgWriter;
use crate::query::dawg::DawgGraph;
use anyhow::Result;
use std::path::Path;

/// Id of the initial state
pub const DAWG_ROOT: NodeId = 0;

/// Starting counts for propagation: one per state created as `last`
pub(crate) fn initial_counts<I>(clone_flags: I, root: NodeId) -> Vec<u64>
where
    I: IntoIterator<Item = bool>,
{
    clone_flags
        .into_iter()
        .enumerate()
        .map(|(state, clone)| u64::from(state != root && !clone))
        .collect()
}

/// Outgoing transitions sorted by token
#[derive(Debug, Clone, Default)]
struct Transitions(Vec<(Token, NodeId)>);

impl Transitions {
    #[inline]
    fn get(&self, token: Token) -> Option<NodeId> {
        self.0
            .binary_search_by_key(&token, |&(t, _)| t)
            .ok()
            .map(|i| self.0[i].1)
    }

    /// Insert or redirect. Returns true if a new transition was added.
    fn set(&mut self, token: Token, target: NodeId) -> bool {
        match self.0.binary_search_by_key(&token, |&(t, _)| t) {
            Ok(i) => {
                self.0[i].1 = target;
                false
            }
            Err(i) => {
                self.0.insert(i, (token, target));
                true
            }
        }
    }
}

#[derive(Debug, Clone)]
struct State {
    length: u64,
    failure: Option<NodeId>,
    transitions: Transitions,
    cloned: bool,
}

/// In-memory suffix automaton
#[derive(Debug, Clone)]
pub struct Dawg {
    states: Vec<State>,
    last: NodeId,
    transition_count: usize,
    last_token: Option<Token>,
    counts: Option<Vec<u64>>,
}

impl Default for Dawg {
    fn default() -> Self {
        Self::new()
    }
}

impl Dawg {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Preallocate for a corpus of `tokens` tokens (at most 2n states)
    pub fn with_capacity(tokens: usize) -> Self {
        let mut states = Vec::with_capacity(2 * tokens + 1);
        states.push(State {
            length: 0,
            failure: None,
            transitions: Transitions::default(),
            cloned: false,
        });
        Self {
            states,
            last: DAWG_ROOT,
            transition_count: 0,
            last_token: None,
            counts: None,
        }
    }

    /// Build the automaton for a whole token store (counts not filled)
    pub fn build(tokens: &TokenStore) -> Self {
        let mut dawg = Self::with_capacity(tokens.len());
        for &token in tokens.as_slice() {
            dawg.extend(token);
        }
        dawg
    }

    fn push_state(&mut self, length: u64, failure: Option<NodeId>, cloned: bool) -> NodeId {
        let id = self.states.len();
        self.states.push(State {
            length,
            failure,
            transitions: Transitions::default(),
            cloned,
        });
        id
    }

    /// Append one token to the indexed text
    pub fn extend(&mut self, token: Token) {
        let last = self.last;
        let cur = self.push_state(self.states[last].length + 1, None, false);

        let mut walk = Some(last);
        let mut found = None;
        while let Some(state) = walk {
            if let Some(next) = self.states[state].transitions.get(token) {
                found = Some((state, next));
                break;
            }
            if self.states[state].transitions.set(token, cur) {
                self.transition_count += 1;
            }
            walk = self.states[state].failure;
        }

        match found {
            None => self.states[cur].failure = Some(DAWG_ROOT),
            Some((state, next)) if self.states[state].length + 1 == self.states[next].length => {
                self.states[cur].failure = Some(next);
            }
            Some((state, next)) => {
                let clone = self.push_state(
                    self.states[state].length + 1,
                    self.states[next].failure,
                    true,
                );
                let copied = self.states[next].transitions.clone();
                self.transition_count += copied.0.len();
                self.states[clone].transitions = copied;

                let mut redirect = Some(state);
                while let Some(r) = redirect {
                    if self.states[r].transitions.get(token) != Some(next) {
                        break;
                    }
                    self.states[r].transitions.set(token, clone);
                    redirect = self.states[r].failure;
                }

                self.states[next].failure = Some(clone);
                self.states[cur].failure = Some(clone);
            }
        }

        self.last = cur;
        self.last_token = Some(token);
        self.counts = None;
    }

    /// Seal the text with `EOS` (if needed) and compute occurrence counts.
    /// Calling it again without further construction is a no-op.
    pub fn fill_counts(&mut self) {
        if self.counts.is_some() {
            return;
        }
        self.seal();

        let lengths: Vec<u64> = self.states.iter().map(|s| s.length).collect();
        let failures: Vec<Option<NodeId>> = self.states.iter().map(|s| s.failure).collect();
        let mut counts = initial_counts(self.states.iter().map(|s| s.cloned), DAWG_ROOT);
        propagate_suffix_counts(&lengths, &failures, &mut counts);

        self.counts = Some(counts);
        log::debug!("filled counts for {} DAWG states", self.states.len());
    }

    /// Append `EOS` unless the text already ends with it
    pub fn seal(&mut self) {
        if !self.is_sealed() {
            self.extend(EOS);
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.last_token == Some(EOS)
    }

    pub fn has_counts(&self) -> bool {
        self.counts.is_some()
    }

    /// Whether `state` was created by cloning during construction
    pub fn is_clone(&self, state: NodeId) -> bool {
        self.states[state].cloned
    }

    /// State reached by the whole text so far
    pub fn last_state(&self) -> NodeId {
        self.last
    }

    /// Save as a single `.dawg` file. The text must be sealed.
    pub fn save(&self, path: &Path) -> Result<()> {
        DawgWriter::write(path, self)
    }
}

impl DawgGraph for Dawg {
    fn initial_state(&self) -> NodeId {
        DAWG_ROOT
    }

    fn num_states(&self) -> usize {
        self.states.len()
    }

    fn num_transitions(&self) -> usize {
        self.transition_count
    }

    fn length(&self, state: NodeId) -> u64 {
        self.states[state].length
    }

    fn failure(&self, state: NodeId) -> Option<NodeId> {
        self.states[state].failure
    }

    fn transition(&self, state: NodeId, token: Token) -> Option<NodeId> {
        self.states[state].transitions.get(token)
    }

    fn transitions(&self, state: NodeId) -> Vec<(Token, NodeId)> {
        self.states[state].transitions.0.clone()
    }

    fn get_count(&self, state: NodeId) -> Option<u64> {
        self.counts.as_ref().map(|counts| counts[state])
    }
}
