//! Cross-validation of two indexes over the same corpus

use crate::index::types::Token;
use crate::query::SuffixIndex;
use serde::Serialize;

/// First query position where two indexes disagree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    /// Index into the query
    pub index: usize,
    pub token: Token,
    pub left: (u64, Option<u64>),
    pub right: (u64, Option<u64>),
}

impl std::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "query token #{} ({}): length/count {:?} vs {:?}",
            self.index, self.token, self.left, self.right
        )
    }
}

/// Stream `tokens` through both indexes, comparing suffix length and count
/// after every token. Returns the first disagreement.
pub fn compare_traces<A, B>(left: &A, right: &B, tokens: &[Token]) -> Option<Mismatch>
where
    A: SuffixIndex + ?Sized,
    B: SuffixIndex + ?Sized,
{
    let mut a = left.get_initial();
    let mut b = right.get_initial();

    for (index, &token) in tokens.iter().enumerate() {
        a = left.transition_and_count(a, token);
        b = right.transition_and_count(b, token);

        let l = (left.get_length(a), left.get_suffix_count(a));
        let r = (right.get_length(b), right.get_suffix_count(b));
        if l != r {
            return Some(Mismatch {
                index,
                token,
                left: l,
                right: r,
            });
        }
    }

    None
}
