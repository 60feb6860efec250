#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tokdawg::index::{Cdawg, Dawg, TokenStore};
use tokdawg::query::{compare_traces, SuffixIndex};

#[derive(Arbitrary, Debug)]
struct Input {
    documents: Vec<Vec<u8>>,
    query: Vec<u8>,
}

fuzz_target!(|input: Input| {
    // Small alphabets force deep repetition structure
    let documents: Vec<Vec<u32>> = input
        .documents
        .iter()
        .map(|doc| doc.iter().map(|&b| (b % 8) as u32).collect())
        .collect();
    let query: Vec<u32> = input.query.iter().map(|&b| (b % 9) as u32).collect();

    let store = TokenStore::from_documents(&documents);
    let mut dawg = Dawg::build(&store);
    let mut cdawg = Cdawg::build(&store);
    dawg.fill_counts();
    cdawg.fill_counts();

    if let Some(mismatch) = compare_traces(&dawg, &cdawg, &query) {
        panic!("automata disagree on {:?}: {}", query, mismatch);
    }
    assert_eq!(
        dawg.get_suffix_count(dawg.get_initial()),
        cdawg.get_suffix_count(cdawg.get_initial())
    );
});
