#![no_main]

use libfuzzer_sys::fuzz_target;
use tokdawg::index::TokenStore;

fuzz_target!(|data: &[u8]| {
    // Arbitrary text must parse or fail cleanly, and parsed stores are sealed
    if let Ok(store) = TokenStore::parse_text(data) {
        assert!(store.is_sealed());
    }
});
