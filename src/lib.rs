//! # tokdawg - Suffix automaton indexes over tokenized corpora
//!
//! Builds a suffix automaton (DAWG) or a compact DAWG (CDAWG) over a corpus
//! of integer tokens and answers streaming queries: for every prefix of a
//! query, the longest suffix that occurs in the corpus, how often it occurs,
//! and which tokens followed it.
//!
//! ## Architecture
//!
//! - [`index`] - Token store, online construction, counts, on-disk formats
//! - [`query`] - The [`query::SuffixIndex`] façade shared by every automaton
//! - [`server`] - JSON-lines query server over a loaded index
//! - [`output`] - Colored trace printing
//! - [`utils`] - Configuration, byte encoding, progress bars
//!
//! ## Quick Start
//!
//! ```no_run
//! use tokdawg::index::{Cdawg, DiskCdawg, TokenStore};
//! use tokdawg::query::{SuffixIndex, TraceOptions};
//! use std::path::Path;
//!
//! let corpus = TokenStore::from_documents([vec![21, 34, 32], vec![21, 34, 40]]);
//! let mut cdawg = Cdawg::build(&corpus);
//! cdawg.fill_counts();
//! cdawg.save(Path::new("corpus.cdawg")).unwrap();
//!
//! let index = DiskCdawg::open_dir(Path::new("corpus.cdawg")).unwrap();
//! let trace = index.trace(&[7, 21, 34], &TraceOptions::default());
//! assert_eq!(trace.lengths, vec![0, 1, 2]);
//! assert_eq!(trace.counts[2], Some(2));
//! ```
//!
//! Counts are optional: an index built or loaded without them answers
//! lengths normally and reports counts as `None` until they are filled.

pub mod index;
pub mod output;
pub mod query;
pub mod server;
pub mod utils;
