//! Index construction, persistence and loading
//!
//! - [`tokens`] - The corpus as one sealed token sequence
//! - [`dawg`] / [`cdawg`] - Online construction of both automata
//! - [`counter`] - Occurrence count propagation and graph traversals
//! - [`writer`] / [`reader`] - Fixed-record binary files, memory-mapped on load
//! - [`build`] - Corpus to saved index, with progress and build statistics
//! - [`stats`] - Build statistics and index summaries

pub mod build;
pub mod cdawg;
pub mod counter;
pub mod dawg;
pub mod reader;
pub mod stats;
pub mod tokens;
pub mod types;
pub mod writer;

pub use cdawg::Cdawg;
pub use dawg::Dawg;
pub use reader::{CdawgReader, DawgReader, DiskCdawg, DiskDawg};
pub use tokens::{MmapTokens, TokenSource, TokenStore};
pub use types::*;
pub use writer::{CdawgWriter, DawgWriter};
