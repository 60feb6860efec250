//! Either kind of persisted index behind one handle

use crate::index::types::{IndexKind, IndexMeta, Token};
use crate::index::{DiskCdawg, DiskDawg};
use crate::query::{CdawgPosition, DawgPosition, NextToken, SuffixIndex};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A memory-mapped DAWG file or CDAWG directory
pub enum LoadedIndex {
    Dawg(DiskDawg),
    Cdawg(DiskCdawg),
}

/// Query position in a [`LoadedIndex`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AnyPosition {
    Dawg(DawgPosition),
    Cdawg(CdawgPosition),
}

impl LoadedIndex {
    /// Open `path`: a directory is a CDAWG, a file a DAWG
    pub fn open(path: &Path) -> Result<Self> {
        if path.is_dir() {
            Ok(Self::Cdawg(DiskCdawg::open_dir(path)?))
        } else if path.is_file() {
            Ok(Self::Dawg(DiskDawg::load(path)?))
        } else {
            bail!("No index found at {}", path.display());
        }
    }

    pub fn kind(&self) -> IndexKind {
        match self {
            Self::Dawg(_) => IndexKind::Dawg,
            Self::Cdawg(_) => IndexKind::Cdawg,
        }
    }

    pub fn has_counts(&self) -> bool {
        match self {
            Self::Dawg(dawg) => dawg.has_counts(),
            Self::Cdawg(cdawg) => cdawg.has_counts(),
        }
    }

    /// Descriptive metadata (CDAWG directories only)
    pub fn meta(&self) -> Option<&IndexMeta> {
        match self {
            Self::Dawg(_) => None,
            Self::Cdawg(cdawg) => cdawg.meta(),
        }
    }

    pub fn fill_counts_ram(&mut self) -> Result<()> {
        match self {
            Self::Dawg(dawg) => {
                dawg.fill_counts_ram();
                Ok(())
            }
            Self::Cdawg(cdawg) => cdawg.fill_counts_ram(),
        }
    }

    pub fn persist_counts(&mut self) -> Result<()> {
        match self {
            Self::Dawg(dawg) => dawg.persist_counts(),
            Self::Cdawg(cdawg) => cdawg.persist_counts(),
        }
    }
}

fn foreign(position: AnyPosition) -> ! {
    panic!("position {:?} belongs to a different kind of index", position)
}

impl SuffixIndex for LoadedIndex {
    type Position = AnyPosition;

    fn get_initial(&self) -> AnyPosition {
        match self {
            Self::Dawg(dawg) => AnyPosition::Dawg(dawg.get_initial()),
            Self::Cdawg(cdawg) => AnyPosition::Cdawg(cdawg.get_initial()),
        }
    }

    fn transition_and_count(&self, position: AnyPosition, token: Token) -> AnyPosition {
        match (self, position) {
            (Self::Dawg(dawg), AnyPosition::Dawg(p)) => {
                AnyPosition::Dawg(dawg.transition_and_count(p, token))
            }
            (Self::Cdawg(cdawg), AnyPosition::Cdawg(p)) => {
                AnyPosition::Cdawg(cdawg.transition_and_count(p, token))
            }
            _ => foreign(position),
        }
    }

    fn get_length(&self, position: AnyPosition) -> u64 {
        match (self, position) {
            (Self::Dawg(dawg), AnyPosition::Dawg(p)) => dawg.get_length(p),
            (Self::Cdawg(cdawg), AnyPosition::Cdawg(p)) => cdawg.get_length(p),
            _ => foreign(position),
        }
    }

    fn get_suffix_count(&self, position: AnyPosition) -> Option<u64> {
        match (self, position) {
            (Self::Dawg(dawg), AnyPosition::Dawg(p)) => dawg.get_suffix_count(p),
            (Self::Cdawg(cdawg), AnyPosition::Cdawg(p)) => cdawg.get_suffix_count(p),
            _ => foreign(position),
        }
    }

    fn get_entropy(&self, position: AnyPosition) -> f64 {
        match (self, position) {
            (Self::Dawg(dawg), AnyPosition::Dawg(p)) => dawg.get_entropy(p),
            (Self::Cdawg(cdawg), AnyPosition::Cdawg(p)) => cdawg.get_entropy(p),
            _ => foreign(position),
        }
    }

    fn get_next_tokens(&self, position: AnyPosition, k: i64) -> Vec<NextToken> {
        match (self, position) {
            (Self::Dawg(dawg), AnyPosition::Dawg(p)) => dawg.get_next_tokens(p, k),
            (Self::Cdawg(cdawg), AnyPosition::Cdawg(p)) => cdawg.get_next_tokens(p, k),
            _ => foreign(position),
        }
    }

    fn node_count(&self) -> usize {
        match self {
            Self::Dawg(dawg) => dawg.node_count(),
            Self::Cdawg(cdawg) => cdawg.node_count(),
        }
    }

    fn edge_count(&self) -> usize {
        match self {
            Self::Dawg(dawg) => dawg.edge_count(),
            Self::Cdawg(cdawg) => cdawg.edge_count(),
        }
    }

    fn traverse_arities(&self) -> Vec<usize> {
        match self {
            Self::Dawg(dawg) => dawg.traverse_arities(),
            Self::Cdawg(cdawg) => cdawg.traverse_arities(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Cdawg, Dawg, TokenStore};
    use tempfile::TempDir;

    #[test]
    fn test_open_detects_kind() {
        let temp = TempDir::new().unwrap();
        let store = TokenStore::from_tokens(vec![5, 6, 5]);

        let mut dawg = Dawg::build(&store);
        dawg.fill_counts();
        dawg.save(&temp.path().join("a.dawg")).unwrap();

        let mut cdawg = Cdawg::build(&store);
        cdawg.fill_counts();
        cdawg.save(&temp.path().join("a")).unwrap();

        let file = LoadedIndex::open(&temp.path().join("a.dawg")).unwrap();
        let dir = LoadedIndex::open(&temp.path().join("a")).unwrap();
        assert_eq!(file.kind(), IndexKind::Dawg);
        assert_eq!(dir.kind(), IndexKind::Cdawg);
        assert!(file.meta().is_none());
        assert_eq!(dir.meta().map(|m| m.token_count), Some(4));

        assert!(LoadedIndex::open(&temp.path().join("missing")).is_err());
    }

    #[test]
    #[should_panic(expected = "different kind")]
    fn test_foreign_position_panics() {
        let temp = TempDir::new().unwrap();
        let store = TokenStore::from_tokens(vec![5]);
        Dawg::build(&store).save(&temp.path().join("a.dawg")).unwrap();
        Cdawg::build(&store).save(&temp.path().join("a")).unwrap();

        let file = LoadedIndex::open(&temp.path().join("a.dawg")).unwrap();
        let dir = LoadedIndex::open(&temp.path().join("a")).unwrap();
        file.get_length(dir.get_initial());
    }
}
