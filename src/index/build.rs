//! Index building
//!
//! Streams a token store through either automaton, records size snapshots
//! along the way and saves the result.

use crate::index::cdawg::Cdawg;
use crate::index::dawg::Dawg;
use crate::index::stats::BuildStats;
use crate::index::tokens::TokenStore;
use crate::index::types::IndexKind;
use crate::index::writer::CdawgWriter;
use crate::query::{CdawgGraph, DawgGraph};
use crate::utils::progress::{spinner, token_bar};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Progress bar updates happen once per this many tokens
const PROGRESS_STEP: u64 = 1 << 14;

/// Options for building an index from a token store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default)]
    pub kind: IndexKind,

    /// Fill occurrence counts before saving
    #[serde(default = "default_counts")]
    pub counts: bool,

    /// JSON-lines file receiving [`BuildStats`] snapshots
    #[serde(default)]
    pub stats_path: Option<PathBuf>,

    /// Tokens between snapshots. 0 writes only the final one.
    #[serde(default)]
    pub stats_interval: u64,

    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
}

fn default_counts() -> bool {
    true
}

fn default_show_progress() -> bool {
    true
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            kind: IndexKind::default(),
            counts: default_counts(),
            stats_path: None,
            stats_interval: 0,
            show_progress: default_show_progress(),
        }
    }
}

/// Online construction shared by both automata
trait Builder {
    fn push(&mut self, token: u32);
    fn size(&self) -> (u64, u64);
    fn finish(&mut self, counts: bool);
    fn save(&self, output: &Path, stats: &BuildStats) -> Result<()>;
}

impl Builder for Dawg {
    fn push(&mut self, token: u32) {
        self.extend(token);
    }

    fn size(&self) -> (u64, u64) {
        (self.num_states() as u64, self.num_transitions() as u64)
    }

    fn finish(&mut self, counts: bool) {
        if counts {
            self.fill_counts();
        }
    }

    fn save(&self, output: &Path, _stats: &BuildStats) -> Result<()> {
        Dawg::save(self, output)
    }
}

impl Builder for Cdawg {
    fn push(&mut self, token: u32) {
        self.extend(token);
    }

    fn size(&self) -> (u64, u64) {
        (self.num_nodes() as u64, self.num_edges() as u64)
    }

    fn finish(&mut self, counts: bool) {
        if counts {
            self.fill_counts();
        }
    }

    fn save(&self, output: &Path, stats: &BuildStats) -> Result<()> {
        CdawgWriter::write(output, self, Some(stats))
    }
}

/// Build an index of `config.kind` over `tokens` and save it to `output`
///
/// A DAWG is written as a single file, a CDAWG as a directory.
pub fn build_index(tokens: &TokenStore, output: &Path, config: &BuildConfig) -> Result<BuildStats> {
    if let Some(stats_path) = &config.stats_path {
        // Each build starts a fresh stats file
        if stats_path.exists() {
            fs::remove_file(stats_path).with_context(|| {
                format!("Failed to reset stats file {}", stats_path.display())
            })?;
        }
    }

    log::info!(
        "building {} over {} tokens ({} documents)",
        config.kind,
        tokens.len(),
        tokens.document_count()
    );

    match config.kind {
        IndexKind::Dawg => run(Dawg::with_capacity(tokens.len()), tokens, output, config),
        IndexKind::Cdawg => run(Cdawg::with_capacity(tokens.len()), tokens, output, config),
    }
}

fn run<B: Builder>(
    mut builder: B,
    tokens: &TokenStore,
    output: &Path,
    config: &BuildConfig,
) -> Result<BuildStats> {
    let started = Instant::now();

    let progress_bar = config
        .show_progress
        .then(|| token_bar(tokens.len() as u64, format!("Building {}", config.kind)));

    let snapshot = |builder: &B, n_tokens: u64| {
        let (n_nodes, n_edges) = builder.size();
        BuildStats {
            n_tokens,
            n_nodes,
            n_edges,
            elapsed_secs: started.elapsed().as_secs_f64(),
        }
    };

    for (i, &token) in tokens.as_slice().iter().enumerate() {
        builder.push(token);
        let done = i as u64 + 1;

        if config.stats_interval > 0 && done % config.stats_interval == 0 {
            if let Some(stats_path) = &config.stats_path {
                snapshot(&builder, done).append_to_jsonl(stats_path)?;
            }
        }
        if done % PROGRESS_STEP == 0 {
            if let Some(ref pb) = progress_bar {
                pb.inc(PROGRESS_STEP);
            }
        }
    }

    if let Some(pb) = progress_bar {
        pb.finish_with_message(format!("Indexed {} tokens", tokens.len()));
    }

    let finish_spinner = config.show_progress.then(|| {
        spinner(if config.counts {
            "Filling counts and saving..."
        } else {
            "Saving..."
        })
    });

    builder.finish(config.counts);
    let stats = snapshot(&builder, tokens.len() as u64);
    builder.save(output, &stats)?;

    if let Some(pb) = finish_spinner {
        pb.finish_with_message(format!("Index stored at {}", output.display()));
    }
    if let Some(stats_path) = &config.stats_path {
        stats.append_to_jsonl(stats_path)?;
    }

    log::info!(
        "built {} with {} nodes and {} edges in {:.2}s ({:.3} nodes/token, {:.3} edges/token)",
        config.kind,
        stats.n_nodes,
        stats.n_edges,
        stats.elapsed_secs,
        stats.nodes_per_token(),
        stats.edges_per_token()
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{LoadedIndex, SuffixIndex};
    use tempfile::TempDir;

    fn quiet(kind: IndexKind) -> BuildConfig {
        BuildConfig {
            kind,
            show_progress: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_build_config_defaults() {
        let config: BuildConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.kind, IndexKind::Cdawg);
        assert!(config.counts);
        assert!(config.stats_path.is_none());
    }

    #[test]
    fn test_build_both_kinds() {
        let temp = TempDir::new().unwrap();
        let tokens = TokenStore::from_documents([vec![1, 2, 1, 2], vec![2, 1]]);

        let dawg_path = temp.path().join("corpus.dawg");
        let cdawg_path = temp.path().join("corpus.cdawg");
        let dawg_stats = build_index(&tokens, &dawg_path, &quiet(IndexKind::Dawg)).unwrap();
        let cdawg_stats = build_index(&tokens, &cdawg_path, &quiet(IndexKind::Cdawg)).unwrap();

        assert!(dawg_path.is_file());
        assert!(cdawg_path.is_dir());
        assert_eq!(dawg_stats.n_tokens, 8);
        assert!(cdawg_stats.n_nodes <= dawg_stats.n_nodes);

        let dawg = LoadedIndex::open(&dawg_path).unwrap();
        let cdawg = LoadedIndex::open(&cdawg_path).unwrap();
        let query = [2, 1, 2, 2, 1];
        let options = Default::default();
        assert_eq!(dawg.trace(&query, &options), cdawg.trace(&query, &options));

        let meta = cdawg.meta().unwrap();
        assert_eq!(meta.build.as_ref(), Some(&cdawg_stats));
    }

    #[test]
    fn test_stats_snapshots() {
        let temp = TempDir::new().unwrap();
        let stats_path = temp.path().join("stats.jsonl");
        let tokens = TokenStore::from_tokens((0..9).collect());

        let config = BuildConfig {
            stats_path: Some(stats_path.clone()),
            stats_interval: 4,
            ..quiet(IndexKind::Cdawg)
        };
        build_index(&tokens, &temp.path().join("index"), &config).unwrap();
        // Rebuilding must not append to the previous run
        build_index(&tokens, &temp.path().join("index"), &config).unwrap();

        let snapshots: Vec<BuildStats> = fs::read_to_string(&stats_path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        let seen: Vec<u64> = snapshots.iter().map(|s| s.n_tokens).collect();
        assert_eq!(seen, vec![4, 8, 10]);
    }

    #[test]
    fn test_build_without_counts() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("corpus.dawg");
        let config = BuildConfig {
            counts: false,
            ..quiet(IndexKind::Dawg)
        };
        build_index(&TokenStore::from_tokens(vec![3, 3]), &path, &config).unwrap();

        let index = LoadedIndex::open(&path).unwrap();
        assert!(!index.has_counts());
        assert_eq!(index.get_suffix_count(index.get_initial()), None);
    }
}
