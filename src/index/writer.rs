//! Index writers
//!
//! Lay automata out on disk in the fixed-record formats described in
//! [`crate::index::types`], ready to be memory-mapped by the readers.

use crate::index::cdawg::Cdawg;
use crate::index::dawg::Dawg;
use crate::index::stats::BuildStats;
use crate::index::tokens::write_tokens;
use crate::index::types::*;
use crate::query::{CdawgGraph, DawgGraph};
use anyhow::{bail, Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Writes a DAWG to a single file
pub struct DawgWriter;

impl DawgWriter {
    pub fn write(path: &Path, dawg: &Dawg) -> Result<()> {
        if !dawg.is_sealed() {
            bail!("Refusing to write an unsealed DAWG to {}; seal it first", path.display());
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = BufWriter::with_capacity(
            65536,
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        );

        let header = DawgHeader::new(
            dawg.num_states() as u64,
            dawg.num_transitions() as u64,
            dawg.initial_state() as u64,
            dawg.has_counts(),
        );
        header.write_to(&mut file)?;

        let mut first_edge = 0u64;
        for state in 0..dawg.num_states() {
            let degree = dawg.transitions(state).len();
            NodeRecord {
                first_edge,
                degree: degree as u32,
                flags: if dawg.is_clone(state) { NODE_FLAG_CLONE } else { 0 },
                failure: encode_node(dawg.failure(state)),
                length: dawg.length(state),
                count: dawg.get_count(state).unwrap_or(COUNT_UNSET),
            }
            .write_to(&mut file)?;
            first_edge += degree as u64;
        }

        for state in 0..dawg.num_states() {
            for (token, target) in dawg.transitions(state) {
                file.write_all(&token.to_le_bytes())?;
                file.write_all(&(target as u64).to_le_bytes())?;
            }
        }

        file.flush()?;
        log::info!(
            "wrote DAWG with {} states and {} transitions to {}",
            dawg.num_states(),
            dawg.num_transitions(),
            path.display()
        );
        Ok(())
    }
}

/// Writes a CDAWG directory
pub struct CdawgWriter;

impl CdawgWriter {
    /// Write all CDAWG files to `dir`
    ///
    /// Creates:
    /// - tokens.bin: The indexed text
    /// - cdawg.bin: Nodes and edge spans into tokens.bin
    /// - meta.json: Counts of everything, plus build statistics if given
    pub fn write(dir: &Path, cdawg: &Cdawg, build: Option<&BuildStats>) -> Result<()> {
        if !cdawg.is_sealed() {
            bail!("Refusing to write an unsealed CDAWG to {}; seal it first", dir.display());
        }
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create index directory {}", dir.display()))?;

        write_tokens(&dir.join(TOKENS_FILE), cdawg.tokens())?;
        Self::write_graph(&dir.join(GRAPH_FILE), cdawg)?;

        let meta = IndexMeta {
            version: FORMAT_VERSION,
            kind: IndexKind::Cdawg,
            token_count: cdawg.text_len() as u64,
            document_count: cdawg.tokens().iter().filter(|&&t| t == EOS).count() as u64,
            node_count: cdawg.num_nodes() as u64,
            edge_count: cdawg.num_edges() as u64,
            has_counts: cdawg.has_counts(),
            created_at: now_secs(),
            build: build.cloned(),
        };
        Self::write_meta(dir, &meta)?;

        log::info!(
            "wrote CDAWG with {} nodes and {} edges to {}",
            cdawg.num_nodes(),
            cdawg.num_edges(),
            dir.display()
        );
        Ok(())
    }

    fn write_graph(path: &Path, cdawg: &Cdawg) -> Result<()> {
        let mut file = BufWriter::with_capacity(65536, File::create(path)?);

        let header = CdawgHeader::new(
            cdawg.num_nodes() as u64,
            cdawg.num_edges() as u64,
            cdawg.source() as u64,
            cdawg.sink() as u64,
            cdawg.text_len() as u64,
            cdawg.has_counts(),
        );
        header.write_to(&mut file)?;

        let mut first_edge = 0u64;
        for node in 0..cdawg.num_nodes() {
            let degree = cdawg.edges(node).len();
            NodeRecord {
                first_edge,
                degree: degree as u32,
                flags: 0,
                failure: encode_node(cdawg.failure(node)),
                length: cdawg.length(node),
                count: cdawg.get_count(node).unwrap_or(COUNT_UNSET),
            }
            .write_to(&mut file)?;
            first_edge += degree as u64;
        }

        for node in 0..cdawg.num_nodes() {
            for span in cdawg.edges(node) {
                file.write_all(&(span.start as u64).to_le_bytes())?;
                file.write_all(&(span.end as u64).to_le_bytes())?;
                file.write_all(&(span.target as u64).to_le_bytes())?;
            }
        }

        file.flush()?;
        Ok(())
    }

    /// Write meta.json
    pub fn write_meta(dir: &Path, meta: &IndexMeta) -> Result<()> {
        let path = dir.join(META_FILE);
        let content = serde_json::to_string_pretty(meta)?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
