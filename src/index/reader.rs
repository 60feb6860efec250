//! Index readers
//!
//! Memory-mapped access to persisted automata. Nothing is deserialized up
//! front: node and edge records are decoded on demand from the map, and
//! transitions are found by binary search inside a node's edge range, so
//! indexes larger than RAM stay queryable.
//!
//! Loading makes one pass over the records and rejects any file whose edge
//! ranges, targets, suffix links or spans fall outside the graph, so a
//! loaded index never indexes out of bounds.
//!
//! Counts stored as `COUNT_UNSET` read as `None`. [`DiskDawg::fill_counts_ram`]
//! and [`DiskCdawg::fill_counts_ram`] compute them into an in-memory overlay,
//! which `persist_counts` can write back into the graph file.

use crate::index::counter::{count_paths, propagate_suffix_counts};
use crate::index::dawg::initial_counts;
use crate::index::tokens::{MmapTokens, TokenSource};
use crate::index::types::*;
use crate::query::{CdawgGraph, DawgGraph, EdgeSpan};
use crate::utils::{read_u32, read_u64, write_u32, write_u64};
use anyhow::{bail, Context, Result};
use memmap2::{Mmap, MmapMut};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

fn map_file(path: &Path) -> Result<Mmap> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    if file.metadata()?.len() == 0 {
        bail!("Invalid index file {}: file is empty", path.display());
    }
    Ok(unsafe { Mmap::map(&file)? })
}

/// Write counts into the node table of a graph file and set the counts flag
fn write_counts(path: &Path, flags_offset: usize, nodes_offset: usize, counts: &[u64]) -> Result<()> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .with_context(|| format!("Failed to open {} for writing", path.display()))?;
    let mut mmap = unsafe { MmapMut::map_mut(&file)? };

    for (node, &count) in counts.iter().enumerate() {
        let offset = nodes_offset + node * NodeRecord::SIZE + NodeRecord::COUNT_OFFSET;
        write_u64(&mut mmap, offset, count);
    }
    let flags = read_u32(&mmap, flags_offset) | FLAG_COUNTS;
    write_u32(&mut mmap, flags_offset, flags);

    mmap.flush()?;
    Ok(())
}

/// Memory-mapped suffix automaton (single `.dawg` file)
pub struct DawgReader {
    mmap: Mmap,
    header: DawgHeader,
    path: PathBuf,
    counts: Option<Vec<u64>>,
}

/// Memory-mapped DAWG handle
pub type DiskDawg = DawgReader;

impl DawgReader {
    /// Open a `.dawg` file
    pub fn load(path: &Path) -> Result<Self> {
        let mmap = map_file(path)?;
        let header = DawgHeader::parse(&mmap)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        log::debug!(
            "mapped DAWG {} ({} states, {} transitions)",
            path.display(),
            header.node_count,
            header.edge_count
        );

        let reader = Self {
            mmap,
            header,
            path: path.to_path_buf(),
            counts: None,
        };
        reader
            .validate()
            .with_context(|| format!("Failed to load {}", path.display()))?;
        Ok(reader)
    }

    /// Check that every record refers to states and transitions that exist.
    /// Suffix links must shorten and transitions must lengthen, so no walk
    /// over the graph can cycle.
    fn validate(&self) -> Result<()> {
        let n = self.header.node_count;
        for state in 0..n as usize {
            let record = self.node(state);
            let end = record.first_edge.checked_add(record.degree as u64);
            if end.is_none_or(|end| end > self.header.edge_count) {
                bail!("Invalid DAWG file: transitions of state {} out of range", state);
            }
            if let Some(failure) = decode_node(record.failure) {
                if failure as u64 >= n || self.node(failure).length >= record.length {
                    bail!("Invalid DAWG file: bad suffix link {} -> {}", state, failure);
                }
            }
            for edge in record.first_edge..record.first_edge + record.degree as u64 {
                let (token, target) = self.edge_at(edge);
                if target as u64 >= n || self.node(target).length <= record.length {
                    bail!(
                        "Invalid DAWG file: transition of state {} on {} to bad target {}",
                        state,
                        token,
                        target
                    );
                }
            }
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &DawgHeader {
        &self.header
    }

    pub fn has_counts(&self) -> bool {
        self.counts.is_some() || self.header.has_counts()
    }

    #[inline]
    fn node(&self, state: NodeId) -> NodeRecord {
        assert!(
            (state as u64) < self.header.node_count,
            "state {} out of range",
            state
        );
        NodeRecord::read(&self.mmap, DawgHeader::SIZE + state * NodeRecord::SIZE)
    }

    #[inline]
    fn edges_offset(&self) -> usize {
        DawgHeader::SIZE + self.header.node_count as usize * NodeRecord::SIZE
    }

    #[inline]
    fn edge_at(&self, edge: u64) -> (Token, NodeId) {
        let offset = self.edges_offset() + edge as usize * DawgEdgeRecord::SIZE;
        (
            read_u32(&self.mmap, offset),
            read_u64(&self.mmap, offset + 4) as NodeId,
        )
    }

    /// Compute counts in memory from the stored clone flags
    pub fn fill_counts_ram(&mut self) {
        let n = self.header.node_count as usize;
        let records: Vec<NodeRecord> = (0..n).map(|state| self.node(state)).collect();

        let lengths: Vec<u64> = records.iter().map(|r| r.length).collect();
        let failures: Vec<Option<NodeId>> = records.iter().map(|r| decode_node(r.failure)).collect();
        let mut counts = initial_counts(
            records.iter().map(|r| r.flags & NODE_FLAG_CLONE != 0),
            self.header.initial as NodeId,
        );
        propagate_suffix_counts(&lengths, &failures, &mut counts);

        self.counts = Some(counts);
        log::info!("computed counts for {} DAWG states in memory", n);
    }

    /// Store the in-memory counts in the file
    pub fn persist_counts(&mut self) -> Result<()> {
        let Some(counts) = self.counts.as_ref() else {
            bail!("No counts in memory; run fill_counts_ram first");
        };
        write_counts(&self.path, 32, DawgHeader::SIZE, counts)?;

        let counts = self.counts.take();
        *self = Self::load(&self.path)?;
        self.counts = counts;
        Ok(())
    }
}

impl DawgGraph for DawgReader {
    fn initial_state(&self) -> NodeId {
        self.header.initial as NodeId
    }

    fn num_states(&self) -> usize {
        self.header.node_count as usize
    }

    fn num_transitions(&self) -> usize {
        self.header.edge_count as usize
    }

    fn length(&self, state: NodeId) -> u64 {
        self.node(state).length
    }

    fn failure(&self, state: NodeId) -> Option<NodeId> {
        decode_node(self.node(state).failure)
    }

    fn transition(&self, state: NodeId, token: Token) -> Option<NodeId> {
        let record = self.node(state);
        let (mut lo, mut hi) = (record.first_edge, record.first_edge + record.degree as u64);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let (key, target) = self.edge_at(mid);
            match key.cmp(&token) {
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
                std::cmp::Ordering::Equal => return Some(target),
            }
        }
        None
    }

    fn transitions(&self, state: NodeId) -> Vec<(Token, NodeId)> {
        let record = self.node(state);
        (record.first_edge..record.first_edge + record.degree as u64)
            .map(|edge| self.edge_at(edge))
            .collect()
    }

    fn get_count(&self, state: NodeId) -> Option<u64> {
        match &self.counts {
            Some(counts) => Some(counts[state]),
            None => decode_count(self.node(state).count),
        }
    }
}

/// Memory-mapped compact automaton plus its token file
pub struct CdawgReader {
    graph: Mmap,
    tokens: MmapTokens,
    header: CdawgHeader,
    graph_path: PathBuf,
    token_path: PathBuf,
    meta: Option<IndexMeta>,
    counts: Option<Vec<u64>>,
}

/// Memory-mapped CDAWG handle
pub type DiskCdawg = CdawgReader;

impl CdawgReader {
    /// Open a graph file and the token file its spans refer to
    pub fn load(token_path: &Path, graph_path: &Path) -> Result<Self> {
        let graph = map_file(graph_path)?;
        let header = CdawgHeader::parse(&graph)
            .with_context(|| format!("Failed to load {}", graph_path.display()))?;
        let tokens = MmapTokens::open(token_path)?;

        if tokens.len() as u64 != header.token_count {
            bail!(
                "Token file {} holds {} tokens but {} expects {}",
                token_path.display(),
                tokens.len(),
                graph_path.display(),
                header.token_count
            );
        }
        log::debug!(
            "mapped CDAWG {} ({} nodes, {} edges, {} tokens)",
            graph_path.display(),
            header.node_count,
            header.edge_count,
            header.token_count
        );

        let reader = Self {
            graph,
            tokens,
            header,
            graph_path: graph_path.to_path_buf(),
            token_path: token_path.to_path_buf(),
            meta: None,
            counts: None,
        };
        reader
            .validate()
            .with_context(|| format!("Failed to load {}", graph_path.display()))?;
        Ok(reader)
    }

    /// Check that every record refers to nodes, edges and tokens that exist.
    /// Suffix links must shorten and an edge target must be at least as long
    /// as its source plus the span.
    fn validate(&self) -> Result<()> {
        let n = self.header.node_count;
        for node in 0..n as usize {
            let record = self.node(node);
            let end = record.first_edge.checked_add(record.degree as u64);
            if end.is_none_or(|end| end > self.header.edge_count) {
                bail!("Invalid cdawg.bin: edges of node {} out of range", node);
            }
            if let Some(failure) = decode_node(record.failure) {
                if failure as u64 >= n || self.node(failure).length >= record.length {
                    bail!("Invalid cdawg.bin: bad suffix link {} -> {}", node, failure);
                }
            }
            for edge in record.first_edge..record.first_edge + record.degree as u64 {
                let span = self.edge_at(edge);
                if span.start >= span.end || span.end as u64 > self.header.token_count {
                    bail!(
                        "Invalid cdawg.bin: edge {} of node {} spans [{}, {}) outside {} tokens",
                        edge,
                        node,
                        span.start,
                        span.end,
                        self.header.token_count
                    );
                }
                let reach = record.length.saturating_add(span.len() as u64);
                if span.target as u64 >= n || self.node(span.target).length < reach {
                    bail!(
                        "Invalid cdawg.bin: edge {} of node {} has bad target {}",
                        edge,
                        node,
                        span.target
                    );
                }
            }
        }
        Ok(())
    }

    /// Open a directory written by [`crate::index::CdawgWriter`]
    pub fn open_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            bail!("No CDAWG index at {}", dir.display());
        }

        let mut reader = Self::load(&dir.join(TOKENS_FILE), &dir.join(GRAPH_FILE))?;

        let meta_path = dir.join(META_FILE);
        if meta_path.exists() {
            let content = fs::read_to_string(&meta_path)
                .with_context(|| format!("Failed to read {}", meta_path.display()))?;
            let meta: IndexMeta = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", meta_path.display()))?;
            if meta.kind != IndexKind::Cdawg || meta.token_count != reader.header.token_count {
                bail!(
                    "{} does not describe the CDAWG in {}",
                    meta_path.display(),
                    dir.display()
                );
            }
            reader.meta = Some(meta);
        }

        Ok(reader)
    }

    pub fn header(&self) -> &CdawgHeader {
        &self.header
    }

    pub fn meta(&self) -> Option<&IndexMeta> {
        self.meta.as_ref()
    }

    pub fn graph_path(&self) -> &Path {
        &self.graph_path
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    pub fn has_counts(&self) -> bool {
        self.counts.is_some() || self.header.has_counts()
    }

    #[inline]
    fn node(&self, node: NodeId) -> NodeRecord {
        assert!(
            (node as u64) < self.header.node_count,
            "node {} out of range",
            node
        );
        NodeRecord::read(&self.graph, CdawgHeader::SIZE + node * NodeRecord::SIZE)
    }

    #[inline]
    fn edge_at(&self, edge: u64) -> EdgeSpan {
        let offset = CdawgHeader::SIZE
            + self.header.node_count as usize * NodeRecord::SIZE
            + edge as usize * CdawgEdgeRecord::SIZE;
        EdgeSpan {
            start: read_u64(&self.graph, offset) as usize,
            end: read_u64(&self.graph, offset + 8) as usize,
            target: read_u64(&self.graph, offset + 16) as NodeId,
        }
    }

    fn targets(&self, node: NodeId) -> Vec<NodeId> {
        let record = self.node(node);
        (record.first_edge..record.first_edge + record.degree as u64)
            .map(|edge| self.edge_at(edge).target)
            .collect()
    }

    /// Count suffix occurrences in memory.
    ///
    /// Paths to the sink only count occurrences when the text ends with
    /// `EOS`, so an unsealed token file is an error.
    pub fn fill_counts_ram(&mut self) -> Result<()> {
        let len = self.tokens.len();
        if len == 0 || self.tokens.token(len - 1) != EOS {
            bail!(
                "Cannot count occurrences: {} does not end with EOS",
                self.token_path.display()
            );
        }

        let n = self.header.node_count as usize;
        let counts = count_paths(n, self.header.source as NodeId, |node| self.targets(node));
        self.counts = Some(counts);
        log::info!("computed counts for {} CDAWG nodes in memory", n);
        Ok(())
    }

    /// Store the in-memory counts in cdawg.bin (and meta.json if present)
    pub fn persist_counts(&mut self) -> Result<()> {
        let Some(counts) = self.counts.as_ref() else {
            bail!("No counts in memory; run fill_counts_ram first");
        };
        write_counts(&self.graph_path, 48, CdawgHeader::SIZE, counts)?;

        let counts = self.counts.take();
        let meta = self.meta.take();
        *self = Self::load(&self.token_path, &self.graph_path)?;
        self.counts = counts;

        if let Some(mut meta) = meta {
            meta.has_counts = true;
            if let Some(dir) = self.graph_path.parent() {
                crate::index::writer::CdawgWriter::write_meta(dir, &meta)?;
            }
            self.meta = Some(meta);
        }
        Ok(())
    }
}

impl CdawgGraph for CdawgReader {
    fn source(&self) -> NodeId {
        self.header.source as NodeId
    }

    fn sink(&self) -> NodeId {
        self.header.sink as NodeId
    }

    fn num_nodes(&self) -> usize {
        self.header.node_count as usize
    }

    fn num_edges(&self) -> usize {
        self.header.edge_count as usize
    }

    fn length(&self, node: NodeId) -> u64 {
        self.node(node).length
    }

    fn failure(&self, node: NodeId) -> Option<NodeId> {
        decode_node(self.node(node).failure)
    }

    fn token(&self, index: usize) -> Token {
        self.tokens.token(index)
    }

    fn text_len(&self) -> usize {
        self.tokens.len()
    }

    fn edge(&self, node: NodeId, key: u64) -> Option<EdgeSpan> {
        let record = self.node(node);
        let (mut lo, mut hi) = (record.first_edge, record.first_edge + record.degree as u64);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let span = self.edge_at(mid);
            match self.tokens.key_at(span.start).cmp(&key) {
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
                std::cmp::Ordering::Equal => return Some(span),
            }
        }
        None
    }

    fn edges(&self, node: NodeId) -> Vec<EdgeSpan> {
        let record = self.node(node);
        (record.first_edge..record.first_edge + record.degree as u64)
            .map(|edge| self.edge_at(edge))
            .collect()
    }

    fn get_count(&self, node: NodeId) -> Option<u64> {
        match &self.counts {
            Some(counts) => Some(counts[node]),
            None => decode_count(self.node(node).count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Cdawg, Dawg, TokenStore};
    use crate::query::SuffixIndex;
    use tempfile::TempDir;

    fn corpus() -> TokenStore {
        TokenStore::from_documents([vec![1, 2, 3, 1, 2], vec![2, 3, 3, 1], vec![4]])
    }

    #[test]
    fn test_dawg_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("corpus.dawg");

        let mut dawg = Dawg::build(&corpus());
        dawg.fill_counts();
        dawg.save(&path).unwrap();

        let disk = DiskDawg::load(&path).unwrap();
        assert_eq!(disk.node_count(), dawg.node_count());
        assert_eq!(disk.edge_count(), dawg.edge_count());
        for state in 0..dawg.num_states() {
            assert_eq!(disk.length(state), dawg.length(state));
            assert_eq!(disk.failure(state), dawg.failure(state));
            assert_eq!(disk.transitions(state), dawg.transitions(state));
            assert_eq!(disk.get_count(state), dawg.get_count(state));
        }
    }

    #[test]
    fn test_dawg_fill_counts_ram() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("corpus.dawg");

        let mut dawg = Dawg::build(&corpus());
        dawg.save(&path).unwrap();
        dawg.fill_counts();

        let mut disk = DiskDawg::load(&path).unwrap();
        assert!(!disk.has_counts());
        assert_eq!(disk.get_count(0), None);

        disk.fill_counts_ram();
        for state in 0..dawg.num_states() {
            assert_eq!(disk.get_count(state), dawg.get_count(state));
        }

        disk.persist_counts().unwrap();
        let reopened = DiskDawg::load(&path).unwrap();
        assert!(reopened.header().has_counts());
        assert_eq!(reopened.get_count(0), Some(corpus().len() as u64));
    }

    #[test]
    fn test_cdawg_round_trip() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("index");

        let mut cdawg = Cdawg::build(&corpus());
        cdawg.fill_counts();
        cdawg.save(&dir).unwrap();

        let disk = DiskCdawg::open_dir(&dir).unwrap();
        assert!(disk.meta().is_some());
        assert_eq!(disk.node_count(), cdawg.node_count());
        for node in 0..cdawg.num_nodes() {
            assert_eq!(disk.length(node), cdawg.length(node));
            assert_eq!(disk.failure(node), cdawg.failure(node));
            assert_eq!(disk.edges(node), cdawg.edges(node));
            assert_eq!(disk.get_count(node), cdawg.get_count(node));
        }

        let query = [2, 3, 3, 1, 2, 3, 9, 1];
        assert_eq!(
            disk.trace(&query, &Default::default()),
            cdawg.trace(&query, &Default::default())
        );
    }

    #[test]
    fn test_cdawg_fill_counts_ram_and_persist() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("index");

        let mut cdawg = Cdawg::build(&corpus());
        cdawg.save(&dir).unwrap();
        cdawg.fill_counts();

        let mut disk = DiskCdawg::load(&dir.join(TOKENS_FILE), &dir.join(GRAPH_FILE)).unwrap();
        assert_eq!(disk.get_count(disk.source()), None);

        disk.fill_counts_ram().unwrap();
        for node in 0..cdawg.num_nodes() {
            assert_eq!(disk.get_count(node), cdawg.get_count(node));
        }
        disk.persist_counts().unwrap();

        let reopened = DiskCdawg::open_dir(&dir).unwrap();
        assert!(reopened.header().has_counts());
        assert!(reopened.meta().is_some_and(|m| m.has_counts));
        assert_eq!(reopened.get_count(reopened.source()), Some(corpus().len() as u64));
    }

    #[test]
    fn test_load_failures_are_errors() {
        let temp = TempDir::new().unwrap();

        assert!(DiskDawg::load(&temp.path().join("missing.dawg")).is_err());
        assert!(DiskCdawg::open_dir(&temp.path().join("missing")).is_err());

        let bogus = temp.path().join("bogus.dawg");
        fs::write(&bogus, b"definitely not an automaton file").unwrap();
        assert!(DiskDawg::load(&bogus).is_err());

        // Token file that does not match the graph
        let dir = temp.path().join("index");
        let mut cdawg = Cdawg::build(&corpus());
        cdawg.fill_counts();
        cdawg.save(&dir).unwrap();
        TokenStore::from_tokens(vec![1, 2]).write_raw(&dir.join(TOKENS_FILE)).unwrap();
        let err = DiskCdawg::open_dir(&dir).err().unwrap();
        assert!(err.to_string().contains("tokens"), "{}", err);
    }

    /// Overwrite one u64 field of a saved file and try to load it
    fn corrupt(path: &Path, offset: usize, value: u64) -> Vec<u8> {
        let original = fs::read(path).unwrap();
        let mut bytes = original.clone();
        write_u64(&mut bytes, offset, value);
        fs::write(path, &bytes).unwrap();
        original
    }

    #[test]
    fn test_corrupt_records_are_load_errors() {
        let temp = TempDir::new().unwrap();

        let path = temp.path().join("corpus.dawg");
        let mut dawg = Dawg::build(&corpus());
        dawg.fill_counts();
        dawg.save(&path).unwrap();
        let nodes = DawgHeader::SIZE;
        let edges = nodes + dawg.num_states() * NodeRecord::SIZE;

        for (offset, value) in [
            // first_edge of the initial state
            (nodes, 1 << 40),
            // suffix link of state 1
            (nodes + NodeRecord::SIZE + 16, 1 << 40),
            // suffix link of state 1 pointing at itself
            (nodes + NodeRecord::SIZE + 16, 1),
            // target of the last transition
            (edges + (dawg.num_transitions() - 1) * DawgEdgeRecord::SIZE + 4, 1 << 40),
        ] {
            let original = corrupt(&path, offset, value);
            assert!(DiskDawg::load(&path).is_err(), "offset {} = {}", offset, value);
            fs::write(&path, original).unwrap();
        }
        assert!(DiskDawg::load(&path).is_ok());

        let dir = temp.path().join("index");
        let mut cdawg = Cdawg::build(&corpus());
        cdawg.fill_counts();
        cdawg.save(&dir).unwrap();
        let graph = dir.join(GRAPH_FILE);
        let nodes = CdawgHeader::SIZE;
        let edges = nodes + cdawg.num_nodes() * NodeRecord::SIZE;
        let last_edge = edges + (cdawg.num_edges() - 1) * CdawgEdgeRecord::SIZE;

        for (offset, value) in [
            (last_edge + 16, 1 << 40),
            // span end past the token file
            (edges + 8, corpus().len() as u64 + 1),
            // empty span
            (edges + 8, 0),
            (nodes + NodeRecord::SIZE * (cdawg.num_nodes() - 1), u64::MAX),
        ] {
            let original = corrupt(&graph, offset, value);
            let err = DiskCdawg::open_dir(&dir).err();
            assert!(err.is_some(), "offset {} = {}", offset, value);
            fs::write(&graph, original).unwrap();
        }
        let disk = DiskCdawg::open_dir(&dir).unwrap();
        assert_eq!(disk.traverse_arities(), cdawg.traverse_arities());
    }

    #[test]
    fn test_unsealed_automata_are_not_saved() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("online");

        let mut cdawg = Cdawg::new();
        let mut dawg = Dawg::new();
        for token in [1, 2, 1] {
            cdawg.extend(token);
            dawg.extend(token);
        }
        assert!(cdawg.save(&dir).is_err());
        assert!(dawg.save(&temp.path().join("online.dawg")).is_err());

        cdawg.seal();
        dawg.seal();
        cdawg.save(&dir).unwrap();
        dawg.save(&temp.path().join("online.dawg")).unwrap();

        let mut disk_cdawg = DiskCdawg::open_dir(&dir).unwrap();
        let mut disk_dawg = DiskDawg::load(&temp.path().join("online.dawg")).unwrap();
        disk_cdawg.fill_counts_ram().unwrap();
        disk_dawg.fill_counts_ram();

        let one = disk_cdawg.transition_and_count(disk_cdawg.get_initial(), 1);
        assert_eq!(disk_cdawg.get_length(one), 1);
        assert_eq!(disk_cdawg.get_suffix_count(one), Some(2));
        assert_eq!(disk_cdawg.get_suffix_count(disk_cdawg.get_initial()), Some(4));

        let one = disk_dawg.transition_and_count(disk_dawg.get_initial(), 1);
        assert_eq!(disk_dawg.get_suffix_count(one), Some(2));
        assert_eq!(disk_dawg.get_suffix_count(disk_dawg.get_initial()), Some(4));
    }

    #[test]
    fn test_unsealed_token_file_cannot_be_counted() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("index");
        let cdawg = Cdawg::build(&TokenStore::from_tokens(vec![1, 2, 1]));
        cdawg.save(&dir).unwrap();

        // Same length, so the graph still loads, but no trailing EOS
        crate::index::tokens::write_tokens(&dir.join(TOKENS_FILE), &[1, 2, 1, 3]).unwrap();
        let mut disk = DiskCdawg::open_dir(&dir).unwrap();
        let err = disk.fill_counts_ram().err().unwrap();
        assert!(err.to_string().contains("EOS"), "{}", err);
        assert!(!disk.has_counts());
    }
}
