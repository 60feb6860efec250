//! Core types for automaton indexes
//!
//! Shared by the in-memory automata, their on-disk formats and the query layer.
//!
//! ## File Format
//!
//! All integers are little-endian. Records are fixed size so the reader can
//! address any node or edge directly inside the memory map.
//!
//! ```text
//! <name>.dawg                   cdawg.bin
//! +------------------+          +------------------+
//! | DawgHeader  (36) |          | CdawgHeader (52) |
//! | NodeRecord  (40) |  x N     | NodeRecord  (40) |  x N
//! | DawgEdge    (12) |  x E     | CdawgEdge   (24) |  x E
//! +------------------+          +------------------+
//! ```
//!
//! A compact automaton lives in a directory next to `tokens.bin` (the flat
//! token array its edge spans point into) and `meta.json`.

use crate::index::stats::BuildStats;
use crate::utils::{read_u32, read_u64};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Integer token id
pub type Token = u32;

/// Reserved end-of-sequence token; closes every document in a token store
pub const EOS: Token = u32::MAX;

/// Dense index of a state or node inside an automaton arena
pub type NodeId = usize;

/// On-disk count value meaning "not computed"
pub const COUNT_UNSET: u64 = u64::MAX;

/// On-disk failure value for a node without a suffix link
pub const NO_NODE: u64 = u64::MAX;

/// End marker of an edge that still grows with the text
pub const OPEN_END: usize = usize::MAX;

/// Keys at or above this value identify a single EOS occurrence
pub const EOS_KEY_BASE: u64 = 1 << 32;

/// Magic number for DAWG files
pub const DAWG_MAGIC: u32 = 0x57414454; // "TDAW" in little-endian

/// Magic number for CDAWG graph files
pub const CDAWG_MAGIC: u32 = 0x57444354; // "TCDW" in little-endian

/// Current version of both binary formats
pub const FORMAT_VERSION: u32 = 1;

/// Header flag: node records carry computed counts
pub const FLAG_COUNTS: u32 = 1;

/// Node flag: state was created as a clone during DAWG construction
pub const NODE_FLAG_CLONE: u32 = 1;

/// File names inside a CDAWG directory
pub const TOKENS_FILE: &str = "tokens.bin";
pub const GRAPH_FILE: &str = "cdawg.bin";
pub const META_FILE: &str = "meta.json";

/// Key an out-edge is sorted and searched by.
///
/// Ordinary tokens are their own key. Each EOS occurrence is a distinct
/// symbol, so document ends never merge across documents.
#[inline]
pub fn edge_key(token: Token, position: usize) -> u64 {
    if token == EOS {
        EOS_KEY_BASE + position as u64
    } else {
        token as u64
    }
}

/// Which automaton an index holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Dawg,
    #[default]
    Cdawg,
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexKind::Dawg => write!(f, "dawg"),
            IndexKind::Cdawg => write!(f, "cdawg"),
        }
    }
}

/// Index metadata stored in meta.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    pub version: u32,
    pub kind: IndexKind,
    pub token_count: u64,
    pub document_count: u64,
    pub node_count: u64,
    pub edge_count: u64,
    pub has_counts: bool,
    pub created_at: u64,
    #[serde(default)]
    pub build: Option<BuildStats>,
}

/// Header for DAWG files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DawgHeader {
    pub magic: u32,
    pub version: u32,
    pub node_count: u64,
    pub edge_count: u64,
    pub initial: u64,
    pub flags: u32,
}

impl DawgHeader {
    /// Size of header in bytes
    pub const SIZE: usize = 4 + 4 + 8 + 8 + 8 + 4; // 36 bytes

    pub fn new(node_count: u64, edge_count: u64, initial: u64, has_counts: bool) -> Self {
        Self {
            magic: DAWG_MAGIC,
            version: FORMAT_VERSION,
            node_count,
            edge_count,
            initial,
            flags: if has_counts { FLAG_COUNTS } else { 0 },
        }
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_all(&self.magic.to_le_bytes())?;
        out.write_all(&self.version.to_le_bytes())?;
        out.write_all(&self.node_count.to_le_bytes())?;
        out.write_all(&self.edge_count.to_le_bytes())?;
        out.write_all(&self.initial.to_le_bytes())?;
        out.write_all(&self.flags.to_le_bytes())
    }

    /// Parse and validate a header against the size of the whole file
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            bail!("Invalid DAWG file: file too small");
        }

        let header = Self {
            magic: read_u32(data, 0),
            version: read_u32(data, 4),
            node_count: read_u64(data, 8),
            edge_count: read_u64(data, 16),
            initial: read_u64(data, 24),
            flags: read_u32(data, 32),
        };

        if header.magic != DAWG_MAGIC {
            bail!("Invalid DAWG file: bad magic number");
        }
        if header.version != FORMAT_VERSION {
            bail!("Unsupported DAWG file version: {}", header.version);
        }

        let expected = (Self::SIZE as u128)
            + header.node_count as u128 * NodeRecord::SIZE as u128
            + header.edge_count as u128 * DawgEdgeRecord::SIZE as u128;
        if expected != data.len() as u128 {
            bail!(
                "Invalid DAWG file: expected {} bytes for {} states and {} transitions, found {}",
                expected,
                header.node_count,
                header.edge_count,
                data.len()
            );
        }
        if header.initial >= header.node_count {
            bail!("Invalid DAWG file: initial state {} out of range", header.initial);
        }

        Ok(header)
    }

    pub fn has_counts(&self) -> bool {
        self.flags & FLAG_COUNTS != 0
    }
}

/// Header for cdawg.bin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CdawgHeader {
    pub magic: u32,
    pub version: u32,
    pub node_count: u64,
    pub edge_count: u64,
    pub source: u64,
    pub sink: u64,
    /// Length of the token file the edge spans refer to
    pub token_count: u64,
    pub flags: u32,
}

impl CdawgHeader {
    /// Size of header in bytes
    pub const SIZE: usize = 4 + 4 + 8 + 8 + 8 + 8 + 8 + 4; // 52 bytes

    pub fn new(
        node_count: u64,
        edge_count: u64,
        source: u64,
        sink: u64,
        token_count: u64,
        has_counts: bool,
    ) -> Self {
        Self {
            magic: CDAWG_MAGIC,
            version: FORMAT_VERSION,
            node_count,
            edge_count,
            source,
            sink,
            token_count,
            flags: if has_counts { FLAG_COUNTS } else { 0 },
        }
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_all(&self.magic.to_le_bytes())?;
        out.write_all(&self.version.to_le_bytes())?;
        out.write_all(&self.node_count.to_le_bytes())?;
        out.write_all(&self.edge_count.to_le_bytes())?;
        out.write_all(&self.source.to_le_bytes())?;
        out.write_all(&self.sink.to_le_bytes())?;
        out.write_all(&self.token_count.to_le_bytes())?;
        out.write_all(&self.flags.to_le_bytes())
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            bail!("Invalid cdawg.bin: file too small");
        }

        let header = Self {
            magic: read_u32(data, 0),
            version: read_u32(data, 4),
            node_count: read_u64(data, 8),
            edge_count: read_u64(data, 16),
            source: read_u64(data, 24),
            sink: read_u64(data, 32),
            token_count: read_u64(data, 40),
            flags: read_u32(data, 48),
        };

        if header.magic != CDAWG_MAGIC {
            bail!("Invalid cdawg.bin: bad magic number");
        }
        if header.version != FORMAT_VERSION {
            bail!("Unsupported cdawg.bin version: {}", header.version);
        }

        let expected = (Self::SIZE as u128)
            + header.node_count as u128 * NodeRecord::SIZE as u128
            + header.edge_count as u128 * CdawgEdgeRecord::SIZE as u128;
        if expected != data.len() as u128 {
            bail!(
                "Invalid cdawg.bin: expected {} bytes for {} nodes and {} edges, found {}",
                expected,
                header.node_count,
                header.edge_count,
                data.len()
            );
        }
        if header.source >= header.node_count || header.sink >= header.node_count {
            bail!("Invalid cdawg.bin: source or sink out of range");
        }

        Ok(header)
    }

    pub fn has_counts(&self) -> bool {
        self.flags & FLAG_COUNTS != 0
    }
}

/// Fixed-size node record shared by both graph formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRecord {
    /// Index of the first out-edge in the edge table
    pub first_edge: u64,
    pub degree: u32,
    pub flags: u32,
    /// Suffix link, or NO_NODE
    pub failure: u64,
    pub length: u64,
    /// Occurrence count, or COUNT_UNSET
    pub count: u64,
}

impl NodeRecord {
    /// Size of each record in bytes
    pub const SIZE: usize = 8 + 4 + 4 + 8 + 8 + 8; // 40 bytes

    /// Byte offset of the count field within a record
    pub const COUNT_OFFSET: usize = 32;

    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_all(&self.first_edge.to_le_bytes())?;
        out.write_all(&self.degree.to_le_bytes())?;
        out.write_all(&self.flags.to_le_bytes())?;
        out.write_all(&self.failure.to_le_bytes())?;
        out.write_all(&self.length.to_le_bytes())?;
        out.write_all(&self.count.to_le_bytes())
    }

    #[inline]
    pub fn read(data: &[u8], offset: usize) -> Self {
        Self {
            first_edge: read_u64(data, offset),
            degree: read_u32(data, offset + 8),
            flags: read_u32(data, offset + 12),
            failure: read_u64(data, offset + 16),
            length: read_u64(data, offset + 24),
            count: read_u64(data, offset + 32),
        }
    }
}

/// DAWG transition record: token and target state
#[derive(Debug, Clone, Copy)]
pub struct DawgEdgeRecord;

impl DawgEdgeRecord {
    pub const SIZE: usize = 4 + 8; // 12 bytes
}

/// CDAWG edge record: token span `[start, end)` and target node
#[derive(Debug, Clone, Copy)]
pub struct CdawgEdgeRecord;

impl CdawgEdgeRecord {
    pub const SIZE: usize = 8 + 8 + 8; // 24 bytes
}

#[inline]
pub(crate) fn encode_node(id: Option<NodeId>) -> u64 {
    id.map(|n| n as u64).unwrap_or(NO_NODE)
}

#[inline]
pub(crate) fn decode_node(raw: u64) -> Option<NodeId> {
    if raw == NO_NODE { None } else { Some(raw as NodeId) }
}

#[inline]
pub(crate) fn decode_count(raw: u64) -> Option<u64> {
    if raw == COUNT_UNSET { None } else { Some(raw) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eos_keys_are_per_position() {
        assert_eq!(edge_key(7, 3), 7);
        assert_eq!(edge_key(7, 9), 7);
        assert_ne!(edge_key(EOS, 3), edge_key(EOS, 9));
        assert!(edge_key(EOS, 0) > edge_key(u32::MAX - 1, 0));
    }

    #[test]
    fn test_dawg_header_round_trip() {
        let header = DawgHeader::new(2, 1, 0, true);
        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), DawgHeader::SIZE);

        buf.resize(DawgHeader::SIZE + 2 * NodeRecord::SIZE + DawgEdgeRecord::SIZE, 0);
        let parsed = DawgHeader::parse(&buf).unwrap();
        assert_eq!(parsed, header);
        assert!(parsed.has_counts());
    }

    #[test]
    fn test_header_rejects_bad_magic_and_size() {
        let header = CdawgHeader::new(2, 0, 0, 1, 3, false);
        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), CdawgHeader::SIZE);

        // Truncated node table
        assert!(CdawgHeader::parse(&buf).is_err());

        buf.resize(CdawgHeader::SIZE + 2 * NodeRecord::SIZE, 0);
        assert!(CdawgHeader::parse(&buf).is_ok());

        buf[0] ^= 0xff;
        let err = CdawgHeader::parse(&buf).unwrap_err();
        assert!(err.to_string().contains("bad magic"));
    }

    #[test]
    fn test_node_record_layout() {
        let record = NodeRecord {
            first_edge: 5,
            degree: 2,
            flags: NODE_FLAG_CLONE,
            failure: NO_NODE,
            length: 9,
            count: 4,
        };
        let mut buf = Vec::new();
        record.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), NodeRecord::SIZE);
        assert_eq!(NodeRecord::read(&buf, 0), record);
        assert_eq!(read_u64(&buf, NodeRecord::COUNT_OFFSET), 4);
    }
}
