//! Token Store
//!
//! The corpus is one flat token sequence. Every document is followed by
//! [`EOS`], and a store is always sealed: its last token is `EOS`. Both
//! automata index the sealed sequence, so their root counts agree.
//!
//! ## File Format
//!
//! `tokens.bin` is a flat array of little-endian u32 tokens with no header,
//! so it can be mapped and indexed directly.

use crate::index::types::{edge_key, Token, EOS};
use crate::utils::read_u32;
use anyhow::{bail, Context, Result};
use memmap2::Mmap;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Random access to a token sequence, in memory or on disk
pub trait TokenSource {
    fn len(&self) -> usize;

    /// Token at `index`. Panics when out of range.
    fn token(&self, index: usize) -> Token;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Edge key of the token at `index`
    #[inline]
    fn key_at(&self, index: usize) -> u64 {
        edge_key(self.token(index), index)
    }
}

/// In-memory token sequence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenStore {
    tokens: Vec<Token>,
}

impl TokenStore {
    /// Empty, unsealed store for incremental document ingestion
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing sequence, appending `EOS` if it does not end with one
    pub fn from_tokens(mut tokens: Vec<Token>) -> Self {
        if tokens.last() != Some(&EOS) {
            tokens.push(EOS);
        }
        Self { tokens }
    }

    /// Build a store from documents, one `EOS` after each
    pub fn from_documents<I, D>(documents: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: AsRef<[Token]>,
    {
        let mut store = Self::new();
        for doc in documents {
            store.push_document(doc.as_ref());
        }
        store.seal();
        store
    }

    /// Append a document followed by `EOS`
    pub fn push_document(&mut self, document: &[Token]) {
        self.tokens.extend_from_slice(document);
        self.tokens.push(EOS);
    }

    /// Make sure the sequence ends with `EOS`
    pub fn seal(&mut self) {
        if self.tokens.last() != Some(&EOS) {
            self.tokens.push(EOS);
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.tokens.last() == Some(&EOS)
    }

    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of documents, i.e. `EOS` tokens
    pub fn document_count(&self) -> usize {
        self.tokens.iter().filter(|&&t| t == EOS).count()
    }

    /// Parse a text corpus: one document per line, whitespace-separated
    /// decimal token ids. Blank lines are skipped.
    pub fn parse_text(data: &[u8]) -> Result<Self> {
        let mut lines = Vec::new();
        let mut start = 0;
        for end in memchr::memchr_iter(b'\n', data) {
            lines.push(&data[start..end]);
            start = end + 1;
        }
        if start < data.len() {
            lines.push(&data[start..]);
        }

        let documents: Vec<Vec<Token>> = lines
            .par_iter()
            .enumerate()
            .map(|(i, line)| parse_line(line).with_context(|| format!("line {}", i + 1)))
            .collect::<Result<_>>()?;

        Ok(Self::from_documents(
            documents.iter().filter(|doc| !doc.is_empty()),
        ))
    }

    /// Read a text corpus from a file (see [`TokenStore::parse_text`])
    pub fn read_text(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open corpus {}", path.display()))?;
        if file.metadata()?.len() == 0 {
            return Ok(Self::from_tokens(Vec::new()));
        }
        let mmap = unsafe { Mmap::map(&file)? };
        Self::parse_text(&mmap).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Read a flat little-endian u32 token file, sealing it if needed
    pub fn read_raw(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read token file {}", path.display()))?;
        if data.len() % 4 != 0 {
            bail!(
                "Invalid token file {}: size {} is not a multiple of 4",
                path.display(),
                data.len()
            );
        }
        let tokens = data
            .chunks_exact(4)
            .map(|chunk| read_u32(chunk, 0))
            .collect();
        Ok(Self::from_tokens(tokens))
    }

    /// Write the sequence as a flat little-endian u32 token file
    pub fn write_raw(&self, path: &Path) -> Result<()> {
        write_tokens(path, &self.tokens)
    }
}

/// Write tokens as a flat little-endian u32 file
pub fn write_tokens(path: &Path, tokens: &[Token]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create token file {}", path.display()))?;
    let mut file = BufWriter::with_capacity(65536, file);
    for token in tokens {
        file.write_all(&token.to_le_bytes())?;
    }
    file.flush()?;
    Ok(())
}

impl TokenSource for TokenStore {
    fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    fn token(&self, index: usize) -> Token {
        self.tokens[index]
    }
}

impl TokenSource for [Token] {
    fn len(&self) -> usize {
        <[Token]>::len(self)
    }

    #[inline]
    fn token(&self, index: usize) -> Token {
        self[index]
    }
}

fn parse_line(line: &[u8]) -> Result<Vec<Token>> {
    let text = std::str::from_utf8(line).context("invalid UTF-8")?;
    text.split_ascii_whitespace()
        .map(|field| {
            let token: Token = field
                .parse()
                .with_context(|| format!("invalid token id {:?}", field))?;
            if token == EOS {
                bail!("token id {} is reserved for end of sequence", EOS);
            }
            Ok(token)
        })
        .collect()
}

/// Memory-mapped token file
pub struct MmapTokens {
    mmap: Mmap,
    len: usize,
}

impl MmapTokens {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open token file {}", path.display()))?;
        let size = file.metadata()?.len();
        if size == 0 {
            bail!("Invalid token file {}: file is empty", path.display());
        }
        if size % 4 != 0 {
            bail!(
                "Invalid token file {}: size {} is not a multiple of 4",
                path.display(),
                size
            );
        }

        let mmap = unsafe { Mmap::map(&file)? };
        let len = mmap.len() / 4;
        Ok(Self { mmap, len })
    }
}

impl TokenSource for MmapTokens {
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn token(&self, index: usize) -> Token {
        read_u32(&self.mmap, index * 4)
    }
}
