//! Protocol messages for the query server
//!
//! Newline-delimited JSON: one request per input line, one response per
//! output line. Lines longer than [`MAX_MESSAGE_SIZE`] are skipped and
//! reported as invalid data.

use crate::index::types::{IndexKind, Token};
use crate::query::Trace;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;

/// Largest accepted request line in bytes
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Request from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Stream tokens through the index
    Query {
        tokens: Vec<Token>,
        /// Include per-token entropies
        #[serde(default)]
        entropies: bool,
        /// Include per-token top-k next tokens (negative for all)
        #[serde(default)]
        next_tokens: Option<i64>,
    },

    /// Server health and stats
    Status,

    /// Graceful shutdown request
    Shutdown,

    /// Ping for connection testing
    Ping,
}

/// Response from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Query(QueryResponse),

    Status(StatusResponse),

    /// Shutdown acknowledged
    ShuttingDown,

    Pong,

    Error { message: String },
}

/// Per-token query results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(flatten)]
    pub trace: Trace,
    /// Time taken in milliseconds
    pub duration_ms: f64,
}

/// Server status response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub index_path: PathBuf,
    pub kind: IndexKind,
    pub node_count: usize,
    pub edge_count: usize,
    pub has_counts: bool,
    /// Server uptime in seconds
    pub uptime_secs: u64,
    pub queries_served: u64,
    /// Transition cache hit rate (0.0 - 1.0)
    pub cache_hit_rate: f32,
}

/// Write one message as a JSON line
pub fn write_message<W: Write>(writer: &mut W, msg: &impl Serialize) -> io::Result<()> {
    serde_json::to_writer(&mut *writer, msg)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writer.write_all(b"\n")?;
    writer.flush()
}

/// Read the next non-blank JSON line
///
/// Returns `Ok(None)` at end of input. Oversized or malformed lines are
/// consumed and reported as `InvalidData` so the caller can keep reading.
pub fn read_message<R: BufRead, T: DeserializeOwned>(reader: &mut R) -> io::Result<Option<T>> {
    loop {
        let mut buf = Vec::new();
        let read = reader
            .by_ref()
            .take(MAX_MESSAGE_SIZE as u64 + 1)
            .read_until(b'\n', &mut buf)?;
        if read == 0 {
            return Ok(None);
        }

        if buf.last() != Some(&b'\n') && buf.len() > MAX_MESSAGE_SIZE {
            skip_line(reader)?;
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Message too large (limit {} bytes)", MAX_MESSAGE_SIZE),
            ));
        }

        if buf.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        return serde_json::from_slice(&buf)
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e));
    }
}

/// Discard input up to and including the next newline
fn skip_line<R: BufRead>(reader: &mut R) -> io::Result<()> {
    loop {
        let (done, used) = {
            let available = reader.fill_buf()?;
            if available.is_empty() {
                return Ok(());
            }
            match memchr::memchr(b'\n', available) {
                Some(i) => (true, i + 1),
                None => (false, available.len()),
            }
        };
        reader.consume(used);
        if done {
            return Ok(());
        }
    }
}
