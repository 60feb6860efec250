//! Build statistics and index summaries
//!
//! [`BuildStats`] snapshots are appended as JSON lines while an index is
//! built; [`show_stats`] prints what a saved index holds.

use crate::query::{LoadedIndex, SuffixIndex};
use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Size of an automaton after `n_tokens` tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildStats {
    pub n_tokens: u64,
    pub n_nodes: u64,
    pub n_edges: u64,
    pub elapsed_secs: f64,
}

impl BuildStats {
    pub fn nodes_per_token(&self) -> f64 {
        ratio(self.n_nodes, self.n_tokens)
    }

    pub fn edges_per_token(&self) -> f64 {
        ratio(self.n_edges, self.n_tokens)
    }

    /// Append this snapshot as one JSON line
    pub fn append_to_jsonl(&self, path: &Path) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open stats file {}", path.display()))?;
        let line = serde_json::to_string(self)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

fn ratio(a: u64, b: u64) -> f64 {
    if b == 0 { 0.0 } else { a as f64 / b as f64 }
}

/// Histogram of out-degrees, sorted by arity
pub fn arity_census(arities: &[usize]) -> Vec<(usize, usize)> {
    let mut census: FxHashMap<usize, usize> = FxHashMap::default();
    for &arity in arities {
        *census.entry(arity).or_insert(0) += 1;
    }
    let mut sorted: Vec<_> = census.into_iter().collect();
    sorted.sort_unstable();
    sorted
}

/// Display index statistics
pub fn show_stats(path: &Path) -> Result<()> {
    let index = LoadedIndex::open(path)?;

    println!("Index Statistics");
    println!("================");
    println!();
    println!("Index location:   {}", path.display());
    println!("Index kind:       {}", index.kind());
    println!("Nodes:            {}", index.node_count());
    println!("Edges:            {}", index.edge_count());
    println!("Counts filled:    {}", if index.has_counts() { "yes" } else { "no" });

    if let Some(meta) = index.meta() {
        println!("Tokens:           {}", meta.token_count);
        println!("Documents:        {}", meta.document_count);
        if meta.token_count > 0 {
            println!(
                "Nodes per token:  {:.3}",
                meta.node_count as f64 / meta.token_count as f64
            );
            println!(
                "Edges per token:  {:.3}",
                meta.edge_count as f64 / meta.token_count as f64
            );
        }
        if let Some(build) = &meta.build {
            println!("Build time:       {:.2}s", build.elapsed_secs);
        }
        println!();
        println!("Created:          {}", format_timestamp(meta.created_at));
    }

    if let Ok(size) = path_size(path) {
        println!();
        println!("Index size:       {}", format_size(size));
    }

    Ok(())
}

/// Size of a file, or of all files directly inside a directory
fn path_size(path: &Path) -> std::io::Result<u64> {
    if path.is_file() {
        return Ok(fs::metadata(path)?.len());
    }
    let mut size = 0;
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        if entry.path().is_file() {
            size += entry.metadata()?.len();
        }
    }
    Ok(size)
}

/// Format byte size to human readable
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Unix seconds as a UTC date and time
fn format_timestamp(ts: u64) -> String {
    let days = (ts / 86_400) as i64;
    let secs = ts % 86_400;

    // Civil date from days since 1970-01-01, in 400-year eras starting in March
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);

    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02} UTC",
        year,
        month,
        day,
        secs / 3600,
        secs / 60 % 60,
        secs % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
        assert_eq!(format_timestamp(951_782_400), "2000-02-29 00:00:00 UTC");
        assert_eq!(format_timestamp(1_700_000_000), "2023-11-14 22:13:20 UTC");
    }

    #[test]
    fn test_ratios() {
        let stats = BuildStats {
            n_tokens: 4,
            n_nodes: 6,
            n_edges: 9,
            elapsed_secs: 0.5,
        };
        assert_eq!(stats.nodes_per_token(), 1.5);
        assert_eq!(stats.edges_per_token(), 2.25);

        let empty = BuildStats {
            n_tokens: 0,
            n_nodes: 1,
            n_edges: 0,
            elapsed_secs: 0.0,
        };
        assert_eq!(empty.nodes_per_token(), 0.0);
    }

    #[test]
    fn test_append_to_jsonl() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("stats.jsonl");

        for n in 1..=3 {
            BuildStats {
                n_tokens: n,
                n_nodes: n + 1,
                n_edges: n,
                elapsed_secs: 0.0,
            }
            .append_to_jsonl(&path)
            .unwrap();
        }

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<BuildStats> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2].n_nodes, 4);
    }

    #[test]
    fn test_arity_census() {
        assert_eq!(arity_census(&[2, 0, 2, 1, 0, 2]), vec![(0, 2), (1, 1), (2, 3)]);
        assert!(arity_census(&[]).is_empty());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }
}
