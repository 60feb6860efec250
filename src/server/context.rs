//! Application context
//!
//! Everything a request handler needs, opened once at startup: the loaded
//! index behind its transition cache, the configuration and serving stats.

use crate::query::{CachedIndex, LoadedIndex, SuffixIndex, TraceOptions};
use crate::server::protocol::{QueryResponse, Request, Response, StatusResponse};
use crate::utils::AppConfig;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

pub struct AppContext {
    index: CachedIndex<LoadedIndex>,
    index_path: PathBuf,
    config: AppConfig,
    start_time: Instant,
    queries_served: AtomicU64,
}

impl AppContext {
    pub fn open(index_path: &Path, config: AppConfig) -> Result<Self> {
        let index = LoadedIndex::open(index_path)?;
        if !index.has_counts() {
            log::warn!(
                "{} has no counts; suffix counts will be null until `fill-counts` is run",
                index_path.display()
            );
        }
        log::info!(
            "serving {} index {} ({} nodes, {} edges)",
            index.kind(),
            index_path.display(),
            index.node_count(),
            index.edge_count()
        );

        Ok(Self {
            index: CachedIndex::new(index, config.cache_size),
            index_path: index_path.to_path_buf(),
            config,
            start_time: Instant::now(),
            queries_served: AtomicU64::new(0),
        })
    }

    pub fn index(&self) -> &CachedIndex<LoadedIndex> {
        &self.index
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Answer one request
    pub fn handle(&self, request: Request) -> Response {
        match request {
            Request::Query {
                tokens,
                entropies,
                next_tokens,
            } => {
                let start = Instant::now();
                let options = TraceOptions {
                    entropies,
                    next_tokens,
                };
                let trace = self.index.trace(&tokens, &options);
                self.queries_served.fetch_add(1, Ordering::Relaxed);
                Response::Query(QueryResponse {
                    trace,
                    duration_ms: start.elapsed().as_secs_f64() * 1000.0,
                })
            }
            Request::Status => Response::Status(self.status()),
            Request::Ping => Response::Pong,
            Request::Shutdown => Response::ShuttingDown,
        }
    }

    pub fn status(&self) -> StatusResponse {
        let inner = self.index.inner();
        StatusResponse {
            index_path: self.index_path.clone(),
            kind: inner.kind(),
            node_count: inner.node_count(),
            edge_count: inner.edge_count(),
            has_counts: inner.has_counts(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            queries_served: self.queries_served.load(Ordering::Relaxed),
            cache_hit_rate: self.index.hit_rate(),
        }
    }

    /// Release the index
    pub fn close(self) {
        log::info!(
            "closing {} after {} queries (cache hit rate {:.1}%)",
            self.index_path.display(),
            self.queries_served.load(Ordering::Relaxed),
            self.index.hit_rate() * 100.0
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Cdawg, TokenStore};
    use tempfile::TempDir;

    fn context(temp: &TempDir) -> AppContext {
        let dir = temp.path().join("index");
        let mut cdawg = Cdawg::build(&TokenStore::from_tokens(vec![7, 8, 7, 9]));
        cdawg.fill_counts();
        cdawg.save(&dir).unwrap();
        AppContext::open(&dir, AppConfig::default()).unwrap()
    }

    #[test]
    fn test_query_and_status() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);

        let response = ctx.handle(Request::Query {
            tokens: vec![7, 9, 1],
            entropies: true,
            next_tokens: Some(-1),
        });
        match response {
            Response::Query(QueryResponse { trace, .. }) => {
                assert_eq!(trace.lengths, vec![1, 2, 0]);
                assert_eq!(trace.counts, vec![Some(2), Some(1), Some(5)]);
                assert_eq!(trace.entropies.unwrap()[0], 1.0);
                assert_eq!(trace.next_tokens.unwrap()[0].len(), 2);
            }
            other => panic!("Wrong variant: {:?}", other),
        }

        match ctx.handle(Request::Status) {
            Response::Status(status) => {
                assert_eq!(status.queries_served, 1);
                assert!(status.has_counts);
            }
            other => panic!("Wrong variant: {:?}", other),
        }
        assert_eq!(ctx.handle(Request::Ping), Response::Pong);
        ctx.close();
    }

    #[test]
    fn test_open_missing_index() {
        let temp = TempDir::new().unwrap();
        assert!(AppContext::open(&temp.path().join("nope"), AppConfig::default()).is_err());
    }
}
