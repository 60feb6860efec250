//! Query server
//!
//! Keeps one index loaded and answers newline-delimited JSON requests read
//! from stdin, so callers avoid reloading the index for every query.

mod context;
pub mod protocol;

pub use context::AppContext;
pub use protocol::{QueryResponse, Request, Response, StatusResponse};

use anyhow::Result;
use protocol::{read_message, write_message};
use std::io::{self, BufRead, Write};

/// Serve requests from `input` until end of input or a `Shutdown` request
pub fn serve<R: BufRead, W: Write>(ctx: &AppContext, mut input: R, mut output: W) -> Result<()> {
    loop {
        let request = match read_message::<_, Request>(&mut input) {
            Ok(Some(request)) => request,
            Ok(None) => break,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                log::debug!("rejected request: {}", e);
                let response = Response::Error {
                    message: format!("Invalid request: {}", e),
                };
                write_message(&mut output, &response)?;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let shutdown = matches!(request, Request::Shutdown);
        let response = ctx.handle(request);
        write_message(&mut output, &response)?;

        if shutdown {
            log::info!("shutdown requested");
            break;
        }
    }

    Ok(())
}

/// Serve on the process's stdin and stdout
pub fn serve_stdio(ctx: &AppContext) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    serve(ctx, stdin.lock(), io::BufWriter::new(stdout.lock()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Dawg, TokenStore};
    use crate::utils::AppConfig;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_serve_session() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("corpus.dawg");
        let mut dawg = Dawg::build(&TokenStore::from_tokens(vec![1, 2, 3]));
        dawg.fill_counts();
        dawg.save(&path).unwrap();
        let ctx = AppContext::open(&path, AppConfig::default()).unwrap();

        let input = concat!(
            "{\"type\":\"Ping\"}\n",
            "garbage\n",
            "{\"type\":\"Query\",\"tokens\":[2,3,4]}\n",
            "{\"type\":\"Shutdown\"}\n",
            "{\"type\":\"Ping\"}\n",
        );
        let mut output = Vec::new();
        serve(&ctx, Cursor::new(input), &mut output).unwrap();

        let responses: Vec<Response> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(responses.len(), 4);
        assert_eq!(responses[0], Response::Pong);
        assert!(matches!(responses[1], Response::Error { .. }));
        match &responses[2] {
            Response::Query(q) => {
                assert_eq!(q.trace.lengths, vec![1, 2, 0]);
                assert_eq!(q.trace.counts, vec![Some(1), Some(1), Some(4)]);
            }
            other => panic!("Wrong variant: {:?}", other),
        }
        assert_eq!(responses[3], Response::ShuttingDown);
    }
}
