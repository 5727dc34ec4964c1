//! Input sources for the raw SSE stream.
//!
//! Every source opens into a plain [`AsyncRead`]; framing into lines happens
//! in the pipeline, so a captured stream replayed from a file behaves exactly
//! like a live endpoint.

mod error;
mod http;

pub use error::SourceError;

use std::path::PathBuf;
use std::time::Duration;

use tokio::io::AsyncRead;
use tokio::net::TcpStream;

/// An opened byte stream of SSE text.
pub type EventStream = Box<dyn AsyncRead + Send + Unpin>;

/// Where raw `hystrix.stream` frames come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// An HTTP SSE endpoint, e.g. `http://host:8080/hystrix.stream`.
    Http(String),
    /// A raw TCP stream of SSE text (`host:port`).
    Tcp(String),
    /// A captured stream replayed from disk.
    File(PathBuf),
    /// Standard input.
    Stdin,
}

impl Source {
    /// Returns a human-readable description of the source.
    pub fn description(&self) -> String {
        match self {
            Source::Http(url) => format!("http: {}", url),
            Source::Tcp(addr) => format!("tcp: {}", addr),
            Source::File(path) => format!("file: {}", path.display()),
            Source::Stdin => "stdin".to_string(),
        }
    }

    /// Open the source.
    ///
    /// Failing here is fatal to the process; nothing is retried.
    pub async fn open(&self, connect_timeout: Duration) -> Result<EventStream, SourceError> {
        match self {
            Source::Http(url) => http::connect(url, connect_timeout).await,
            Source::Tcp(addr) => {
                let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(addr))
                    .await
                    .map_err(|_| SourceError::Timeout)?
                    .map_err(|e| SourceError::Connection(format!("{}: {}", addr, e)))?;
                Ok(Box::new(stream))
            }
            Source::File(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|source| SourceError::Open {
                        path: path.clone(),
                        source,
                    })?;
                Ok(Box::new(file))
            }
            Source::Stdin => Ok(Box::new(tokio::io::stdin())),
        }
    }
}
