//! HTTP SSE connection.

use std::io;
use std::time::Duration;

use futures_util::TryStreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::Client;
use tokio_util::io::StreamReader;
use tracing::{debug, info};

use super::{EventStream, SourceError};

/// Issue the single GET against an SSE endpoint and expose the body as a
/// byte stream.
///
/// Only connection setup is bounded by `connect_timeout`; the body is
/// expected to stay open indefinitely.
pub(super) async fn connect(url: &str, connect_timeout: Duration) -> Result<EventStream, SourceError> {
    let client = Client::builder().connect_timeout(connect_timeout).build()?;

    debug!(url, "Requesting event stream");
    let response = client
        .get(url)
        .header(CACHE_CONTROL, "no-cache")
        .header(ACCEPT, "text/event-stream")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(SourceError::Http(format!(
            "{} returned status {}",
            url,
            response.status()
        )));
    }

    info!(url, status = %response.status(), "Connected to event stream");

    let body = response.bytes_stream().map_err(io::Error::other);
    Ok(Box::new(StreamReader::new(Box::pin(body))))
}
