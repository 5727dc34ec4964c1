//! Bounded line framing for the source byte stream.

use std::io;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};

/// Default upper bound on a single SSE line, in bytes.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024 * 1024;

/// One framed line from the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Line {
    /// A complete line without its terminator.
    Text(String),
    /// A line longer than the limit; its bytes were discarded.
    TooLong,
    /// A line that was not valid UTF-8.
    InvalidUtf8,
}

/// [`LinesCodec`] with per-line problems surfaced as items instead of
/// stream errors, so a bad line never ends the stream.
#[derive(Debug)]
pub(crate) struct EventLines {
    inner: LinesCodec,
}

impl EventLines {
    pub(crate) fn new(max_length: usize) -> Self {
        Self {
            inner: LinesCodec::new_with_max_length(max_length),
        }
    }
}

impl Decoder for EventLines {
    type Item = Line;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> io::Result<Option<Line>> {
        classify(self.inner.decode(buf))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> io::Result<Option<Line>> {
        classify(self.inner.decode_eof(buf))
    }
}

fn classify(result: Result<Option<String>, LinesCodecError>) -> io::Result<Option<Line>> {
    match result {
        Ok(line) => Ok(line.map(Line::Text)),
        Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(Line::TooLong)),
        // The codec does no I/O itself; InvalidData is its UTF-8 check.
        Err(LinesCodecError::Io(e)) if e.kind() == io::ErrorKind::InvalidData => {
            Ok(Some(Line::InvalidUtf8))
        }
        Err(LinesCodecError::Io(e)) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use tokio_util::codec::FramedRead;

    async fn frame(input: &'static [u8], max_length: usize) -> Vec<Line> {
        FramedRead::new(input, EventLines::new(max_length))
            .map(|line| line.unwrap())
            .collect()
            .await
    }

    fn text(s: &str) -> Line {
        Line::Text(s.to_string())
    }

    #[tokio::test]
    async fn test_splits_lines() {
        let lines = frame(b"data: {}\r\n\nping: \nlast", 64).await;
        assert_eq!(lines, vec![text("data: {}"), text(""), text("ping: "), text("last")]);
    }

    #[tokio::test]
    async fn test_long_line_is_skipped_not_fatal() {
        let lines = frame(b"short\n0123456789abcdef\nafter\n", 8).await;
        assert_eq!(lines, vec![text("short"), Line::TooLong, text("after")]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_skipped_not_fatal() {
        let lines = frame(b"bad \xff\ngood\n", 64).await;
        assert_eq!(lines, vec![Line::InvalidUtf8, text("good")]);
    }
}
