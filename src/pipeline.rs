//! The reader/writer pipeline.
//!
//! ```text
//!  source ──▶ reader task ──▶ bounded queue ──▶ writer task ──▶ sink
//!             (frame lines,                     (write, flush
//!              normalize)                        on a cadence)
//!                  ▲                                  ▲
//!                  └────────── CancellationToken ─────┘
//! ```
//!
//! A full queue blocks the reader. Either task cancels the shared token when
//! it fails, and every wait in both tasks is raced against it, so a dead
//! source or sink never leaves the other side waiting. The one exception is
//! a record the writer has already started: it is finished, within the drain
//! timeout, so the output never holds a partial line followed by another.

use std::io;
use std::time::Duration;

use breakerwatch_hystrix::{NormalizeError, Normalizer};
use futures_util::StreamExt;
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::time::MissedTickBehavior;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub use crate::lines::DEFAULT_MAX_LINE_LENGTH;

use crate::lines::{EventLines, Line};
use crate::sink::Sink;

/// Default number of serialized records buffered between the tasks.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Default sink flush cadence.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Default time allowed for writing out queued records after cancellation.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors that end the pipeline.
///
/// Bad events are not errors at this level; they are counted in
/// [`SkipCounts`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to read from source: {0}")]
    Read(#[source] io::Error),

    #[error("Failed to write to output: {0}")]
    Write(#[source] io::Error),

    #[error("Pipeline task failed: {0}")]
    Task(#[from] JoinError),
}

/// Events skipped, by reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipCounts {
    pub too_short: u64,
    pub not_data_frame: u64,
    pub malformed_payload: u64,
    pub invalid_timestamp: u64,
    pub serialize: u64,
    /// Lines that were not valid UTF-8.
    pub invalid_utf8: u64,
    /// Lines longer than the configured maximum.
    pub too_long: u64,
}

impl SkipCounts {
    fn record(&mut self, err: &NormalizeError) {
        let counter = match err.kind() {
            "too_short" => &mut self.too_short,
            "not_data_frame" => &mut self.not_data_frame,
            "malformed_payload" => &mut self.malformed_payload,
            "invalid_timestamp" => &mut self.invalid_timestamp,
            _ => &mut self.serialize,
        };
        *counter += 1;
    }

    /// Total skipped lines.
    pub fn total(&self) -> u64 {
        self.too_short
            + self.not_data_frame
            + self.malformed_payload
            + self.invalid_timestamp
            + self.serialize
            + self.invalid_utf8
            + self.too_long
    }
}

/// Outcome of a pipeline run that ended without a fatal error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Non-empty lines read from the source.
    pub lines: u64,
    /// Records written to the sink.
    pub emitted: u64,
    pub skipped: SkipCounts,
}

/// Configured pipeline. Cheap to clone; holds no per-run state.
#[derive(Debug, Clone)]
pub struct Pipeline {
    normalizer: Normalizer,
    queue_capacity: usize,
    flush_interval: Duration,
    drain_timeout: Duration,
    max_line_length: usize,
}

impl Pipeline {
    /// Create a new builder for configuring the pipeline.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Stream `input` through the normalizer into `sink` until the input
    /// ends, either side fails, or `token` is cancelled.
    ///
    /// Records reach the sink in input order.
    pub async fn run<R>(
        &self,
        input: R,
        sink: Sink,
        token: CancellationToken,
    ) -> Result<PipelineReport, PipelineError>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let (tx, rx) = mpsc::channel(self.queue_capacity);

        let lines = FramedRead::new(input, EventLines::new(self.max_line_length));
        let reader = tokio::spawn(read_events(lines, self.normalizer, tx, token.clone()));
        let writer = tokio::spawn(write_records(
            rx,
            sink,
            self.flush_interval,
            self.drain_timeout,
            token,
        ));

        let (read, written) = tokio::join!(reader, writer);
        let read = read??;
        let emitted = written??;

        Ok(PipelineReport {
            lines: read.lines,
            emitted,
            skipped: read.skipped,
        })
    }
}

/// Builder for Pipeline.
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    normalizer: Option<Normalizer>,
    queue_capacity: Option<usize>,
    flush_interval: Option<Duration>,
    drain_timeout: Option<Duration>,
    max_line_length: Option<usize>,
}

impl PipelineBuilder {
    /// Set the per-line transform (default: standard framing, 10s window).
    pub fn normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    /// Set the queue capacity (default: 64, minimum 1).
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Set the sink flush cadence (default: 1 second).
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = Some(interval);
        self
    }

    /// Set how long queued records may take to drain after cancellation
    /// (default: 2 seconds).
    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = Some(timeout);
        self
    }

    /// Set the longest accepted source line in bytes (default: 1 MiB).
    ///
    /// Longer lines are discarded and counted as `too_long`.
    pub fn max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = Some(max);
        self
    }

    /// Build the pipeline.
    pub fn build(self) -> Pipeline {
        Pipeline {
            normalizer: self.normalizer.unwrap_or_default(),
            queue_capacity: self.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY).max(1),
            flush_interval: self
                .flush_interval
                .filter(|d| !d.is_zero())
                .unwrap_or(DEFAULT_FLUSH_INTERVAL),
            drain_timeout: self.drain_timeout.unwrap_or(DEFAULT_DRAIN_TIMEOUT),
            max_line_length: self
                .max_line_length
                .unwrap_or(DEFAULT_MAX_LINE_LENGTH)
                .max(1),
        }
    }
}

#[derive(Debug, Default)]
struct ReadStats {
    lines: u64,
    skipped: SkipCounts,
}

async fn read_events<R>(
    mut lines: FramedRead<R, EventLines>,
    normalizer: Normalizer,
    tx: mpsc::Sender<String>,
    token: CancellationToken,
) -> Result<ReadStats, PipelineError>
where
    R: AsyncRead + Unpin,
{
    let mut stats = ReadStats::default();

    loop {
        let line = tokio::select! {
            _ = token.cancelled() => {
                debug!("Reader cancelled");
                break;
            }
            next = lines.next() => match next {
                Some(Ok(line)) => line,
                None => {
                    debug!("Source closed");
                    break;
                }
                Some(Err(e)) => {
                    token.cancel();
                    return Err(PipelineError::Read(e));
                }
            },
        };

        let line = match line {
            // Blank lines separate SSE events; they are not events themselves.
            Line::Text(text) if text.is_empty() => continue,
            Line::Text(text) => {
                stats.lines += 1;
                text
            }
            Line::TooLong => {
                stats.lines += 1;
                stats.skipped.too_long += 1;
                warn!("Skipping line longer than the configured maximum");
                continue;
            }
            Line::InvalidUtf8 => {
                stats.lines += 1;
                stats.skipped.invalid_utf8 += 1;
                warn!("Skipping line that is not valid UTF-8");
                continue;
            }
        };

        let record = match normalizer.normalize_to_json(&line) {
            Ok(record) => record,
            Err(e) => {
                stats.skipped.record(&e);
                if e.is_framing() {
                    debug!(kind = e.kind(), "Skipping non-event line");
                } else {
                    warn!(kind = e.kind(), error = %e, "Skipping event");
                }
                continue;
            }
        };

        match token.run_until_cancelled(tx.send(record)).await {
            Some(Ok(())) => {}
            // The writer is gone and reports its own error.
            Some(Err(_)) | None => break,
        }
    }

    Ok(stats)
}

async fn write_records(
    mut rx: mpsc::Receiver<String>,
    mut sink: Sink,
    flush_interval: Duration,
    drain_timeout: Duration,
    token: CancellationToken,
) -> Result<u64, PipelineError> {
    let mut ticker = tokio::time::interval(flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut written = 0u64;

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                if let Some(Err(e)) = token.run_until_cancelled(sink.flush()).await {
                    token.cancel();
                    return Err(PipelineError::Write(e));
                }
            }
            record = rx.recv() => {
                let Some(record) = record else { break };
                // A started record is finished before shutdown; a fragment
                // followed by the next record would corrupt both lines.
                let write = sink.write_record(&record);
                tokio::pin!(write);
                let result = tokio::select! {
                    biased;
                    result = &mut write => result,
                    _ = token.cancelled() => {
                        match tokio::time::timeout(drain_timeout, &mut write).await {
                            Ok(result) => result,
                            Err(_) => Err(io::Error::new(
                                io::ErrorKind::TimedOut,
                                "timed out finishing a record after cancellation",
                            )),
                        }
                    }
                };
                if let Err(e) = result {
                    token.cancel();
                    return Err(PipelineError::Write(e));
                }
                written += 1;
            }
        }
    }

    // Records the reader already handed over are written out, within bounds.
    rx.close();
    let drain = async {
        while let Some(record) = rx.recv().await {
            sink.write_record(&record).await?;
            written += 1;
        }
        sink.flush().await
    };
    let drained = tokio::time::timeout(drain_timeout, drain).await;
    match drained {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(PipelineError::Write(e)),
        Err(_) => warn!(
            timeout_ms = drain_timeout.as_millis() as u64,
            "Timed out draining queued records"
        ),
    }

    debug!(written, "Writer finished");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::Output;
    use std::io::Cursor;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    const SAMPLE_EVENT: &str = r#"data: {"group":"A","name":"B","isCircuitBreakerOpen":false,"rollingCountSuccess":42,"currentTime":"1609459200000","latencyTotal":{"0":1,"25":2,"50":3,"75":4,"90":5,"95":6,"99":7,"99.5":8,"100":9},"latencyTotal_mean":10}"#;

    const SAMPLE_RECORD: &str = concat!(
        r#"{"name":"AB","successCount":42,"failCount":0,"fallbackCount":0,"#,
        r#""shortCircuitCount":0,"windowDuration":10000000,"#,
        r#""currentTime":"2021-01-01T00:00:00Z","#,
        r#""breakerStatus":{"open":0,"closed":1},"#,
        r#""latency":{"mean":10,"median":3,"min":1,"max":9,"#,
        r#""25":2,"75":4,"90":5,"95":6,"99":7,"99.5":8,"99.9":8}}"#
    );

    fn event(name: &str) -> String {
        format!(
            r#"data: {{"group":"G","name":"{}","currentTime":"1609459200000"}}"#,
            name
        )
    }

    async fn channel_sink(buffer: usize) -> (Sink, mpsc::Receiver<String>) {
        let (output, rx) = Output::channel(buffer);
        (output.open().await.unwrap(), rx)
    }

    #[tokio::test]
    async fn test_end_to_end() {
        let input = format!(
            "ping: \n{}\n\nevent: ping\ndata: {{broken json}}\ndata: {{\"currentTime\":\"later\"}}\ninvalid\n",
            SAMPLE_EVENT
        );
        let (sink, mut rx) = channel_sink(16).await;

        let report = Pipeline::builder()
            .build()
            .run(Cursor::new(input), sink, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap(), SAMPLE_RECORD);
        assert!(rx.recv().await.is_none());

        assert_eq!(report.lines, 6);
        assert_eq!(report.emitted, 1);
        assert_eq!(
            report.skipped,
            SkipCounts {
                too_short: 2,
                not_data_frame: 1,
                malformed_payload: 1,
                invalid_timestamp: 1,
                ..Default::default()
            }
        );
        assert_eq!(report.skipped.total(), 5);
    }

    #[tokio::test]
    async fn test_crlf_and_invalid_utf8_lines() {
        let mut input = format!("{}\r\n\r\n", SAMPLE_EVENT).into_bytes();
        input.extend_from_slice(b"data: {\"name\":\"\xff\"}\n");
        let (sink, mut rx) = channel_sink(16).await;

        let report = Pipeline::builder()
            .build()
            .run(Cursor::new(input), sink, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap(), SAMPLE_RECORD);
        assert_eq!(report.emitted, 1);
        assert_eq!(report.skipped.invalid_utf8, 1);
    }

    #[tokio::test]
    async fn test_preserves_order() {
        let input: String = (0..20).map(|i| event(&format!("n{}", i)) + "\n").collect();
        let (sink, mut rx) = channel_sink(64).await;

        let report = Pipeline::builder()
            .queue_capacity(2)
            .build()
            .run(Cursor::new(input), sink, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.emitted, 20);

        for i in 0..20 {
            let record = rx.recv().await.unwrap();
            let value: serde_json::Value = serde_json::from_str(&record).unwrap();
            assert_eq!(value["name"], format!("Gn{}", i));
        }
    }

    #[tokio::test]
    async fn test_backpressure_without_loss() {
        let input: String = (0..10).map(|i| event(&format!("n{}", i)) + "\n").collect();
        let (sink, mut rx) = channel_sink(1).await;

        let pipeline = Pipeline::builder().queue_capacity(1).build();
        let handle = tokio::spawn(async move {
            pipeline
                .run(Cursor::new(input), sink, CancellationToken::new())
                .await
        });

        // Nobody is consuming, so the pipeline must be parked, not finished.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!handle.is_finished());

        let mut received = 0;
        while let Some(_record) = rx.recv().await {
            received += 1;
        }
        assert_eq!(received, 10);

        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.emitted, 10);
    }

    #[tokio::test]
    async fn test_cancellation_stops_idle_pipeline() {
        // The far end stays open, so the source never reaches EOF.
        let (input, _far_end) = tokio::io::duplex(64);
        let (sink, _rx) = channel_sink(16).await;
        let token = CancellationToken::new();

        let pipeline = Pipeline::builder().build();
        let run_token = token.clone();
        let handle = tokio::spawn(async move { pipeline.run(input, sink, run_token).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        let report = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("pipeline did not stop after cancellation")
            .unwrap()
            .unwrap();
        assert_eq!(report.emitted, 0);
    }

    #[tokio::test]
    async fn test_closed_sink_stops_reader() {
        let (input, mut far_end) = tokio::io::duplex(4096);
        let (sink, rx) = channel_sink(1).await;
        drop(rx);

        let token = CancellationToken::new();
        let pipeline = Pipeline::builder().build();
        let run_token = token.clone();
        let handle = tokio::spawn(async move { pipeline.run(input, sink, run_token).await });

        far_end
            .write_all(format!("{}\n", SAMPLE_EVENT).as_bytes())
            .await
            .unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("pipeline did not stop after the sink closed")
            .unwrap();
        assert!(matches!(result, Err(PipelineError::Write(_))));
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_read_error_drains_queued_records() {
        let input = tokio_test::io::Builder::new()
            .read(format!("{}\n{}\n", SAMPLE_EVENT, SAMPLE_EVENT).as_bytes())
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let (sink, mut rx) = channel_sink(16).await;

        let result = Pipeline::builder()
            .build()
            .run(input, sink, CancellationToken::new())
            .await;
        assert!(matches!(result, Err(PipelineError::Read(_))));

        assert_eq!(rx.recv().await.unwrap(), SAMPLE_RECORD);
        assert_eq!(rx.recv().await.unwrap(), SAMPLE_RECORD);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_flushes_on_cadence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ndjson");
        let sink = Output::file(&path).open().await.unwrap();

        let (input, mut far_end) = tokio::io::duplex(4096);
        let token = CancellationToken::new();
        let pipeline = Pipeline::builder()
            .flush_interval(Duration::from_millis(20))
            .build();
        let run_token = token.clone();
        let handle = tokio::spawn(async move { pipeline.run(input, sink, run_token).await });

        far_end
            .write_all(format!("{}\n", SAMPLE_EVENT).as_bytes())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        // Still running, yet the record is already on disk.
        assert!(!handle.is_finished());
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, format!("{}\n", SAMPLE_RECORD));

        token.cancel();
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.emitted, 1);
    }

    #[tokio::test]
    async fn test_cancel_finishes_record_in_flight() {
        // Larger than the sink's write buffer, so it goes straight through.
        let input = format!("{}\n{}\n", event(&"x".repeat(9000)), event("small"));
        let (sink_end, mut peer) = tokio::io::duplex(64);
        let token = CancellationToken::new();

        let pipeline = Pipeline::builder()
            .drain_timeout(Duration::from_secs(5))
            .build();
        let run_token = token.clone();
        let handle = tokio::spawn(async move {
            pipeline
                .run(Cursor::new(input), Sink::from_writer(sink_end), run_token)
                .await
        });

        // Nobody reads yet, so the first record stalls part way through.
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        let mut text = String::new();
        peer.read_to_string(&mut text).await.unwrap();
        let report = handle.await.unwrap().unwrap();

        let names: Vec<String> = text
            .lines()
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(line).unwrap();
                value["name"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(names, vec![format!("G{}", "x".repeat(9000)), "Gsmall".to_string()]);
        assert_eq!(report.emitted, 2);
    }

    #[tokio::test]
    async fn test_stalled_record_after_cancel_is_a_write_error() {
        let input = format!("{}\n", event(&"x".repeat(9000)));
        let (sink_end, _peer) = tokio::io::duplex(64);
        let token = CancellationToken::new();

        let pipeline = Pipeline::builder()
            .drain_timeout(Duration::from_millis(50))
            .build();
        let run_token = token.clone();
        let handle = tokio::spawn(async move {
            pipeline
                .run(Cursor::new(input), Sink::from_writer(sink_end), run_token)
                .await
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("pipeline did not stop after cancellation")
            .unwrap();
        match result {
            Err(PipelineError::Write(e)) => assert_eq!(e.kind(), io::ErrorKind::TimedOut),
            other => panic!("expected a write timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_overlong_line_is_skipped() {
        let input = format!("data: {{\"name\":\"{}\"}}\n{}\n", "x".repeat(512), SAMPLE_EVENT);
        let (sink, mut rx) = channel_sink(16).await;

        let report = Pipeline::builder()
            .max_line_length(256)
            .build()
            .run(Cursor::new(input), sink, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap(), SAMPLE_RECORD);
        assert_eq!(report.lines, 2);
        assert_eq!(report.emitted, 1);
        assert_eq!(report.skipped.too_long, 1);
        assert_eq!(report.skipped.total(), 1);
    }

    #[test]
    fn test_builder_clamps_invalid_settings() {
        let pipeline = Pipeline::builder()
            .queue_capacity(0)
            .flush_interval(Duration::ZERO)
            .build();
        assert_eq!(pipeline.queue_capacity, 1);
        assert_eq!(pipeline.flush_interval, DEFAULT_FLUSH_INTERVAL);
        assert_eq!(pipeline.drain_timeout, DEFAULT_DRAIN_TIMEOUT);
        assert_eq!(pipeline.max_line_length, DEFAULT_MAX_LINE_LENGTH);
    }
}
