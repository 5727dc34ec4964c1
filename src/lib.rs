//! # breakerwatch
//!
//! Relay a Hystrix `hystrix.stream` SSE feed as compact, newline-delimited
//! circuit-breaker status records.
//!
//! Every `data:` event on the source is decoded, projected into a
//! [`NormalizedBreakerStatus`] and written to the output as one line of JSON.
//! Lines that are not events (keep-alives, `event:` lines, garbage) are
//! counted and skipped; they never stop the stream.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                          breakerwatch                         │
//! │  ┌─────────┐    ┌────────────────────────────────┐   ┌──────┐ │
//! │  │ source  │───▶│            pipeline            │──▶│ sink │ │
//! │  │ http    │    │ reader ─▶ queue ─▶ writer      │   │stdout│ │
//! │  │ tcp     │    │   │                            │   │file  │ │
//! │  │ file    │    │   ▼                            │   │tcp   │ │
//! │  │ stdin   │    │ hystrix::Normalizer            │   │chan  │ │
//! │  └─────────┘    └────────────────────────────────┘   └──────┘ │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: opens the upstream feed as a byte stream
//! - **[`pipeline`]**: line splitting, normalization, backpressure, shutdown
//! - **[`sink`]**: output destinations for the serialized records
//! - **[`config`]**: command-line, environment and file settings
//!
//! The per-line transform itself lives in the `breakerwatch-hystrix` crate
//! and has no I/O.
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Follow a live endpoint
//! breakerwatch --url http://localhost:8080/hystrix.stream
//!
//! # Replay a capture into a file
//! breakerwatch --file capture.txt --output breakers.ndjson
//! ```
//!
//! ### As a library
//!
//! ```
//! use std::io::Cursor;
//! use breakerwatch::{Output, Pipeline};
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio_test::block_on(async {
//! let capture = "data: {\"group\":\"A\",\"name\":\"B\",\"currentTime\":\"1609459200000\"}\n\n";
//! let (output, mut rx) = Output::channel(16);
//! let sink = output.open().await.unwrap();
//!
//! let report = Pipeline::builder()
//!     .build()
//!     .run(Cursor::new(capture), sink, CancellationToken::new())
//!     .await
//!     .unwrap();
//!
//! assert_eq!(report.emitted, 1);
//! assert!(rx.recv().await.unwrap().starts_with("{\"name\":\"AB\""));
//! # });
//! ```

pub mod config;
pub mod duration;
mod lines;
pub mod pipeline;
pub mod runtime;
pub mod sink;
pub mod source;

pub use breakerwatch_hystrix::{NormalizedBreakerStatus, Normalizer};
pub use config::{Args, FileConfig, RelayConfig};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineError, PipelineReport, SkipCounts};
pub use sink::{Output, Sink};
pub use source::{EventStream, Source, SourceError};
