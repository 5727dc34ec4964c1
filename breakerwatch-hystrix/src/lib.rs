//! # breakerwatch-hystrix
//!
//! Decoder and projector for the legacy `hystrix.stream` server-sent-event
//! format.
//!
//! Each SSE frame carries one circuit breaker's metrics for one scrape
//! interval. This crate turns such a frame into a
//! [`NormalizedBreakerStatus`] in three pure steps:
//!
//! 1. [`decode`]: validate the `data: ` frame and parse the legacy JSON into a
//!    [`LegacyMetricsRecord`], coercing string-encoded numbers and ignoring
//!    unknown keys
//! 2. [`Projector::project`]: map counters, convert the millisecond timestamp,
//!    and build the latency histogram (including the estimated 99.9th
//!    percentile)
//! 3. [`serialize`]: render compact JSON with a fixed key order
//!
//! ## Quick Start
//!
//! ```rust
//! use breakerwatch_hystrix::{decode, serialize, Projector};
//! use std::time::Duration;
//!
//! let line = r#"data: {"group":"A","name":"B","isCircuitBreakerOpen":false,"rollingCountSuccess":42,"currentTime":"1609459200000","latencyTotal":{"0":1,"25":2,"50":3,"75":4,"90":5,"95":6,"99":7,"99.5":8,"100":9},"latencyTotal_mean":10}"#;
//!
//! let record = decode(line)?;
//! let status = Projector::new(Duration::from_secs(10)).project(record)?;
//!
//! assert_eq!(status.name, "AB");
//! assert_eq!(status.latency.p99_9, 8);
//! println!("{}", serialize(&status)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Events are independent: nothing is carried from one call to the next.

mod coerce;
pub mod decode;
pub mod error;
pub mod legacy;
pub mod normalize;
pub mod project;
pub mod serialize;

pub use decode::{decode, Decoder, Framing, UnknownFields};
pub use error::{DecodeError, NormalizeError, ProjectError};
pub use legacy::{LegacyHistogram, LegacyMetricsRecord};
pub use normalize::Normalizer;
pub use project::{Projector, DEFAULT_WINDOW};
pub use serialize::serialize;

// Re-export types for convenience
pub use breakerwatch_types::{BreakerCount, LatencyHistogram, Microseconds, NormalizedBreakerStatus};
