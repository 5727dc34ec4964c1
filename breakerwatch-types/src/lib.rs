//! # breakerwatch-types
//!
//! The normalized circuit-breaker status schema emitted by breakerwatch.
//!
//! Upstream `hystrix.stream` events carry dozens of inconsistently named and
//! typed fields. This crate defines the small, stable record that downstream
//! dashboards and aggregators consume instead.
//!
//! ## Features
//!
//! - `serde`: JSON serialization with the fixed wire layout (camelCase keys,
//!   percentile keys such as `"99.5"`, RFC 3339 timestamps, microsecond durations)
//!
//! ## Example
//!
//! ```rust
//! use breakerwatch_types::{BreakerCount, LatencyHistogram, Microseconds, NormalizedBreakerStatus};
//! use chrono::DateTime;
//! use std::time::Duration;
//!
//! let status = NormalizedBreakerStatus {
//!     name: "PaymentsCharge".to_string(),
//!     success_count: 120,
//!     fail_count: 2,
//!     fallback_count: 0,
//!     short_circuit_count: 0,
//!     window_duration: Microseconds::from(Duration::from_secs(10)),
//!     current_time: DateTime::from_timestamp(1_609_459_200, 0).unwrap(),
//!     breaker_status: BreakerCount::observed(false),
//!     latency: LatencyHistogram::default(),
//! };
//!
//! assert_eq!(status.breaker_status.total(), 1);
//! assert_eq!(status.window_duration.as_micros(), 10_000_000);
//! ```

mod duration;
mod status;

#[cfg(feature = "serde")]
pub mod timestamp;

pub use duration::*;
pub use status::*;
