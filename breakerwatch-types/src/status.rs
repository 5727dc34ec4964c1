//! Normalized circuit-breaker status records.

use chrono::{DateTime, Utc};

use crate::Microseconds;

/// A normalized view of one circuit breaker at one scrape interval.
///
/// Field order is the serialization order and is part of the wire contract.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct NormalizedBreakerStatus {
    /// Command group and command name, concatenated without a separator.
    pub name: String,

    /// Successful executions in the rolling window.
    pub success_count: u64,

    /// Failed executions in the rolling window.
    pub fail_count: u64,

    /// Fallbacks that failed or were rejected in the rolling window.
    pub fallback_count: u64,

    /// Calls short-circuited by an open breaker in the rolling window.
    pub short_circuit_count: u64,

    /// Length of the rolling window the counters cover.
    pub window_duration: Microseconds,

    /// When the upstream sample was taken.
    #[cfg_attr(feature = "serde", serde(with = "crate::timestamp::rfc3339"))]
    pub current_time: DateTime<Utc>,

    /// Breaker state observed in this event.
    pub breaker_status: BreakerCount,

    /// Total latency distribution.
    pub latency: LatencyHistogram,
}

/// Open/closed tally for a single observation.
///
/// Exactly one side is 1 for a record built from one event. The pair shape
/// lets aggregators sum tallies across events without reinterpreting them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BreakerCount {
    pub open: u64,
    pub closed: u64,
}

impl BreakerCount {
    /// Tally for one observation of a breaker.
    pub const fn observed(is_open: bool) -> Self {
        if is_open {
            Self { open: 1, closed: 0 }
        } else {
            Self { open: 0, closed: 1 }
        }
    }

    /// Number of observations in the tally.
    pub const fn total(&self) -> u64 {
        self.open + self.closed
    }
}

/// Latency percentiles in the normalized schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LatencyHistogram {
    pub mean: i64,
    pub median: i64,
    pub min: i64,
    pub max: i64,
    #[cfg_attr(feature = "serde", serde(rename = "25"))]
    pub p25: i64,
    #[cfg_attr(feature = "serde", serde(rename = "75"))]
    pub p75: i64,
    #[cfg_attr(feature = "serde", serde(rename = "90"))]
    pub p90: i64,
    #[cfg_attr(feature = "serde", serde(rename = "95"))]
    pub p95: i64,
    #[cfg_attr(feature = "serde", serde(rename = "99"))]
    pub p99: i64,
    #[cfg_attr(feature = "serde", serde(rename = "99.5"))]
    pub p99_5: i64,
    /// Estimated; the upstream schema has no 99.9th percentile bucket.
    #[cfg_attr(feature = "serde", serde(rename = "99.9"))]
    pub p99_9: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NormalizedBreakerStatus {
        NormalizedBreakerStatus {
            name: "AB".to_string(),
            success_count: 42,
            fail_count: 3,
            fallback_count: 1,
            short_circuit_count: 0,
            window_duration: Microseconds::from_millis(10_000),
            current_time: DateTime::from_timestamp(1_609_459_200, 0).unwrap(),
            breaker_status: BreakerCount::observed(false),
            latency: LatencyHistogram {
                mean: 10,
                median: 3,
                min: 1,
                max: 9,
                p25: 2,
                p75: 4,
                p90: 5,
                p95: 6,
                p99: 7,
                p99_5: 8,
                p99_9: 8,
            },
        }
    }

    #[test]
    fn test_observed_tally() {
        assert_eq!(BreakerCount::observed(true), BreakerCount { open: 1, closed: 0 });
        assert_eq!(BreakerCount::observed(false), BreakerCount { open: 0, closed: 1 });
        assert_eq!(BreakerCount::observed(true).total(), 1);
        assert_eq!(BreakerCount::observed(false).total(), 1);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_wire_layout() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(
            json,
            concat!(
                r#"{"name":"AB","successCount":42,"failCount":3,"fallbackCount":1,"#,
                r#""shortCircuitCount":0,"windowDuration":10000000,"#,
                r#""currentTime":"2021-01-01T00:00:00Z","#,
                r#""breakerStatus":{"open":0,"closed":1},"#,
                r#""latency":{"mean":10,"median":3,"min":1,"max":9,"#,
                r#""25":2,"75":4,"90":5,"95":6,"99":7,"99.5":8,"99.9":8}}"#
            )
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_downstream_consumers_can_read_records() {
        let status = sample();
        let json = serde_json::to_string(&status).unwrap();
        let parsed: NormalizedBreakerStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, status);
    }
}
