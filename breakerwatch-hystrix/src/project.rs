//! Breaker Projector: legacy record in, normalized status out.

use std::time::Duration;

use breakerwatch_types::{BreakerCount, LatencyHistogram, Microseconds, NormalizedBreakerStatus};
use chrono::{DateTime, TimeDelta, Utc};

use crate::{LegacyHistogram, LegacyMetricsRecord, ProjectError};

/// Upstream's default rolling statistical window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(10);

/// Maps legacy records onto [`NormalizedBreakerStatus`].
///
/// Counter sources:
///
/// | output | legacy field(s) |
/// |---|---|
/// | `successCount` | `rollingCountSuccess` |
/// | `failCount` | `rollingCountFailure` |
/// | `fallbackCount` | `rollingCountFallbackFailure + rollingCountFallbackRejection` |
/// | `shortCircuitCount` | `rollingCountShortCircuited` |
///
/// Negative counters clamp to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projector {
    window: Microseconds,
}

impl Projector {
    /// A projector reporting `window` as the rolling window of every record.
    pub fn new(window: Duration) -> Self {
        Self {
            window: Microseconds::from(window),
        }
    }

    /// The configured rolling window.
    pub fn window(&self) -> Duration {
        self.window.to_duration()
    }

    /// Project one record. Fails only on an unusable `currentTime`.
    pub fn project(
        &self,
        record: LegacyMetricsRecord,
    ) -> Result<NormalizedBreakerStatus, ProjectError> {
        let current_time = parse_current_time(&record.current_time)?;
        let latency = latency_histogram(&record.latency_total, record.latency_total_mean);

        let fallback_count = non_negative(record.rolling_count_fallback_failure)
            .saturating_add(non_negative(record.rolling_count_fallback_rejection));

        // No separator between group and name; consumers key on this form.
        let mut name = record.group;
        name.push_str(&record.name);

        Ok(NormalizedBreakerStatus {
            name,
            success_count: non_negative(record.rolling_count_success),
            fail_count: non_negative(record.rolling_count_failure),
            fallback_count,
            short_circuit_count: non_negative(record.rolling_count_short_circuited),
            window_duration: self.window,
            current_time,
            breaker_status: BreakerCount::observed(record.is_circuit_breaker_open),
            latency,
        })
    }
}

impl Default for Projector {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

/// Convert upstream `currentTime` (decimal milliseconds since the epoch).
///
/// Splits into `value / 1000` seconds plus `(value % 1000) * 1000`
/// nanoseconds. The remainder is scaled by 1000 rather than 1_000_000, so
/// `1609459200500` lands 500µs past the second, not 500ms. Downstream data
/// already carries this offset; it is reproduced as is.
pub fn parse_current_time(value: &str) -> Result<DateTime<Utc>, ProjectError> {
    let millis: i64 = value.parse().map_err(|e| ProjectError::InvalidTimestamp {
        value: value.to_string(),
        source: Some(e),
    })?;

    let secs = millis / 1000;
    let offset_nanos = (millis % 1000) * 1000;

    DateTime::from_timestamp(secs, 0)
        .and_then(|t| t.checked_add_signed(TimeDelta::nanoseconds(offset_nanos)))
        .ok_or_else(|| ProjectError::InvalidTimestamp {
            value: value.to_string(),
            source: None,
        })
}

/// Build the normalized histogram from legacy buckets and the separately
/// reported mean.
pub fn latency_histogram(buckets: &LegacyHistogram, mean: i64) -> LatencyHistogram {
    LatencyHistogram {
        mean,
        median: buckets.p50,
        min: buckets.p0,
        max: buckets.p100,
        p25: buckets.p25,
        p75: buckets.p75,
        p90: buckets.p90,
        p95: buckets.p95,
        p99: buckets.p99,
        p99_5: buckets.p99_5,
        p99_9: estimate_p99_9(buckets.p100, buckets.p99_5),
    }
}

/// The upstream schema has no 99.9th bucket: use the midpoint of the 99.5th
/// and the maximum, truncated toward zero.
pub fn estimate_p99_9(max: i64, p99_5: i64) -> i64 {
    ((i128::from(max) + i128::from(p99_5)) / 2) as i64
}

fn non_negative(v: i64) -> u64 {
    u64::try_from(v).unwrap_or(0)
}
