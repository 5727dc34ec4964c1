//! The legacy `hystrix.stream` event schema.
//!
//! A transcription of the JSON object carried by each `data:` frame. Field
//! names follow the upstream spelling, including its mixed casing. Only a
//! handful of fields feed the normalized record; the rest are decoded so
//! that they are recognized as known fields rather than schema drift.

use std::collections::BTreeMap;

use serde::de::IgnoredAny;
use serde::Deserialize;

use crate::coerce;

/// One decoded `hystrix.stream` event.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LegacyMetricsRecord {
    /// Event type, e.g. `HystrixCommand`.
    #[serde(rename = "type", deserialize_with = "coerce::string")]
    pub event_type: String,
    #[serde(deserialize_with = "coerce::string")]
    pub name: String,
    #[serde(deserialize_with = "coerce::string")]
    pub group: String,

    /// Milliseconds since the Unix epoch, as decimal text.
    #[serde(deserialize_with = "coerce::string")]
    pub current_time: String,

    #[serde(deserialize_with = "coerce::boolean")]
    pub is_circuit_breaker_open: bool,

    #[serde(deserialize_with = "coerce::int")]
    pub error_percentage: i64,
    #[serde(deserialize_with = "coerce::int")]
    pub error_count: i64,
    #[serde(deserialize_with = "coerce::int")]
    pub request_count: i64,
    #[serde(deserialize_with = "coerce::int")]
    pub reporting_hosts: i64,
    #[serde(deserialize_with = "coerce::int")]
    pub current_concurrent_execution_count: i64,
    #[serde(deserialize_with = "coerce::int")]
    pub rolling_max_concurrent_execution_count: i64,

    #[serde(deserialize_with = "coerce::int")]
    pub rolling_count_bad_requests: i64,
    #[serde(deserialize_with = "coerce::int")]
    pub rolling_count_collapsed_requests: i64,
    #[serde(deserialize_with = "coerce::int")]
    pub rolling_count_emit: i64,
    #[serde(deserialize_with = "coerce::int")]
    pub rolling_count_exceptions_thrown: i64,
    #[serde(deserialize_with = "coerce::int")]
    pub rolling_count_failure: i64,
    #[serde(deserialize_with = "coerce::int")]
    pub rolling_count_fallback_emit: i64,
    #[serde(deserialize_with = "coerce::int")]
    pub rolling_count_fallback_failure: i64,
    #[serde(deserialize_with = "coerce::int")]
    pub rolling_count_fallback_missing: i64,
    #[serde(deserialize_with = "coerce::int")]
    pub rolling_count_fallback_rejection: i64,
    #[serde(deserialize_with = "coerce::int")]
    pub rolling_count_fallback_success: i64,
    #[serde(deserialize_with = "coerce::int")]
    pub rolling_count_response_from_cache: i64,
    #[serde(deserialize_with = "coerce::int")]
    pub rolling_count_semaphore_rejected: i64,
    #[serde(deserialize_with = "coerce::int")]
    pub rolling_count_short_circuited: i64,
    #[serde(deserialize_with = "coerce::int")]
    pub rolling_count_success: i64,
    #[serde(deserialize_with = "coerce::int")]
    pub rolling_count_thread_pool_rejected: i64,
    #[serde(alias = "rollingCOuntTimeout", deserialize_with = "coerce::int")]
    pub rolling_count_timeout: i64,

    #[serde(deserialize_with = "coerce::default_on_null")]
    pub latency_execute: LegacyHistogram,
    #[serde(rename = "latencyExecute_mean", deserialize_with = "coerce::int")]
    pub latency_execute_mean: i64,

    /// End-to-end latency percentiles.
    #[serde(deserialize_with = "coerce::default_on_null")]
    pub latency_total: LegacyHistogram,
    /// Mean end-to-end latency; not derivable from the buckets.
    #[serde(rename = "latencyTotal_mean", deserialize_with = "coerce::int")]
    pub latency_total_mean: i64,

    #[serde(
        rename = "propertyValue_circuitBreakerEnabled",
        deserialize_with = "coerce::boolean"
    )]
    pub property_circuit_breaker_enabled: bool,
    #[serde(
        rename = "propertyValue_circuitBreakerErrorThresholdPercentage",
        deserialize_with = "coerce::int"
    )]
    pub property_circuit_breaker_error_threshold_percentage: i64,
    #[serde(
        rename = "propertyValue_circuitBreakerForceOpen",
        deserialize_with = "coerce::boolean"
    )]
    pub property_circuit_breaker_force_open: bool,
    #[serde(
        rename = "propertyValue_circuitBreakerForceClosed",
        deserialize_with = "coerce::boolean"
    )]
    pub property_circuit_breaker_force_closed: bool,
    #[serde(
        rename = "propertyValue_circuitBreakerRequestVolumeThreshold",
        deserialize_with = "coerce::int"
    )]
    pub property_circuit_breaker_request_volume_threshold: i64,
    #[serde(
        rename = "propertyValue_circuitBreakerSleepWindowInMilliseconds",
        deserialize_with = "coerce::int"
    )]
    pub property_circuit_breaker_sleep_window_ms: i64,
    #[serde(
        rename = "propertyValue_executionIsolationSemaphoreMaxConcurrentRequests",
        deserialize_with = "coerce::int"
    )]
    pub property_execution_isolation_semaphore_max_concurrent_requests: i64,
    #[serde(
        rename = "propertyValue_executionIsolationStrategy",
        deserialize_with = "coerce::string"
    )]
    pub property_execution_isolation_strategy: String,
    #[serde(
        rename = "propertyValue_executionIsolationThreadPoolKeyOverride",
        deserialize_with = "coerce::string"
    )]
    pub property_execution_isolation_thread_pool_key_override: String,
    #[serde(
        rename = "propertyValue_executionIsolationThreadTimeoutInMilliseconds",
        deserialize_with = "coerce::int"
    )]
    pub property_execution_isolation_thread_timeout_ms: i64,
    #[serde(
        rename = "propertyValue_executionTimeoutInMilliseconds",
        deserialize_with = "coerce::int"
    )]
    pub property_execution_timeout_ms: i64,
    #[serde(
        rename = "propertyValue_executionIsolationThreadInterruptOnTimeout",
        deserialize_with = "coerce::boolean"
    )]
    pub property_execution_isolation_thread_interrupt_on_timeout: bool,
    #[serde(
        rename = "propertyValue_fallbackIsolationSemaphoreMaxConcurrentRequests",
        alias = "propertyValue_fallbackIsolationSeampahoreMaxConcurrentRequests",
        deserialize_with = "coerce::int"
    )]
    pub property_fallback_isolation_semaphore_max_concurrent_requests: i64,
    #[serde(
        rename = "propertyValue_metricsRollingStatisticalWindowInMilliseconds",
        deserialize_with = "coerce::int"
    )]
    pub property_metrics_rolling_statistical_window_ms: i64,
    #[serde(
        rename = "propertyValue_requestCacheEnabled",
        deserialize_with = "coerce::boolean"
    )]
    pub property_request_cache_enabled: bool,
    #[serde(
        rename = "propertyValue_requestLogEnabled",
        deserialize_with = "coerce::boolean"
    )]
    pub property_request_log_enabled: bool,

    /// Keys outside this transcription.
    #[serde(flatten)]
    pub(crate) unknown: BTreeMap<String, IgnoredAny>,
}

impl LegacyMetricsRecord {
    /// Keys present in the event that this schema does not know about.
    pub fn unknown_fields(&self) -> impl Iterator<Item = &str> {
        self.unknown.keys().map(String::as_str)
    }
}

/// Latency percentile buckets, keyed by percentile in the wire format.
///
/// `0` is the minimum, `50` the median and `100` the maximum. Values may
/// arrive as numbers or decimal strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct LegacyHistogram {
    #[serde(rename = "0", deserialize_with = "coerce::int")]
    pub p0: i64,
    #[serde(rename = "25", deserialize_with = "coerce::int")]
    pub p25: i64,
    #[serde(rename = "50", deserialize_with = "coerce::int")]
    pub p50: i64,
    #[serde(rename = "75", deserialize_with = "coerce::int")]
    pub p75: i64,
    #[serde(rename = "90", deserialize_with = "coerce::int")]
    pub p90: i64,
    #[serde(rename = "95", deserialize_with = "coerce::int")]
    pub p95: i64,
    #[serde(rename = "99", deserialize_with = "coerce::int")]
    pub p99: i64,
    #[serde(rename = "99.5", deserialize_with = "coerce::int")]
    pub p99_5: i64,
    #[serde(rename = "100", deserialize_with = "coerce::int")]
    pub p100: i64,
}
