//! Serializer: normalized status to compact JSON text.

use breakerwatch_types::NormalizedBreakerStatus;

/// Render a status as one line of compact JSON.
///
/// Key order is fixed by the field order of [`NormalizedBreakerStatus`], so
/// equal records always produce identical bytes.
pub fn serialize(status: &NormalizedBreakerStatus) -> serde_json::Result<String> {
    serde_json::to_string(status)
}
