//! Decode, project and serialize in one call.

use breakerwatch_types::NormalizedBreakerStatus;

use crate::{serialize, Decoder, NormalizeError, Projector};

/// The full per-line transform.
///
/// Holds no per-event state; one instance can normalize any number of lines
/// in any order.
///
/// ```rust
/// use breakerwatch_hystrix::Normalizer;
///
/// let normalizer = Normalizer::default();
/// let json = normalizer.normalize_to_json(
///     r#"data: {"group":"Payments","name":"Charge","currentTime":"1609459200000"}"#,
/// )?;
/// assert!(json.starts_with(r#"{"name":"PaymentsCharge","#));
/// # Ok::<(), breakerwatch_hystrix::NormalizeError>(())
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Normalizer {
    decoder: Decoder,
    projector: Projector,
}

impl Normalizer {
    pub fn new(decoder: Decoder, projector: Projector) -> Self {
        Self { decoder, projector }
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    /// Decode and project one raw SSE line.
    pub fn normalize(&self, raw: &str) -> Result<NormalizedBreakerStatus, NormalizeError> {
        let record = self.decoder.decode(raw)?;
        Ok(self.projector.project(record)?)
    }

    /// Decode, project and serialize one raw SSE line.
    pub fn normalize_to_json(&self, raw: &str) -> Result<String, NormalizeError> {
        let status = self.normalize(raw)?;
        serialize(&status).map_err(NormalizeError::Serialize)
    }
}
