//! Event Decoder: one SSE frame in, one legacy record out.
//!
//! ```rust
//! use breakerwatch_hystrix::{decode, DecodeError};
//!
//! let record = decode(r#"data: {"group":"Payments","name":"Charge","rollingCountSuccess":"7"}"#)?;
//! assert_eq!(record.rolling_count_success, 7);
//!
//! assert!(matches!(decode("ping: {}"), Err(DecodeError::NotDataFrame)));
//! # Ok::<(), DecodeError>(())
//! ```

use serde::de::Error as _;
use serde::Deserialize;

use crate::{DecodeError, LegacyMetricsRecord};

/// Prefix every data frame starts with.
pub const DATA_PREFIX: &str = "data: ";

/// Shortest frame that can carry a payload.
pub const MIN_EVENT_LEN: usize = 8;

/// Where the JSON payload starts relative to the `data: ` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    /// Payload begins immediately after `data: ` (character index 6).
    #[default]
    Standard,
    /// Payload begins at character index 7: the legacy reader discards one
    /// extra character after the prefix.
    Legacy,
}

/// What to do with keys the legacy schema does not define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownFields {
    /// Accept and drop them. Upstream adds fields over time.
    #[default]
    Ignore,
    /// Fail with [`DecodeError::MalformedPayload`] naming the first one.
    Reject,
}

/// Configured decoder for SSE frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Decoder {
    framing: Framing,
    unknown_fields: UnknownFields,
}

impl Decoder {
    /// A decoder with standard framing that ignores unknown fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the payload framing.
    pub fn framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    /// Set the unknown-field policy.
    pub fn unknown_fields(mut self, policy: UnknownFields) -> Self {
        self.unknown_fields = policy;
        self
    }

    /// Decode one SSE frame.
    ///
    /// Checks run in order: length, prefix, then payload. Missing fields take
    /// zero values.
    pub fn decode(&self, raw: &str) -> Result<LegacyMetricsRecord, DecodeError> {
        let len = raw.chars().take(MIN_EVENT_LEN).count();
        if len < MIN_EVENT_LEN {
            return Err(DecodeError::TooShort { len });
        }

        let rest = raw.strip_prefix(DATA_PREFIX).ok_or(DecodeError::NotDataFrame)?;
        let payload = match self.framing {
            Framing::Standard => rest,
            Framing::Legacy => skip_char(rest),
        };

        let record: LegacyMetricsRecord = serde_json::from_str(payload)?;

        if self.unknown_fields == UnknownFields::Reject {
            if let Some(field) = record.unknown_fields().next() {
                return Err(DecodeError::MalformedPayload(serde_json::Error::custom(
                    format!("unknown field `{}`", field),
                )));
            }
        }

        Ok(record)
    }
}

/// Decode one SSE frame with the default [`Decoder`].
pub fn decode(raw: &str) -> Result<LegacyMetricsRecord, DecodeError> {
    Decoder::default().decode(raw)
}

fn skip_char(s: &str) -> &str {
    let mut chars = s.chars();
    chars.next();
    chars.as_str()
}
