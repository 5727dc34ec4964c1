//! Error types for decoding and projecting legacy events.

use std::num::ParseIntError;

use thiserror::Error;

/// Errors that can occur when decoding one SSE frame.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame is too short to hold a data event.
    #[error("Event string too short to parse ({len} characters)")]
    TooShort {
        /// Number of characters in the frame.
        len: usize,
    },

    /// The frame is not an SSE `data: ` frame (e.g. a `ping:` keep-alive).
    #[error("Can't parse non-data event")]
    NotDataFrame,

    /// The payload is not a JSON object matching the legacy schema.
    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

/// Errors that can occur when projecting a legacy record.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// `currentTime` is not a decimal millisecond count, or is out of range.
    #[error("Invalid currentTime {value:?}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: Option<ParseIntError>,
    },
}

/// Any failure turning one raw line into a normalized record.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Project(#[from] ProjectError),

    /// Serializing the normalized record failed.
    #[error("Failed to serialize record: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl NormalizeError {
    /// Stable label for counting and logging.
    pub fn kind(&self) -> &'static str {
        match self {
            NormalizeError::Decode(DecodeError::TooShort { .. }) => "too_short",
            NormalizeError::Decode(DecodeError::NotDataFrame) => "not_data_frame",
            NormalizeError::Decode(DecodeError::MalformedPayload(_)) => "malformed_payload",
            NormalizeError::Project(ProjectError::InvalidTimestamp { .. }) => "invalid_timestamp",
            NormalizeError::Serialize(_) => "serialize",
        }
    }

    /// True for lines that are not metrics events at all.
    ///
    /// SSE keep-alives and comments land here; they are expected traffic
    /// rather than corrupt data.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            NormalizeError::Decode(DecodeError::TooShort { .. } | DecodeError::NotDataFrame)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        let err = NormalizeError::from(DecodeError::TooShort { len: 7 });
        assert_eq!(err.kind(), "too_short");
        assert!(err.is_framing());

        let err = NormalizeError::from(DecodeError::NotDataFrame);
        assert_eq!(err.kind(), "not_data_frame");
        assert!(err.is_framing());

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = NormalizeError::from(DecodeError::from(json_err));
        assert_eq!(err.kind(), "malformed_payload");
        assert!(!err.is_framing());

        let err = NormalizeError::from(ProjectError::InvalidTimestamp {
            value: "soon".to_string(),
            source: None,
        });
        assert_eq!(err.kind(), "invalid_timestamp");
        assert!(!err.is_framing());
    }

    #[test]
    fn test_display() {
        let err = DecodeError::TooShort { len: 7 };
        assert_eq!(err.to_string(), "Event string too short to parse (7 characters)");

        let err = ProjectError::InvalidTimestamp {
            value: "soon".to_string(),
            source: None,
        };
        assert_eq!(err.to_string(), "Invalid currentTime \"soon\"");
    }
}
