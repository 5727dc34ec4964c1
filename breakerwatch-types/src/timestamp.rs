//! RFC 3339 timestamp serialization.

/// Serde adapter rendering `DateTime<Utc>` as RFC 3339 with whole seconds and
/// a `Z` suffix, e.g. `2021-01-01T00:00:00Z`.
///
/// Sub-second precision is dropped on output. Any RFC 3339 offset is accepted
/// on input and normalized to UTC.
pub mod rfc3339 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Stamped {
        #[serde(with = "super::rfc3339")]
        at: DateTime<Utc>,
    }

    #[test]
    fn test_sub_second_precision_dropped() {
        let at = DateTime::from_timestamp(1_609_459_200, 500_000).unwrap();
        let json = serde_json::to_string(&Stamped { at }).unwrap();
        assert_eq!(json, r#"{"at":"2021-01-01T00:00:00Z"}"#);
    }

    #[test]
    fn test_offsets_normalized_to_utc() {
        let parsed: Stamped = serde_json::from_str(r#"{"at":"2021-01-01T02:00:00+02:00"}"#).unwrap();
        assert_eq!(parsed.at, DateTime::from_timestamp(1_609_459_200, 0).unwrap());
    }

    #[test]
    fn test_rejects_non_rfc3339() {
        let result: Result<Stamped, _> = serde_json::from_str(r#"{"at":"1609459200000"}"#);
        assert!(result.is_err());
    }
}
