use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;

use crate::error::CoreError;

/// Reference epoch for numeric date encoding: 2001-01-01T00:00:00Z.
/// This is what the Swift client's `JSONEncoder` emits for `Date` by
/// default (seconds since the Apple reference date), so numeric dates on
/// the wire are offsets from this instant, not from the Unix epoch.
pub static REFERENCE_EPOCH: LazyLock<DateTime<Utc>> = LazyLock::new(|| {
    Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0)
        .single()
        .expect("reference epoch is a valid UTC instant")
});

/// Output representation for a date field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateMode {
    /// UTC ISO-8601 with a trailing `Z` (canonical outbound form).
    Iso8601,
    /// Fractional seconds offset from [`REFERENCE_EPOCH`].
    EpochOffset,
}

/// Decode a flexible wire date. Accepts:
/// 1. a JSON number — signed fractional seconds offset from the reference
///    epoch;
/// 2. a JSON string — ISO-8601, where a trailing `Z` means `+00:00` and a
///    missing offset means UTC.
///
/// `field` is the wire name of the field being decoded, used in the error.
pub fn decode(field: &str, raw: &Value) -> Result<DateTime<Utc>, CoreError> {
    try_decode(raw).ok_or_else(|| CoreError::InvalidDateFormat {
        field: field.to_string(),
        received: CoreError::received_repr(raw),
    })
}

fn try_decode(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::Number(n) => from_epoch_offset(n.as_f64()?),
        Value::String(s) => parse_iso8601(s),
        _ => None,
    }
}

fn from_epoch_offset(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let micros = (seconds * 1_000_000.0).round();
    if micros < i64::MIN as f64 || micros > i64::MAX as f64 {
        return None;
    }
    REFERENCE_EPOCH.checked_add_signed(TimeDelta::microseconds(micros as i64))
}

fn parse_iso8601(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Offset-less timestamps ("2025-03-01T09:30:00") are taken as UTC,
    // matching the permissive backend the Swift client was built against.
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Encode a timestamp in the requested mode. Exact inverse of [`decode`]
/// per mode, to sub-second precision.
pub fn encode(t: DateTime<Utc>, mode: DateMode) -> Value {
    match mode {
        DateMode::Iso8601 => Value::String(encode_iso8601(t)),
        DateMode::EpochOffset => serde_json::Number::from_f64(epoch_offset_seconds(t))
            .map(Value::Number)
            .unwrap_or(Value::Null),
    }
}

/// UTC ISO-8601 with a trailing `Z`, never a numeric offset suffix.
pub fn encode_iso8601(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Fractional seconds between `t` and the reference epoch.
pub fn epoch_offset_seconds(t: DateTime<Utc>) -> f64 {
    let delta = t.signed_duration_since(*REFERENCE_EPOCH);
    match delta.num_microseconds() {
        Some(micros) => micros as f64 / 1_000_000.0,
        // Microsecond count overflows i64 only for dates hundreds of
        // thousands of years out; fall back to whole seconds there.
        None => delta.num_seconds() as f64,
    }
}

/// Serde adapter for required flexible date fields:
/// `#[serde(with = "dates::flexible")]`.
pub mod flexible {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        try_decode(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "expected seconds since 2001-01-01T00:00:00Z or an ISO-8601 string, got {}",
                CoreError::received_repr(&raw)
            ))
        })
    }

    pub fn serialize<S>(t: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&encode_iso8601(*t))
    }
}

/// Serde adapter for optional flexible date fields:
/// `#[serde(default, with = "dates::flexible_opt")]`.
pub mod flexible_opt {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        if raw.is_null() {
            return Ok(None);
        }
        try_decode(&raw).map(Some).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "expected seconds since 2001-01-01T00:00:00Z, an ISO-8601 string, or null, got {}",
                CoreError::received_repr(&raw)
            ))
        })
    }

    pub fn serialize<S>(t: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match t {
            Some(t) => serializer.serialize_some(&encode_iso8601(*t)),
            None => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn numeric_offset_decodes_relative_to_reference_epoch() {
        let t = decode("date", &json!(0.0)).unwrap();
        assert_eq!(t, *REFERENCE_EPOCH);

        let t = decode("date", &json!(86_400.0)).unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2001, 1, 2, 0, 0, 0).unwrap());

        let t = decode("date", &json!(-3600)).unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2000, 12, 31, 23, 0, 0).unwrap());
    }

    #[test]
    fn iso8601_with_z_suffix_decodes_as_utc() {
        let t = decode("date", &json!("2025-03-01T09:30:00Z")).unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap());

        let explicit = decode("date", &json!("2025-03-01T09:30:00+00:00")).unwrap();
        assert_eq!(t, explicit);
    }

    #[test]
    fn non_utc_offsets_normalize_to_utc() {
        let t = decode("date", &json!("2025-03-01T11:30:00+02:00")).unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap());
    }

    #[test]
    fn unparseable_input_fails_with_field_and_value() {
        let err = decode("goalDeadline", &json!("next tuesday")).unwrap_err();
        match err {
            CoreError::InvalidDateFormat { field, received } => {
                assert_eq!(field, "goalDeadline");
                assert!(received.contains("next tuesday"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(decode("date", &json!(["2025"])).is_err());
        assert!(decode("date", &json!(null)).is_err());
    }

    #[test]
    fn epoch_offset_round_trips_within_tolerance() {
        for offset in [0.0, 1.5, -7200.25, 782_049_600.0] {
            let t = decode("date", &json!(offset)).unwrap();
            let back = epoch_offset_seconds(t);
            assert!((back - offset).abs() < 1e-6, "offset {offset} came back as {back}");
        }
    }

    #[test]
    fn iso8601_round_trips_to_same_instant() {
        let t = decode("date", &json!("2025-07-14T18:04:05.250Z")).unwrap();
        let encoded = encode_iso8601(t);
        assert!(encoded.ends_with('Z'), "expected Z suffix, got {encoded}");
        let again = decode("date", &json!(encoded)).unwrap();
        assert_eq!(t, again);
    }

    #[test]
    fn encode_modes_are_inverses_of_decode() {
        let t = Utc.with_ymd_and_hms(2024, 11, 5, 6, 0, 0).unwrap();
        let iso = encode(t, DateMode::Iso8601);
        assert_eq!(decode("date", &iso).unwrap(), t);

        let offset = encode(t, DateMode::EpochOffset);
        assert_eq!(decode("date", &offset).unwrap(), t);
    }
}
