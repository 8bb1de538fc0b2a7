//! Timestamps encoded as fractional epoch seconds, millisecond precision.
//!
//! Use with `#[serde(with = "jsonwire_core::json::epoch_seconds")]` on a
//! `DateTime<Utc>` field, or the [`option`] variant on `Option<DateTime<Utc>>`.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(to_seconds(value))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let seconds = f64::deserialize(deserializer)?;
    from_seconds(seconds)
        .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {seconds}")))
}

fn to_seconds(value: &DateTime<Utc>) -> f64 {
    value.timestamp_millis() as f64 / 1000.0
}

fn from_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis((seconds * 1000.0).round() as i64)
}

pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_some(&to_seconds(v)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<f64>::deserialize(deserializer)? {
            Some(seconds) => from_seconds(seconds)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {seconds}"))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    struct Stamped {
        #[serde(with = "super")]
        at: DateTime<Utc>,
        #[serde(default, with = "super::option")]
        maybe: Option<DateTime<Utc>>,
    }

    #[test]
    fn test_fractional_seconds() {
        let s: Stamped = serde_json::from_str(r#"{"at":1398796238.123}"#).unwrap();
        assert_eq!(s.at.timestamp_millis(), 1398796238123);
        assert!(s.maybe.is_none());
    }

    #[test]
    fn test_integer_seconds() {
        let s: Stamped = serde_json::from_str(r#"{"at":0,"maybe":1.5}"#).unwrap();
        assert_eq!(s.at.timestamp_millis(), 0);
        assert_eq!(s.maybe.unwrap().timestamp_millis(), 1500);
    }

    #[test]
    fn test_serialize_seconds() {
        let at = DateTime::from_timestamp_millis(1398796238123).unwrap();
        let json = serde_json::to_value(Stamped { at, maybe: None }).unwrap();
        assert_eq!(json["at"], serde_json::json!(1398796238.123));
        assert!(json["maybe"].is_null());
    }

    #[test]
    fn test_rejects_string() {
        let err = serde_json::from_str::<Stamped>(r#"{"at":"yesterday"}"#).unwrap_err();
        assert!(err.is_data());
    }
}
