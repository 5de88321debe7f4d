//! Lenient decoders for loosely typed remote payloads.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

/// `null` or a missing list decodes as an empty list.
pub fn vec_or_default<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// `null` or a missing string reads as `fallback`.
pub fn string_or<'de, D>(deserializer: D, fallback: &str) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(|| fallback.to_string()))
}

/// Accepts a JSON number or a numeric string; anything else reads as `None`.
pub fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

pub fn number_from_value(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Server timestamps arrive either with an offset or as naive UTC.
pub fn flexible_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };

    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }

    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Some(naive.and_utc()))
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[derive(Deserialize)]
    struct Stamped {
        #[serde(default, deserialize_with = "flexible_timestamp")]
        created_at: Option<DateTime<Utc>>,
    }

    #[test]
    fn naive_and_offset_timestamps_parse() {
        let naive: Stamped =
            serde_json::from_str(r#"{"created_at": "2024-03-01T08:30:00.123456"}"#).unwrap();
        let ts = naive.created_at.unwrap();
        assert_eq!((ts.month(), ts.hour()), (3, 8));

        let offset: Stamped =
            serde_json::from_str(r#"{"created_at": "2024-03-01T08:30:00+08:00"}"#).unwrap();
        assert_eq!(offset.created_at.unwrap().hour(), 0);

        let missing: Stamped = serde_json::from_str("{}").unwrap();
        assert!(missing.created_at.is_none());
    }

    #[test]
    fn numbers_accept_strings() {
        assert_eq!(number_from_value(&serde_json::json!("31.25")), Some(31.25));
        assert_eq!(number_from_value(&serde_json::json!(7)), Some(7.0));
        assert_eq!(number_from_value(&serde_json::json!("n/a")), None);
        assert_eq!(number_from_value(&serde_json::json!(null)), None);
    }
}
