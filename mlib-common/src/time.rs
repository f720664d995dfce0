//! Release date utilities
//!
//! Dates are stored and served as `YYYY-MM-DD`. The metadata provider
//! reports them as `DD.MM.YYYY`, so parsing accepts both.

use chrono::NaiveDate;

/// Canonical wire and storage format
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format used by the external metadata provider
pub const EXTERNAL_DATE_FORMAT: &str = "%d.%m.%Y";

/// Parse a release date in either accepted format
///
/// Returns `Ok(None)` for an empty (or whitespace-only) string.
pub fn parse_release_date(raw: &str) -> Result<Option<NaiveDate>, chrono::ParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(raw, EXTERNAL_DATE_FORMAT))
        .map(Some)
}

/// Serde adapter for `Option<NaiveDate>` fields
///
/// Use with `#[serde(default, with = "mlib_common::time::optional_date")]`.
pub mod optional_date {
    use super::{parse_release_date, DATE_FORMAT};
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => serializer.serialize_str(&d.format(DATE_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse_release_date(&raw)
                .map_err(|e| de::Error::custom(format!("invalid date '{}': {}", raw, e))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Dated {
        #[serde(default, with = "optional_date", rename = "releaseDate")]
        release_date: Option<NaiveDate>,
    }

    #[test]
    fn test_parse_canonical_format() {
        let d = parse_release_date("1968-08-26").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(1968, 8, 26));
    }

    #[test]
    fn test_parse_external_format() {
        let d = parse_release_date("16.07.2006").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2006, 7, 16));
    }

    #[test]
    fn test_parse_empty_is_none() {
        assert_eq!(parse_release_date("").unwrap(), None);
        assert_eq!(parse_release_date("   ").unwrap(), None);
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(parse_release_date("last tuesday").is_err());
        assert!(parse_release_date("2006-13-45").is_err());
    }

    #[test]
    fn test_serde_serializes_canonical_format() {
        let dated = Dated {
            release_date: NaiveDate::from_ymd_opt(2006, 7, 16),
        };
        let json = serde_json::to_string(&dated).unwrap();
        assert_eq!(json, r#"{"releaseDate":"2006-07-16"}"#);
    }

    #[test]
    fn test_serde_missing_and_null() {
        let missing: Dated = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.release_date, None);

        let null: Dated = serde_json::from_str(r#"{"releaseDate":null}"#).unwrap();
        assert_eq!(null.release_date, None);
    }

    #[test]
    fn test_serde_rejects_invalid_date() {
        let result: Result<Dated, _> = serde_json::from_str(r#"{"releaseDate":"soon"}"#);
        assert!(result.is_err());
    }
}
