use serde::{Deserialize, Deserializer, de};

/// Body of a chunk upload response.
///
/// Upload servers are not strict about JSON types: identifiers come back as numbers
/// or strings, flags as booleans or `0`/`1`. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChunkResponse {
    #[serde(default, deserialize_with = "flag")]
    pub finished: bool,
    #[serde(default, deserialize_with = "offset")]
    pub offset: Option<u64>,
    #[serde(default, deserialize_with = "flag")]
    pub resume: bool,
    #[serde(default, deserialize_with = "text")]
    pub fid: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub hash: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub preview: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub message: Option<String>,
}

impl ChunkResponse {
    /// Parse a success body. Bodies that are not JSON of the expected shape fail.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

/// Accepts `true`/`false`, numbers (non-zero is true), `null`.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    struct FlagVisitor;

    impl de::Visitor<'_> for FlagVisitor {
        type Value = bool;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a boolean or 0/1")
        }

        fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value)
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value != 0)
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value != 0)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(false)
        }
    }

    deserializer.deserialize_any(FlagVisitor)
}

/// Accepts non-negative integers, numeric strings, `null`.
fn offset<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    struct OffsetVisitor;

    impl de::Visitor<'_> for OffsetVisitor {
        type Value = Option<u64>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a byte offset as integer or numeric string")
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u64::try_from(value)
                .map(Some)
                .map_err(|_| E::custom(format!("negative offset {value}")))
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            let value = value.trim();
            if value.is_empty() {
                return Ok(None);
            }
            value
                .parse::<u64>()
                .map(Some)
                .map_err(|err| E::custom(format!("invalid offset {value:?}: {err}")))
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(OffsetVisitor)
}

/// Accepts strings and numbers (kept as their decimal text), `null`, `false`.
fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct TextVisitor;

    impl de::Visitor<'_> for TextVisitor {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string or number")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok((!value.is_empty()).then(|| value.to_string()))
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok((!value.is_empty()).then_some(value))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if value {
                Err(E::invalid_type(de::Unexpected::Bool(true), &self))
            } else {
                Ok(None)
            }
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(TextVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_terminal_response() {
        let body = br#"{"finished": true, "fid": "42", "hash": "abc123", "preview": "/p/42.png"}"#;
        let response = ChunkResponse::from_slice(body).unwrap();
        assert!(response.finished);
        assert_eq!(response.fid.as_deref(), Some("42"));
        assert_eq!(response.hash.as_deref(), Some("abc123"));
        assert_eq!(response.preview.as_deref(), Some("/p/42.png"));
        assert_eq!(response.offset, None);
    }

    #[test]
    fn numeric_fid_becomes_string() {
        let response = ChunkResponse::from_slice(br#"{"finished": 1, "fid": 42, "hash": "x"}"#).unwrap();
        assert!(response.finished);
        assert_eq!(response.fid.as_deref(), Some("42"));
    }

    #[test]
    fn resume_response_with_string_offset() {
        let response =
            ChunkResponse::from_slice(br#"{"finished": false, "resume": true, "offset": "1024"}"#)
                .unwrap();
        assert!(response.resume);
        assert_eq!(response.offset, Some(1024));
    }

    #[test]
    fn empty_and_null_fields_are_absent() {
        let response =
            ChunkResponse::from_slice(br#"{"fid": "", "hash": null, "offset": null, "resume": null}"#)
                .unwrap();
        assert_eq!(response, ChunkResponse::default());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let response = ChunkResponse::from_slice(br#"{"offset": 5, "server": "drupal"}"#).unwrap();
        assert_eq!(response.offset, Some(5));
    }

    #[test]
    fn rejects_non_objects_and_bad_types() {
        assert!(ChunkResponse::from_slice(b"<html></html>").is_err());
        assert!(ChunkResponse::from_slice(b"42").is_err());
        assert!(ChunkResponse::from_slice(b"").is_err());
        assert!(ChunkResponse::from_slice(br#"{"offset": -5}"#).is_err());
        assert!(ChunkResponse::from_slice(br#"{"offset": "soon"}"#).is_err());
        assert!(ChunkResponse::from_slice(br#"{"finished": "yes"}"#).is_err());
    }
}
