//! Bookmarkable data parameter
//!
//! Bookmark data is serialized to JSON and written to the URL either
//! percent-encoded (scheme tag `0`) or compressed (scheme tag `1`), whichever
//! is shorter. Exceeding the length budget is an error, never a truncation.

use super::compress;
use crate::error::{Result, RouterError};

/// Default upper bound on the encoded parameter length
pub const DEFAULT_MAX_BOOKMARK_LEN: usize = 1024;

const PLAIN_TAG: char = '0';
const COMPRESSED_TAG: char = '1';

/// Encode bookmark data into a URL-ready parameter value
pub fn encode(data: &serde_json::Value, limit: usize) -> Result<String> {
    let json = serde_json::to_string(data)?;
    let plain = urlencoding::encode(&json);
    let packed = compress::compress(&json);

    let encoded = if packed.len() < plain.len() {
        format!("{COMPRESSED_TAG}{packed}")
    } else {
        format!("{PLAIN_TAG}{plain}")
    };

    if encoded.len() > limit {
        return Err(RouterError::BookmarkTooLarge {
            length: encoded.len(),
            limit,
        });
    }
    Ok(encoded)
}

/// Decode a parameter value that has already been query-decoded
pub fn decode(param: &str) -> Result<serde_json::Value> {
    let mut chars = param.chars();
    let json = match chars.next() {
        Some(PLAIN_TAG) => chars.as_str().to_string(),
        Some(COMPRESSED_TAG) => compress::decompress(chars.as_str())?,
        Some(other) => {
            return Err(RouterError::decode(format!(
                "unknown bookmark scheme '{other}'"
            )))
        }
        None => return Err(RouterError::decode("empty bookmark parameter")),
    };
    Ok(serde_json::from_str(&json)?)
}

/// Decode a parameter value exactly as it appears in a URL query
pub fn decode_url_param(raw: &str) -> Result<serde_json::Value> {
    let param = url::form_urlencoded::parse(format!("v={raw}").as_bytes())
        .next()
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default();
    decode(&param)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_short_data_stays_plain() {
        let data = json!(12345);
        let encoded = encode(&data, DEFAULT_MAX_BOOKMARK_LEN).unwrap();
        assert!(encoded.starts_with('0'));
        assert_eq!(decode_url_param(&encoded).unwrap(), data);
    }

    #[test]
    fn test_repetitive_data_is_compressed() {
        let rows: Vec<_> = (0..20)
            .map(|i| json!({"column": "description", "order": "ascending", "row": i}))
            .collect();
        let data = json!({ "table": rows });
        let encoded = encode(&data, DEFAULT_MAX_BOOKMARK_LEN).unwrap();
        assert!(encoded.starts_with('1'));
        assert_eq!(decode_url_param(&encoded).unwrap(), data);
    }

    #[test]
    fn test_limit_is_a_hard_failure() {
        let data = json!({"blob": "x".repeat(64)});
        let err = encode(&data, 8).unwrap_err();
        assert!(matches!(err, RouterError::BookmarkTooLarge { limit: 8, .. }));
    }

    #[test]
    fn test_unknown_scheme_is_rejected() {
        assert!(decode("9{}").is_err());
        assert!(decode("").is_err());
        assert!(decode("0not json").is_err());
    }
}
