//! URL codecs
//!
//! A [`UrlAdapter`] maps the active chain of router states to a URL and back.
//! Two encodings are provided: path segments ([`UrlPathAdapter`]) and query
//! parameters ([`UrlQueryAdapter`]). Both carry bookmarkable data in the
//! reserved [`BOOKMARK_PARAM`] query parameter.

pub mod bookmark;
pub mod compress;
pub mod path;
pub mod query;

pub use path::UrlPathAdapter;
pub use query::UrlQueryAdapter;

use crate::error::{Result, RouterError};
use crate::state::StateId;
use std::collections::HashMap;

/// Query parameter reserved for bookmarkable data
pub const BOOKMARK_PARAM: &str = "_state";

/// One router of the active chain, as seen by an encoder
#[derive(Debug, Clone, PartialEq)]
pub struct UrlSegment {
    /// Router name
    pub router: String,
    /// Current (or target) state
    pub state: Option<StateId>,
    /// Default state of the router
    pub default: Option<StateId>,
}

impl UrlSegment {
    fn is_default(&self) -> bool {
        self.state.is_none() || self.state == self.default
    }
}

/// Router values extracted from a URL
#[derive(Debug, Clone, PartialEq)]
pub enum UrlValues {
    /// Positional values, root first
    Segments(Vec<StateId>),
    /// Values keyed by router name
    Params(HashMap<String, StateId>),
}

/// Result of parsing a URL
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedUrl {
    pub values: UrlValues,
    /// Query-decoded bookmark parameter, if present
    pub bookmark: Option<String>,
}

impl ParsedUrl {
    /// Value for the router at `depth` of the active chain named `name`
    pub fn value_for(&self, depth: usize, name: &str) -> Option<&StateId> {
        match &self.values {
            UrlValues::Segments(segments) => segments.get(depth),
            UrlValues::Params(params) => params.get(name),
        }
    }

    /// Positional values past the given chain length
    pub fn remainder(&self, chain_len: usize) -> Vec<String> {
        match &self.values {
            UrlValues::Segments(segments) => segments
                .iter()
                .skip(chain_len)
                .map(|s| s.0.clone())
                .collect(),
            UrlValues::Params(_) => Vec::new(),
        }
    }
}

/// Bidirectional mapping between router states and URLs
pub trait UrlAdapter: Send + Sync {
    /// Encode the active chain (root first) and an optional URL-ready
    /// bookmark parameter value
    fn encode(&self, chain: &[UrlSegment], bookmark: Option<&str>) -> String;

    /// Parse a URL produced by [`UrlAdapter::encode`] or typed by a user
    fn decode(&self, url: &str) -> Result<ParsedUrl>;
}

/// Drop trailing segments that hold their router's default value
pub(crate) fn trim_defaults(chain: &[UrlSegment]) -> &[UrlSegment] {
    let keep = chain
        .iter()
        .rposition(|segment| !segment.is_default())
        .map(|pos| pos + 1)
        .unwrap_or(0);
    &chain[..keep]
}

/// Normalize a configured base URL to a leading-slash form without a
/// trailing slash (the site root becomes an empty prefix)
pub(crate) fn normalize_base(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Split a URL into its path and query-decoded parameters
pub(crate) fn split_url(input: &str) -> Result<(String, Vec<(String, String)>)> {
    let origin = url::Url::parse("http://localhost/")
        .map_err(|e| RouterError::decode(e.to_string()))?;
    let parsed = origin
        .join(input)
        .map_err(|e| RouterError::decode(format!("{input}: {e}")))?;
    let params = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    Ok((parsed.path().to_string(), params))
}

/// Percent-decode one path segment or parameter value
pub(crate) fn decode_component(raw: &str) -> Result<String> {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .map_err(|e| RouterError::decode(e.to_string()))
}

/// Append the bookmark parameter to a query string under construction
pub(crate) fn push_bookmark(pairs: &mut Vec<String>, bookmark: Option<&str>) {
    if let Some(value) = bookmark {
        pairs.push(format!("{BOOKMARK_PARAM}={value}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(router: &str, state: Option<&str>, default: Option<&str>) -> UrlSegment {
        UrlSegment {
            router: router.to_string(),
            state: state.map(StateId::from),
            default: default.map(StateId::from),
        }
    }

    #[test]
    fn test_trim_stops_at_first_non_default() {
        let chain = vec![
            seg("root", Some("home"), Some("home")),
            seg("book", Some("ch2"), Some("ch1")),
            seg("page", Some("p1"), Some("p1")),
        ];
        let trimmed = trim_defaults(&chain);
        assert_eq!(trimmed.len(), 2);

        let all_default = vec![seg("root", Some("home"), Some("home"))];
        assert!(trim_defaults(&all_default).is_empty());
    }

    #[test]
    fn test_normalize_base() {
        assert_eq!(normalize_base("/"), "");
        assert_eq!(normalize_base(""), "");
        assert_eq!(normalize_base("app/"), "/app");
        assert_eq!(normalize_base("/app/shell"), "/app/shell");
    }

    #[test]
    fn test_split_url_decodes_query() {
        let (path, params) = split_url("/app/a%20b?root=x%2Fy&_state=0%7B%7D").unwrap();
        assert_eq!(path, "/app/a%20b");
        assert_eq!(
            params,
            vec![
                ("root".to_string(), "x/y".to_string()),
                ("_state".to_string(), "0{}".to_string())
            ]
        );
    }
}
