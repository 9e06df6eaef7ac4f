//! Path-segment URL encoding: `<base>/<root state>/<child state>/...`

use super::{
    decode_component, normalize_base, push_bookmark, split_url, trim_defaults, ParsedUrl,
    UrlAdapter, UrlSegment, UrlValues, BOOKMARK_PARAM,
};
use crate::error::{Result, RouterError};
use crate::state::StateId;

/// Encodes router states as path segments below a base path
#[derive(Debug, Clone)]
pub struct UrlPathAdapter {
    base: String,
}

impl UrlPathAdapter {
    pub fn new(base_url: &str) -> Self {
        Self {
            base: normalize_base(base_url),
        }
    }

    fn base_path(&self) -> String {
        if self.base.is_empty() {
            "/".to_string()
        } else {
            self.base.clone()
        }
    }
}

impl Default for UrlPathAdapter {
    fn default() -> Self {
        Self::new("/")
    }
}

impl UrlAdapter for UrlPathAdapter {
    fn encode(&self, chain: &[UrlSegment], bookmark: Option<&str>) -> String {
        let segments: Vec<String> = trim_defaults(chain)
            .iter()
            .map(|segment| {
                segment
                    .state
                    .as_ref()
                    .map(|s| urlencoding::encode(s.as_str()).into_owned())
                    .unwrap_or_default()
            })
            .collect();

        let mut url = if segments.is_empty() {
            self.base_path()
        } else {
            format!("{}/{}", self.base, segments.join("/"))
        };

        let mut pairs = Vec::new();
        push_bookmark(&mut pairs, bookmark);
        if !pairs.is_empty() {
            url.push('?');
            url.push_str(&pairs.join("&"));
        }
        url
    }

    fn decode(&self, url: &str) -> Result<ParsedUrl> {
        let (path, params) = split_url(url)?;

        let rest = if self.base.is_empty() {
            path.as_str()
        } else {
            match path.strip_prefix(&self.base) {
                Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
                _ => {
                    return Err(RouterError::invalid_path(
                        path.clone(),
                        format!("outside of base url '{}'", self.base),
                    ))
                }
            }
        };

        let segments = rest
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| decode_component(s).map(StateId::from))
            .collect::<Result<Vec<_>>>()?;

        let bookmark = params
            .into_iter()
            .find(|(name, _)| name == BOOKMARK_PARAM)
            .map(|(_, value)| value);

        Ok(ParsedUrl {
            values: UrlValues::Segments(segments),
            bookmark,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(router: &str, state: &str, default: &str) -> UrlSegment {
        UrlSegment {
            router: router.to_string(),
            state: Some(StateId::from(state)),
            default: Some(StateId::from(default)),
        }
    }

    #[test]
    fn test_default_state_yields_base_path() {
        let adapter = UrlPathAdapter::new("/");
        assert_eq!(adapter.encode(&[seg("root", "home", "home")], None), "/");

        let adapter = UrlPathAdapter::new("/app/");
        assert_eq!(adapter.encode(&[seg("root", "home", "home")], None), "/app");
    }

    #[test]
    fn test_trailing_defaults_are_trimmed() {
        let adapter = UrlPathAdapter::default();
        let chain = vec![seg("book", "ch2", "ch1"), seg("page", "p1", "p1")];
        assert_eq!(adapter.encode(&chain, None), "/ch2");

        let chain = vec![seg("book", "ch1", "ch1"), seg("page", "p2", "p1")];
        assert_eq!(adapter.encode(&chain, None), "/ch1/p2");
    }

    #[test]
    fn test_segments_are_percent_encoded() {
        let adapter = UrlPathAdapter::new("/app");
        let url = adapter.encode(&[seg("root", "a b", "home")], Some("0%7B%7D"));
        assert_eq!(url, "/app/a%20b?_state=0%7B%7D");

        let parsed = adapter.decode(&url).unwrap();
        assert_eq!(parsed.value_for(0, "root"), Some(&StateId::from("a b")));
        assert_eq!(parsed.bookmark.as_deref(), Some("0{}"));
    }

    #[test]
    fn test_decode_outside_base_fails() {
        let adapter = UrlPathAdapter::new("/app");
        assert!(adapter.decode("/other/x").is_err());
        assert!(adapter.decode("/application").is_err());

        let parsed = adapter.decode("/app").unwrap();
        assert_eq!(parsed.values, UrlValues::Segments(Vec::new()));
    }
}
