//! Query-parameter URL encoding: `<base>?root=<state>&child=<state>`

use super::{
    normalize_base, push_bookmark, split_url, trim_defaults, ParsedUrl, UrlAdapter, UrlSegment,
    UrlValues, BOOKMARK_PARAM,
};
use crate::error::Result;
use crate::state::StateId;
use std::collections::HashMap;

/// Encodes router states as `router-name=state` query parameters
#[derive(Debug, Clone)]
pub struct UrlQueryAdapter {
    base: String,
}

impl UrlQueryAdapter {
    pub fn new(base_url: &str) -> Self {
        let base = normalize_base(base_url);
        Self {
            base: if base.is_empty() { "/".to_string() } else { base },
        }
    }
}

impl Default for UrlQueryAdapter {
    fn default() -> Self {
        Self::new("/")
    }
}

impl UrlAdapter for UrlQueryAdapter {
    fn encode(&self, chain: &[UrlSegment], bookmark: Option<&str>) -> String {
        let mut pairs: Vec<String> = trim_defaults(chain)
            .iter()
            .filter_map(|segment| {
                segment.state.as_ref().map(|state| {
                    format!(
                        "{}={}",
                        urlencoding::encode(&segment.router),
                        urlencoding::encode(state.as_str())
                    )
                })
            })
            .collect();
        push_bookmark(&mut pairs, bookmark);

        if pairs.is_empty() {
            self.base.clone()
        } else {
            format!("{}?{}", self.base, pairs.join("&"))
        }
    }

    fn decode(&self, url: &str) -> Result<ParsedUrl> {
        let (_, params) = split_url(url)?;

        let mut values = HashMap::new();
        let mut bookmark = None;
        for (name, value) in params {
            if name == BOOKMARK_PARAM {
                bookmark = Some(value);
            } else {
                values.entry(name).or_insert_with(|| StateId::from(value));
            }
        }

        Ok(ParsedUrl {
            values: UrlValues::Params(values),
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
    fn test_params_in_chain_order() {
        let adapter = UrlQueryAdapter::new("/index.html");
        let chain = vec![seg("root", "book", "home"), seg("chapter", "ch 2", "ch1")];
        assert_eq!(
            adapter.encode(&chain, None),
            "/index.html?root=book&chapter=ch%202"
        );
    }

    #[test]
    fn test_trailing_defaults_are_trimmed() {
        let adapter = UrlQueryAdapter::default();
        let chain = vec![seg("root", "home", "home")];
        assert_eq!(adapter.encode(&chain, None), "/");
        assert_eq!(adapter.encode(&chain, Some("0%5B%5D")), "/?_state=0%5B%5D");
    }

    #[test]
    fn test_decode_by_router_name() {
        let adapter = UrlQueryAdapter::default();
        let parsed = adapter
            .decode("/?chapter=ch%202&root=book&_state=0%5B%5D")
            .unwrap();
        assert_eq!(parsed.value_for(0, "root"), Some(&StateId::from("book")));
        assert_eq!(parsed.value_for(7, "chapter"), Some(&StateId::from("ch 2")));
        assert_eq!(parsed.value_for(1, "missing"), None);
        assert_eq!(parsed.bookmark.as_deref(), Some("0[]"));
        assert!(parsed.remainder(1).is_empty());
    }
}
