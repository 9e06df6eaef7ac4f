//! Navigator configuration
//!
//! Core only accepts fully resolved configuration. Discovery and loading of
//! configuration files happens in the CLI layer.

use crate::codec::bookmark::DEFAULT_MAX_BOOKMARK_LEN;
use crate::codec::{UrlAdapter, UrlPathAdapter, UrlQueryAdapter};
use crate::error::{Result, RouterError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Supported URL encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    /// `/<state>/<child state>`
    #[default]
    Path,
    /// `?<router>=<state>&<child router>=<child state>`
    Query,
}

impl AdapterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterKind::Path => "path",
            AdapterKind::Query => "query",
        }
    }
}

impl std::str::FromStr for AdapterKind {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "path" => Ok(AdapterKind::Path),
            "query" => Ok(AdapterKind::Query),
            other => Err(RouterError::Config(format!("unknown url adapter '{other}'"))),
        }
    }
}

/// Configuration of a navigator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Path under which all generated URLs live
    pub base_url: String,
    /// URL encoding
    pub adapter: AdapterKind,
    /// Name of the root router
    pub root_name: String,
    /// Maximum number of visited states remembered per router
    pub max_history: usize,
    /// Upper bound on the encoded bookmark parameter
    pub max_bookmark_len: usize,
}

impl NavigatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_adapter(mut self, adapter: AdapterKind) -> Self {
        self.adapter = adapter;
        self
    }

    pub fn with_root_name(mut self, root_name: impl Into<String>) -> Self {
        self.root_name = root_name.into();
        self
    }

    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    pub fn with_max_bookmark_len(mut self, max_bookmark_len: usize) -> Self {
        self.max_bookmark_len = max_bookmark_len;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.root_name.is_empty() {
            return Err(RouterError::Config("root_name must not be empty".into()));
        }
        if self.max_history == 0 {
            return Err(RouterError::Config("max_history must be at least 1".into()));
        }
        if self.max_bookmark_len < 2 {
            return Err(RouterError::Config(
                "max_bookmark_len must be at least 2".into(),
            ));
        }
        Ok(())
    }

    /// Build the URL adapter selected by this configuration
    pub fn build_adapter(&self) -> Arc<dyn UrlAdapter> {
        match self.adapter {
            AdapterKind::Path => Arc::new(UrlPathAdapter::new(&self.base_url)),
            AdapterKind::Query => Arc::new(UrlQueryAdapter::new(&self.base_url)),
        }
    }
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            base_url: "/".to_string(),
            adapter: AdapterKind::Path,
            root_name: "root".to_string(),
            max_history: 50,
            max_bookmark_len: DEFAULT_MAX_BOOKMARK_LEN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: NavigatorConfig =
            serde_json::from_str(r#"{"base_url": "/app", "adapter": "query"}"#).unwrap();
        assert_eq!(config.base_url, "/app");
        assert_eq!(config.adapter, AdapterKind::Query);
        assert_eq!(config.root_name, "root");
        assert_eq!(config.max_bookmark_len, 1024);
        config.validate().unwrap();
    }

    #[test]
    fn test_validation() {
        assert!(NavigatorConfig::new().with_max_history(0).validate().is_err());
        assert!(NavigatorConfig::new().with_root_name("").validate().is_err());
        assert!("xml".parse::<AdapterKind>().is_err());
        assert_eq!("query".parse::<AdapterKind>().unwrap(), AdapterKind::Query);
    }
}
