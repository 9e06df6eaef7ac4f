//! Route map file format
//!
//! A route map describes a navigator configuration and a tree of routers:
//!
//! ```json
//! {
//!   "navigator": { "base_url": "/", "adapter": "path" },
//!   "router": {
//!     "default": "home",
//!     "states": [{ "id": "home", "title": "Home" }, { "id": "book" }],
//!     "children": [
//!       { "name": "chapter", "parent_state": "book", "default": "ch1",
//!         "states": [{ "id": "ch1" }, { "id": "ch2" }] }
//!     ]
//!   }
//! }
//! ```

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use waymark_core::{Guard, HistoryBackend, Navigator, NavigatorConfig, Router, RouterState};

/// One state of a router
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSpec {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub value: serde_json::Value,
    /// Fixed answer of the `can_enter` guard
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_enter: Option<bool>,
    /// Fixed answer of the `can_exit` guard
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_exit: Option<bool>,
}

impl StateSpec {
    fn to_state(&self) -> RouterState {
        let mut state = RouterState::new(self.id.as_str()).with_value(self.value.clone());
        if let Some(label) = &self.label {
            state = state.with_label(label.clone());
        }
        if let Some(title) = &self.title {
            state = state.with_title(title.clone());
        }
        if let Some(allow) = self.can_enter {
            state = state.with_can_enter(Guard::constant(allow));
        }
        if let Some(allow) = self.can_exit {
            state = state.with_can_exit(Guard::constant(allow));
        }
        state
    }
}

/// A router and its children
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouterSpec {
    /// Router name; the root takes its name from the navigator configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Parent state activating this router, any state when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default)]
    pub states: Vec<StateSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RouterSpec>,
}

impl RouterSpec {
    fn apply(&self, router: &Router) -> Result<()> {
        router
            .configure(self.states.iter().map(StateSpec::to_state))
            .with_context(|| format!("Failed to configure router '{}'", router.name()))?;
        if let Some(default) = &self.default {
            router
                .set_default_state_id(Some(default.as_str()))
                .with_context(|| format!("Invalid default state for router '{}'", router.name()))?;
        }

        for child in &self.children {
            let name = child
                .name
                .as_deref()
                .ok_or_else(|| anyhow!("Child of router '{}' has no name", router.name()))?;
            let handle = router
                .create_child_router(name, child.parent_state.as_deref())
                .with_context(|| format!("Failed to create router '{name}'"))?;
            child.apply(&handle)?;
        }
        Ok(())
    }
}

/// Navigator configuration plus router tree
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteMap {
    #[serde(default)]
    pub navigator: NavigatorConfig,
    #[serde(default)]
    pub router: RouterSpec,
}

impl RouteMap {
    /// Built-in map used when no configuration file is found
    pub fn demo() -> Self {
        let state = |id: &str, title: Option<&str>| StateSpec {
            id: id.to_string(),
            label: None,
            title: title.map(str::to_string),
            value: serde_json::Value::Null,
            can_enter: None,
            can_exit: None,
        };

        Self {
            navigator: NavigatorConfig::default(),
            router: RouterSpec {
                name: None,
                parent_state: None,
                default: Some("home".to_string()),
                states: vec![
                    state("home", Some("Home")),
                    state("book", Some("Book")),
                    state("tables", Some("Tables")),
                ],
                children: vec![RouterSpec {
                    name: Some("chapter".to_string()),
                    parent_state: Some("book".to_string()),
                    default: Some("ch1".to_string()),
                    states: vec![
                        state("ch1", Some("Chapter 1")),
                        state("ch2", Some("Chapter 2")),
                        state("ch3", Some("Chapter 3")),
                    ],
                    children: Vec::new(),
                }],
            },
        }
    }

    /// Build a navigator writing to `history` and configure its routers
    pub fn build(&self, history: Arc<dyn HistoryBackend>) -> Result<Navigator> {
        let navigator = Navigator::new(self.navigator.clone(), history)
            .context("Invalid navigator configuration")?;
        self.router.apply(&navigator.root())?;
        Ok(navigator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waymark_core::MemoryHistory;

    #[test]
    fn test_parse_route_map() {
        let map: RouteMap = serde_json::from_str(
            r#"{
                "navigator": { "adapter": "query" },
                "router": {
                    "default": "home",
                    "states": [{ "id": "home" }, { "id": "book", "can_exit": false }],
                    "children": [{ "name": "chapter", "parent_state": "book",
                                   "states": [{ "id": "ch1", "label": "One" }] }]
                }
            }"#,
        )
        .unwrap();

        assert_eq!(map.navigator.adapter, waymark_core::AdapterKind::Query);
        assert_eq!(map.router.children[0].states[0].label.as_deref(), Some("One"));
        assert_eq!(map.router.states[1].can_exit, Some(false));
    }

    #[tokio::test]
    async fn test_demo_map_builds() {
        let navigator = RouteMap::demo()
            .build(Arc::new(MemoryHistory::new("/book/ch2")))
            .unwrap();
        navigator.sync().await.unwrap();

        let chapter = navigator.router("chapter").unwrap();
        assert_eq!(chapter.state_id().unwrap().as_str(), "ch2");
        assert_eq!(navigator.title(), "Chapter 2 | Book");
    }

    #[test]
    fn test_unnamed_child_is_rejected() {
        let mut map = RouteMap::demo();
        map.router.children[0].name = None;
        assert!(map.build(Arc::new(MemoryHistory::default())).is_err());
    }
}
