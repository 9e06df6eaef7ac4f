//! State identifiers and state descriptors
//!
//! A router moves between states. Each state is described once when the
//! router is configured and is treated as immutable afterwards.

use crate::hooks::{Action, Guard};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Unique identifier of a state within one router
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateId(pub String);

impl StateId {
    /// Create a new state ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StateId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for StateId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&StateId> for StateId {
    fn from(id: &StateId) -> Self {
        id.clone()
    }
}

/// Page title of a state, either fixed or computed on demand
#[derive(Clone)]
pub enum Title {
    Literal(String),
    Computed(Arc<dyn Fn() -> String + Send + Sync>),
}

impl Title {
    /// Resolve the title text
    pub fn resolve(&self) -> String {
        match self {
            Title::Literal(text) => text.clone(),
            Title::Computed(f) => f(),
        }
    }
}

impl fmt::Debug for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Title::Literal(text) => write!(f, "Title::Literal({text:?})"),
            Title::Computed(_) => write!(f, "Title::Computed(_)"),
        }
    }
}

/// State descriptor containing metadata and lifecycle hooks
#[derive(Debug, Clone)]
pub struct RouterState {
    /// Unique identifier for this state
    pub id: StateId,
    /// Human-readable label
    pub label: String,
    /// Opaque value associated with the state
    pub value: serde_json::Value,
    /// Optional page title
    pub title: Option<Title>,
    /// Guard consulted before the state is entered
    pub can_enter: Option<Guard>,
    /// Action run after the state became current
    pub enter: Option<Action>,
    /// Guard consulted before the state is left
    pub can_exit: Option<Guard>,
    /// Action run before the state stops being current
    pub exit: Option<Action>,
}

impl RouterState {
    /// Create a new state whose label defaults to its identifier
    pub fn new(id: impl Into<StateId>) -> Self {
        let id = id.into();
        Self {
            label: id.0.clone(),
            id,
            value: serde_json::Value::Null,
            title: None,
            can_enter: None,
            enter: None,
            can_exit: None,
            exit: None,
        }
    }

    /// Set the display label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the associated value
    pub fn with_value(mut self, value: serde_json::Value) -> Self {
        self.value = value;
        self
    }

    /// Set a literal page title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(Title::Literal(title.into()));
        self
    }

    /// Set a computed page title
    pub fn with_title_fn<F>(mut self, f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.title = Some(Title::Computed(Arc::new(f)));
        self
    }

    pub fn with_can_enter(mut self, guard: Guard) -> Self {
        self.can_enter = Some(guard);
        self
    }

    pub fn with_enter(mut self, action: Action) -> Self {
        self.enter = Some(action);
        self
    }

    pub fn with_can_exit(mut self, guard: Guard) -> Self {
        self.can_exit = Some(guard);
        self
    }

    pub fn with_exit(mut self, action: Action) -> Self {
        self.exit = Some(action);
        self
    }

    /// Text used for the document title: the non-empty title, else the label
    pub fn display_title(&self) -> Option<String> {
        let title = self.title.as_ref().map(Title::resolve).unwrap_or_default();
        if !title.is_empty() {
            Some(title)
        } else if !self.label.is_empty() {
            Some(self.label.clone())
        } else {
            None
        }
    }
}
