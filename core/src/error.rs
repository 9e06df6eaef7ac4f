//! Error types and handling for Waymark Core

use thiserror::Error;

/// Result type alias for router operations
pub type Result<T> = std::result::Result<T, RouterError>;

/// Main error type for Waymark Core
///
/// The type is `Clone` because a single hook failure is delivered to every
/// caller whose transition was discarded from the queue.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RouterError {
    /// A path could not be resolved against the router tree
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// A state identifier is unknown to the router it was addressed to
    #[error("State '{state}' not found in router '{router}'")]
    UnknownState { router: String, state: String },

    /// A router handle points at a disposed or unknown router
    #[error("Router '{0}' not found")]
    UnknownRouter(String),

    /// A child router is already bound to the same parent state
    #[error("Router '{parent}' already has a child bound to {binding}")]
    DuplicateChild { parent: String, binding: String },

    /// A router name is empty, duplicated or reserved
    #[error("Invalid router name '{0}'")]
    InvalidName(String),

    /// The router has no states configured
    #[error("Router '{0}' has no states configured")]
    NotConfigured(String),

    /// Encoded bookmarkable data exceeds the URL budget
    #[error("Bookmarkable data too large: {length} characters (limit {limit})")]
    BookmarkTooLarge { length: usize, limit: usize },

    /// Malformed URL or bookmark parameter
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// A lifecycle hook failed
    #[error("Hook error in state '{state}': {message}")]
    Hook { state: String, message: String },

    /// The navigator was disposed
    #[error("Navigator has been disposed")]
    Disposed,

    /// The transition queue dropped a request without settling it
    #[error("Transition queue closed")]
    QueueClosed,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

impl RouterError {
    /// Build an invalid path error
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        RouterError::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Build a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        RouterError::Decode {
            message: message.into(),
        }
    }

    /// Attach a state name to an error raised by a hook.
    ///
    /// Errors that already carry hook context are left untouched.
    pub fn in_hook(self, state: &str) -> Self {
        match self {
            RouterError::Hook { .. } => self,
            other => RouterError::Hook {
                state: state.to_string(),
                message: other.to_string(),
            },
        }
    }
}

impl From<String> for RouterError {
    fn from(msg: String) -> Self {
        RouterError::Generic(msg)
    }
}

impl From<&str> for RouterError {
    fn from(msg: &str) -> Self {
        RouterError::Generic(msg.to_string())
    }
}

impl From<serde_json::Error> for RouterError {
    fn from(err: serde_json::Error) -> Self {
        RouterError::Decode {
            message: err.to_string(),
        }
    }
}
