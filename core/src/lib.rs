//! # waymark Core
//!
//! Core library for waymark - a hierarchical state router with bookmarkable
//! URLs.
//!
//! A [`Navigator`] owns a tree of routers. Each router selects one of its
//! configured states; child routers are activated by the state of their
//! parent. State changes are requested by path, serialized through a
//! transition queue, guarded by lifecycle hooks and written back to a session
//! history as canonical URLs.

// Core modules
pub mod codec;
pub mod config;
pub mod error;
pub mod events;
pub mod history;
pub mod hooks;
pub mod navigator;
pub mod registry;
pub mod state;
pub mod transition;
pub mod tree;

// Re-export commonly used types
pub use codec::{UrlAdapter, UrlPathAdapter, UrlQueryAdapter, BOOKMARK_PARAM};
pub use config::{AdapterKind, NavigatorConfig};
pub use error::{Result, RouterError};
pub use events::RouterEvent;
pub use history::{HistoryBackend, HistoryUpdate, MemoryHistory};
pub use hooks::{Action, Guard, ViewModel};
pub use navigator::{Navigator, Router, RouterSnapshot};
pub use state::{RouterState, StateId, Title};
pub use transition::{Outcome, TransitionFuture};
pub use tree::{Direction, RouterId};

/// Current version of the waymark-core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the global tracing subscriber, writing to `writer`.
///
/// `verbose` selects `debug` output, otherwise only warnings and errors are
/// shown. Fails when a global subscriber is already installed.
pub fn init_tracing<W>(verbose: bool, writer: W) -> Result<()>
where
    W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = if verbose { "debug" } else { "warn" };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(writer)
        .try_init()
        .map_err(|e| RouterError::Config(format!("failed to install tracing subscriber: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_installs_once() {
        assert!(init_tracing(true, std::io::sink).is_ok());
        assert!(matches!(
            init_tracing(false, std::io::sink),
            Err(RouterError::Config(_))
        ));
    }
}
