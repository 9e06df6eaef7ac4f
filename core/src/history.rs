//! Session history abstraction
//!
//! The navigator writes canonical URLs through a [`HistoryBackend`]. A
//! browser embedding forwards these calls to the History API; everywhere
//! else [`MemoryHistory`] keeps the session stack in memory.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// How a committed transition updates the session history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryUpdate {
    /// Add a new history entry
    #[default]
    Push,
    /// Overwrite the current history entry
    Replace,
    /// Leave the history untouched
    Skip,
}

/// Session history used by the navigator
pub trait HistoryBackend: Send + Sync {
    /// URL of the current history entry
    fn current_url(&self) -> String;

    /// Add a new entry, discarding any forward entries
    fn push(&self, url: &str, title: &str);

    /// Overwrite the current entry
    fn replace(&self, url: &str, title: &str);

    /// Move through the session by `delta` entries and return the URL a pop
    /// event would carry, or `None` when the move is out of range
    fn go(&self, _delta: isize) -> Option<String> {
        None
    }
}

/// One entry of the session history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub url: String,
    pub title: String,
}

#[derive(Debug)]
struct Session {
    entries: Vec<HistoryEntry>,
    index: usize,
}

/// In-memory session history
#[derive(Debug)]
pub struct MemoryHistory {
    session: Mutex<Session>,
}

impl MemoryHistory {
    /// Create a history whose only entry is `initial_url`
    pub fn new(initial_url: impl Into<String>) -> Self {
        Self {
            session: Mutex::new(Session {
                entries: vec![HistoryEntry {
                    url: initial_url.into(),
                    title: String::new(),
                }],
                index: 0,
            }),
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of all entries
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.session().entries.clone()
    }

    /// Position of the current entry
    pub fn index(&self) -> usize {
        self.session().index
    }

    pub fn len(&self) -> usize {
        self.session().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.session().entries.is_empty()
    }

    /// Title of the current entry
    pub fn current_title(&self) -> String {
        let session = self.session();
        session
            .entries
            .get(session.index)
            .map(|e| e.title.clone())
            .unwrap_or_default()
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new("/")
    }
}

impl HistoryBackend for MemoryHistory {
    fn current_url(&self) -> String {
        let session = self.session();
        session
            .entries
            .get(session.index)
            .map(|e| e.url.clone())
            .unwrap_or_else(|| "/".to_string())
    }

    fn push(&self, url: &str, title: &str) {
        let mut session = self.session();
        let keep = session.index + 1;
        session.entries.truncate(keep);
        session.entries.push(HistoryEntry {
            url: url.to_string(),
            title: title.to_string(),
        });
        session.index = session.entries.len() - 1;
    }

    fn replace(&self, url: &str, title: &str) {
        let mut session = self.session();
        let index = session.index;
        let entry = HistoryEntry {
            url: url.to_string(),
            title: title.to_string(),
        };
        match session.entries.get_mut(index) {
            Some(current) => *current = entry,
            None => session.entries.push(entry),
        }
    }

    fn go(&self, delta: isize) -> Option<String> {
        let mut session = self.session();
        let target = session.index.checked_add_signed(delta)?;
        let url = session.entries.get(target)?.url.clone();
        session.index = target;
        Some(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_discards_forward_entries() {
        let history = MemoryHistory::new("/");
        history.push("/a", "A");
        history.push("/b", "B");
        assert_eq!(history.go(-1), Some("/a".to_string()));

        history.push("/c", "C");
        let urls: Vec<String> = history.entries().into_iter().map(|e| e.url).collect();
        assert_eq!(urls, vec!["/", "/a", "/c"]);
        assert_eq!(history.go(1), None);
    }

    #[test]
    fn test_replace_keeps_length() {
        let history = MemoryHistory::default();
        history.replace("/home", "Home");
        assert_eq!(history.len(), 1);
        assert_eq!(history.current_url(), "/home");
        assert_eq!(history.current_title(), "Home");
    }

    #[test]
    fn test_go_out_of_range() {
        let history = MemoryHistory::default();
        assert_eq!(history.go(-1), None);
        assert_eq!(history.index(), 0);
    }
}
