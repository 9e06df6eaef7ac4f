//! Router tree bookkeeping
//!
//! Routers live in an arena owned by the navigator and are addressed by
//! [`RouterId`]. The tree is only mutated from inside the transition executor
//! (state values) or by explicit structural calls (child creation, disposal).

use crate::codec::BOOKMARK_PARAM;
use crate::error::{Result, RouterError};
use crate::hooks::ViewModel;
use crate::registry::{StateRegistry, StateResolver};
use crate::state::{RouterState, StateId};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Handle of a router inside a navigator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouterId(pub(crate) usize);

impl fmt::Display for RouterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Direction of the last committed state change of a router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Back,
}

/// Target values keyed by router, used to evaluate the tree "as if" a change
/// set had been committed
pub(crate) type Overrides = HashMap<RouterId, Option<StateId>>;

pub(crate) struct RouterNode {
    pub name: String,
    pub parent: Option<RouterId>,
    /// Parent state this router is bound to, `None` for any parent state
    pub parent_state: Option<StateId>,
    pub children: Vec<RouterId>,
    pub registry: StateRegistry,
    pub default_state: Option<StateId>,
    pub state_id: Option<StateId>,
    /// Ancestor states at the time `state_id` was committed
    pub parent_path: Option<String>,
    /// Visited states, most recent last
    pub history: Vec<StateId>,
    pub direction: Option<Direction>,
    pub view_models: HashMap<StateId, Arc<dyn ViewModel>>,
    pub bookmark: Option<serde_json::Value>,
    /// Path segments waiting for a child router that does not exist yet
    pub deferred: Option<Vec<String>>,
    state_tx: watch::Sender<Option<StateId>>,
}

impl RouterNode {
    fn new(name: String, parent: Option<RouterId>, parent_state: Option<StateId>) -> Self {
        let (state_tx, _) = watch::channel(None);
        Self {
            name,
            parent,
            parent_state,
            children: Vec::new(),
            registry: StateRegistry::new(),
            default_state: None,
            state_id: None,
            parent_path: None,
            history: Vec::new(),
            direction: None,
            view_models: HashMap::new(),
            bookmark: None,
            deferred: None,
            state_tx,
        }
    }

    /// Descriptor of the current state
    pub fn current_state(&self) -> Option<&RouterState> {
        self.state_id.as_ref().and_then(|id| self.registry.get(id))
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<StateId>> {
        self.state_tx.subscribe()
    }

    /// Track a visit, detecting back navigation by scanning the stack
    fn record_visit(&mut self, state: &StateId, max_history: usize) {
        match self.history.iter().rposition(|s| s == state) {
            Some(pos) if pos + 1 < self.history.len() => {
                self.history.truncate(pos + 1);
                self.direction = Some(Direction::Back);
            }
            Some(_) => self.direction = Some(Direction::Forward),
            None => {
                self.history.push(state.clone());
                if self.history.len() > max_history {
                    let excess = self.history.len() - max_history;
                    self.history.drain(..excess);
                }
                self.direction = Some(Direction::Forward);
            }
        }
    }
}

/// Arena of routers rooted at a single root router
pub struct RouterTree {
    nodes: Vec<Option<RouterNode>>,
    max_history: usize,
}

impl RouterTree {
    /// Create a tree containing only the root router
    pub fn new(root_name: impl Into<String>, max_history: usize) -> Result<Self> {
        let root_name = root_name.into();
        validate_name(&root_name)?;
        Ok(Self {
            nodes: vec![Some(RouterNode::new(root_name, None, None))],
            max_history: max_history.max(1),
        })
    }

    pub fn root(&self) -> RouterId {
        RouterId(0)
    }

    pub fn contains(&self, id: RouterId) -> bool {
        matches!(self.nodes.get(id.0), Some(Some(_)))
    }

    pub(crate) fn node(&self, id: RouterId) -> Result<&RouterNode> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| RouterError::UnknownRouter(id.to_string()))
    }

    pub(crate) fn node_mut(&mut self, id: RouterId) -> Result<&mut RouterNode> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| RouterError::UnknownRouter(id.to_string()))
    }

    /// Name of a router, or its handle when it is gone
    pub fn name(&self, id: RouterId) -> String {
        self.node(id)
            .map(|n| n.name.clone())
            .unwrap_or_else(|_| id.to_string())
    }

    /// All live routers, parents before children
    pub fn walk(&self) -> Vec<RouterId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            if let Ok(node) = self.node(id) {
                out.push(id);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// State lookups that missed a dynamic registry since the last call
    pub(crate) fn take_wanted(&mut self) -> Vec<(RouterId, StateResolver, Vec<StateId>)> {
        let mut out = Vec::new();
        for (index, slot) in self.nodes.iter_mut().enumerate() {
            if let Some(node) = slot {
                if let Some((resolver, ids)) = node.registry.take_wanted() {
                    out.push((RouterId(index), resolver, ids));
                }
            }
        }
        out
    }

    pub(crate) fn forget_rejected(&mut self) {
        for node in self.nodes.iter_mut().flatten() {
            node.registry.forget_rejected();
        }
    }

    /// Find a router anywhere in the tree by name
    pub fn find(&self, name: &str) -> Option<RouterId> {
        self.walk()
            .into_iter()
            .find(|id| self.node(*id).map(|n| n.name == name).unwrap_or(false))
    }

    /// Create a child router bound to `parent_state` (`None` for any state)
    pub fn add_child(
        &mut self,
        parent: RouterId,
        name: impl Into<String>,
        parent_state: Option<StateId>,
    ) -> Result<RouterId> {
        let name = name.into();
        validate_name(&name)?;
        if self.find(&name).is_some() {
            return Err(RouterError::InvalidName(name));
        }

        let parent_node = self.node_mut(parent)?;
        if let Some(state) = &parent_state {
            if parent_node.registry.is_configured() && !parent_node.registry.contains(state) {
                return Err(RouterError::UnknownState {
                    router: parent_node.name.clone(),
                    state: state.to_string(),
                });
            }
        }

        let parent_name = parent_node.name.clone();
        let children = parent_node.children.clone();
        for child in children {
            if self.node(child)?.parent_state == parent_state {
                return Err(RouterError::DuplicateChild {
                    parent: parent_name,
                    binding: describe_binding(&parent_state),
                });
            }
        }

        let id = RouterId(self.nodes.len());
        self.nodes
            .push(Some(RouterNode::new(name, Some(parent), parent_state)));
        self.node_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Remove a router and all of its descendants, returning removed names
    pub fn remove(&mut self, id: RouterId) -> Result<Vec<String>> {
        let parent = self.node(id)?.parent;
        if let Some(parent) = parent {
            if let Ok(parent_node) = self.node_mut(parent) {
                parent_node.children.retain(|c| *c != id);
            }
        }

        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current.0).and_then(Option::take) {
                stack.extend(node.children.iter().copied());
                removed.push(node.name);
            }
        }
        Ok(removed)
    }

    /// Child router activated by `state` of `parent`; exact bindings win over
    /// wildcard bindings
    pub fn child_for(&self, parent: RouterId, state: Option<&StateId>) -> Option<RouterId> {
        let state = state?;
        let node = self.node(parent).ok()?;
        let mut wildcard = None;
        for child in &node.children {
            let Ok(child_node) = self.node(*child) else {
                continue;
            };
            match &child_node.parent_state {
                Some(bound) if bound == state => return Some(*child),
                None => wildcard = Some(*child),
                Some(_) => {}
            }
        }
        wildcard
    }

    /// Value of a router under the given overrides
    pub(crate) fn value_with(&self, id: RouterId, overrides: &Overrides) -> Option<StateId> {
        match overrides.get(&id) {
            Some(value) => value.clone(),
            None => self.node(id).ok().and_then(|n| n.state_id.clone()),
        }
    }

    /// Chain of active routers from the root, following current states
    pub fn active_chain(&self) -> Vec<RouterId> {
        self.active_chain_with(&Overrides::new())
    }

    pub(crate) fn active_chain_with(&self, overrides: &Overrides) -> Vec<RouterId> {
        let mut chain = vec![self.root()];
        let mut current = self.root();
        while let Some(child) = self.child_for(current, self.value_with(current, overrides).as_ref())
        {
            chain.push(child);
            current = child;
        }
        chain
    }

    /// Ancestors of a router, root first, excluding the router itself
    pub fn ancestors(&self, id: RouterId) -> Vec<RouterId> {
        let mut out = Vec::new();
        let mut current = self.node(id).ok().and_then(|n| n.parent);
        while let Some(parent) = current {
            out.push(parent);
            current = self.node(parent).ok().and_then(|n| n.parent);
        }
        out.reverse();
        out
    }

    pub fn depth(&self, id: RouterId) -> usize {
        self.ancestors(id).len()
    }

    /// Whether the router is reachable through the active chain
    pub fn is_active(&self, id: RouterId) -> bool {
        self.active_chain().contains(&id)
    }

    /// `/`-joined ancestor states of a router under the given overrides
    pub(crate) fn parent_path_with(&self, id: RouterId, overrides: &Overrides) -> String {
        self.ancestors(id)
            .into_iter()
            .map(|a| {
                self.value_with(a, overrides)
                    .map(|s| s.0)
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Set a router's state. Only called by the transition executor.
    pub(crate) fn commit(
        &mut self,
        id: RouterId,
        value: Option<StateId>,
        parent_path: String,
    ) -> Result<()> {
        let max_history = self.max_history;
        let node = self.node_mut(id)?;
        if node.state_id != value {
            node.bookmark = None;
        }
        match &value {
            Some(state) => {
                node.record_visit(state, max_history);
                node.parent_path = Some(parent_path);
            }
            None => node.parent_path = None,
        }
        node.state_id = value.clone();
        node.state_tx.send_replace(value);
        Ok(())
    }
}

impl fmt::Debug for RouterTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for id in self.walk() {
            if let Ok(node) = self.node(id) {
                list.entry(&(id, &node.name, &node.state_id));
            }
        }
        list.finish()
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') || name.contains('=') || name == BOOKMARK_PARAM {
        return Err(RouterError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn describe_binding(state: &Option<StateId>) -> String {
    match state {
        Some(state) => format!("state '{}'", state),
        None => "any state".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with_book() -> (RouterTree, RouterId) {
        let mut tree = RouterTree::new("root", 10).unwrap();
        let root = tree.root();
        tree.node_mut(root).unwrap().registry = StateRegistry::from_states(vec![
            RouterState::new("home"),
            RouterState::new("book"),
        ])
        .unwrap();
        let book = tree
            .add_child(root, "chapter", Some(StateId::from("book")))
            .unwrap();
        (tree, book)
    }

    #[test]
    fn test_child_binding_is_unique() {
        let (mut tree, _) = tree_with_book();
        let root = tree.root();

        let err = tree
            .add_child(root, "other", Some(StateId::from("book")))
            .unwrap_err();
        assert!(matches!(err, RouterError::DuplicateChild { .. }));

        tree.add_child(root, "any", None).unwrap();
        let err = tree.add_child(root, "any2", None).unwrap_err();
        assert!(matches!(err, RouterError::DuplicateChild { .. }));
    }

    #[test]
    fn test_names_are_validated() {
        let (mut tree, _) = tree_with_book();
        let root = tree.root();
        assert!(tree.add_child(root, "chapter", None).is_err());
        assert!(tree.add_child(root, BOOKMARK_PARAM, None).is_err());
        assert!(tree.add_child(root, "a/b", None).is_err());
        assert!(tree
            .add_child(root, "x", Some(StateId::from("missing")))
            .is_err());
    }

    #[test]
    fn test_active_chain_prefers_exact_binding() {
        let (mut tree, book) = tree_with_book();
        let root = tree.root();
        let wildcard = tree.add_child(root, "any", None).unwrap();

        tree.commit(root, Some(StateId::from("book")), String::new())
            .unwrap();
        assert_eq!(tree.active_chain(), vec![root, book]);

        tree.commit(root, Some(StateId::from("home")), String::new())
            .unwrap();
        assert_eq!(tree.active_chain(), vec![root, wildcard]);
    }

    #[test]
    fn test_history_detects_back_navigation() {
        let (mut tree, _) = tree_with_book();
        let root = tree.root();
        for state in ["home", "book", "home"] {
            tree.commit(root, Some(StateId::from(state)), String::new())
                .unwrap();
        }
        let node = tree.node(root).unwrap();
        assert_eq!(node.direction, Some(Direction::Back));
        assert_eq!(node.history, vec![StateId::from("home")]);
    }

    #[test]
    fn test_remove_drops_descendants() {
        let (mut tree, book) = tree_with_book();
        tree.node_mut(book).unwrap().registry =
            StateRegistry::from_states(vec![RouterState::new("ch1")]).unwrap();
        let verse = tree
            .add_child(book, "verse", Some(StateId::from("ch1")))
            .unwrap();

        let removed = tree.remove(book).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(!tree.contains(book));
        assert!(!tree.contains(verse));
        assert!(tree.node(tree.root()).unwrap().children.is_empty());
    }

    #[test]
    fn test_watch_cell_follows_commits() {
        let (mut tree, _) = tree_with_book();
        let root = tree.root();
        let rx = tree.node(root).unwrap().subscribe();
        tree.commit(root, Some(StateId::from("home")), String::new())
            .unwrap();
        assert_eq!(*rx.borrow(), Some(StateId::from("home")));
    }
}
