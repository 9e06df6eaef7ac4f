//! State registry of a router
//!
//! A registry is either a static set of states given at configuration time or
//! a resolver callback that is asked for unknown identifiers. Resolved states
//! are cached so that the descriptor of a state stays stable once seen.
//!
//! Lookups never call the resolver themselves: a miss is recorded as wanted
//! and settled later by the navigator with the router tree unlocked, so a
//! resolver may freely read other routers.

use crate::error::{Result, RouterError};
use crate::state::{RouterState, StateId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Callback resolving a state identifier into a state descriptor
pub type StateResolver = Arc<dyn Fn(&StateId) -> Option<RouterState> + Send + Sync>;

/// Mapping from state identifiers to state descriptors
#[derive(Clone, Default)]
pub struct StateRegistry {
    states: HashMap<StateId, RouterState>,
    /// Configuration order, used when listing states
    order: Vec<StateId>,
    resolver: Option<StateResolver>,
    /// Misses waiting for the resolver
    wanted: Vec<StateId>,
    /// Identifiers the resolver declined during the current lookup round
    rejected: HashSet<StateId>,
}

impl StateRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from a list of states
    pub fn from_states(states: impl IntoIterator<Item = RouterState>) -> Result<Self> {
        let mut registry = Self::new();
        for state in states {
            registry.insert(state)?;
        }
        Ok(registry)
    }

    /// Create a registry backed by a resolver callback
    pub fn with_resolver<F>(resolver: F) -> Self
    where
        F: Fn(&StateId) -> Option<RouterState> + Send + Sync + 'static,
    {
        Self {
            resolver: Some(Arc::new(resolver)),
            ..Self::default()
        }
    }

    /// Add a state, rejecting identifiers that cannot appear in a path
    pub fn insert(&mut self, state: RouterState) -> Result<()> {
        validate_state_id(&state.id)?;
        if !self.states.contains_key(&state.id) {
            self.order.push(state.id.clone());
        }
        self.states.insert(state.id.clone(), state);
        Ok(())
    }

    /// Look up a state. A miss on a dynamic registry is recorded as wanted
    /// and reported as unknown until [`settle`](Self::settle) is called.
    pub fn resolve(&mut self, id: &StateId) -> Option<RouterState> {
        if let Some(state) = self.states.get(id) {
            return Some(state.clone());
        }
        if self.resolver.is_some() && !self.rejected.contains(id) && !self.wanted.contains(id) {
            self.wanted.push(id.clone());
        }
        None
    }

    /// Identifiers missed since the last call, together with the resolver
    /// that can answer them
    pub fn take_wanted(&mut self) -> Option<(StateResolver, Vec<StateId>)> {
        if self.wanted.is_empty() {
            return None;
        }
        let wanted = std::mem::take(&mut self.wanted);
        self.resolver.clone().map(|resolver| (resolver, wanted))
    }

    /// Record what the resolver answered for `id`
    pub fn settle(&mut self, id: StateId, resolved: Option<RouterState>) {
        match resolved {
            Some(state) if state.id == id && validate_state_id(&id).is_ok() => {
                if !self.states.contains_key(&id) {
                    self.order.push(id.clone());
                }
                self.states.insert(id, state);
            }
            Some(state) => {
                tracing::warn!(requested = %id, resolved = %state.id, "resolver returned a mismatched state");
                self.rejected.insert(id);
            }
            None => {
                self.rejected.insert(id);
            }
        }
    }

    /// Let declined identifiers be asked again on the next lookup round
    pub fn forget_rejected(&mut self) {
        self.rejected.clear();
        self.wanted.clear();
    }

    /// Look up an already known state without consulting the resolver
    pub fn get(&self, id: &StateId) -> Option<&RouterState> {
        self.states.get(id)
    }

    /// Whether the identifier names a state of this registry
    pub fn contains(&mut self, id: &StateId) -> bool {
        self.resolve(id).is_some()
    }

    /// Known states in configuration order
    pub fn states(&self) -> Vec<&RouterState> {
        self.order.iter().filter_map(|id| self.states.get(id)).collect()
    }

    /// Whether any state can be resolved at all
    pub fn is_configured(&self) -> bool {
        self.resolver.is_some() || !self.states.is_empty()
    }

    /// Whether states come from a resolver callback
    pub fn is_dynamic(&self) -> bool {
        self.resolver.is_some()
    }
}

impl fmt::Debug for StateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateRegistry")
            .field("states", &self.order)
            .field("dynamic", &self.resolver.is_some())
            .finish()
    }
}

fn validate_state_id(id: &StateId) -> Result<()> {
    if id.0.is_empty() || id.0.contains('/') || id.0 == "." || id.0 == ".." {
        return Err(RouterError::Config(format!(
            "state id '{}' must be a non-empty path segment",
            id
        )));
    }
    Ok(())
}
