//! Navigator and router handles
//!
//! A [`Navigator`] owns one router tree together with its URL adapter,
//! session history, event bus and transition queue. Application code talks
//! to individual routers through cheap, cloneable [`Router`] handles.

use crate::codec::{bookmark, UrlAdapter};
use crate::config::NavigatorConfig;
use crate::error::{Result, RouterError};
use crate::events::{EventBus, RouterEvent};
use crate::history::{HistoryBackend, HistoryUpdate, MemoryHistory};
use crate::hooks::ViewModel;
use crate::registry::StateRegistry;
use crate::state::{RouterState, StateId};
use crate::transition::executor;
use crate::transition::queue::{self, TransitionQueue};
use crate::transition::{Outcome, Transition, TransitionFuture};
use crate::tree::{Direction, RouterId, RouterNode, RouterTree};
use futures::FutureExt;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

/// State shared by a navigator, its router handles and the queue drain task
pub(crate) struct Shared {
    pub config: NavigatorConfig,
    pub adapter: Arc<dyn UrlAdapter>,
    pub history: Arc<dyn HistoryBackend>,
    pub events: EventBus,
    pub queue: TransitionQueue,
    tree: Mutex<RouterTree>,
    title: Mutex<String>,
    disposed: AtomicBool,
}

impl Shared {
    /// Lock the router tree of a live navigator
    pub fn tree(&self) -> Result<MutexGuard<'_, RouterTree>> {
        if self.is_disposed() {
            return Err(RouterError::Disposed);
        }
        Ok(self.lock_tree())
    }

    fn lock_tree(&self) -> MutexGuard<'_, RouterTree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` on the locked tree with every state lookup answered.
    ///
    /// Resolver callbacks never run under the lock. Lookups that miss are
    /// resolved once the guard is released and `f` runs again, so `f` must
    /// not change the tree before its lookups succeed.
    pub fn with_states<T>(&self, mut f: impl FnMut(&mut RouterTree) -> Result<T>) -> Result<T> {
        loop {
            let wanted = {
                let mut tree = self.tree()?;
                let result = f(&mut tree);
                let wanted = tree.take_wanted();
                if wanted.is_empty() {
                    tree.forget_rejected();
                    return result;
                }
                wanted
            };

            let mut answers = Vec::new();
            for (router, resolver, ids) in wanted {
                for id in ids {
                    let resolved = resolver(&id);
                    answers.push((router, id, resolved));
                }
            }
            debug!(resolved = answers.len(), "resolved states outside the tree lock");

            let mut tree = self.tree()?;
            for (router, id, resolved) in answers {
                if let Ok(node) = tree.node_mut(router) {
                    node.registry.settle(id, resolved);
                }
            }
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn title(&self) -> String {
        self.title
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_title(&self, title: String) {
        *self.title.lock().unwrap_or_else(PoisonError::into_inner) = title;
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.queue.discard(RouterError::Disposed, &self.events);

        let mut tree = self.lock_tree();
        let root = tree.root();
        let children = tree
            .node(root)
            .map(|n| n.children.clone())
            .unwrap_or_default();
        for child in children {
            if let Ok(removed) = tree.remove(child) {
                debug!(?removed, "disposed child routers");
            }
        }
        if let Ok(node) = tree.node_mut(root) {
            node.bookmark = None;
            node.deferred = None;
        }
        drop(tree);

        info!("navigator disposed");
        self.events.emit(RouterEvent::Disposed);
    }
}

/// Owner of a router tree and its transition pipeline
#[derive(Clone)]
pub struct Navigator {
    shared: Arc<Shared>,
}

impl Navigator {
    /// Create a navigator writing to the given session history
    pub fn new(config: NavigatorConfig, history: Arc<dyn HistoryBackend>) -> Result<Self> {
        config.validate()?;
        let tree = RouterTree::new(config.root_name.clone(), config.max_history)?;
        let adapter = config.build_adapter();
        info!(
            root = %config.root_name,
            adapter = config.adapter.as_str(),
            base_url = %config.base_url,
            "navigator created"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                adapter,
                history,
                events: EventBus::new(),
                queue: TransitionQueue::new(),
                tree: Mutex::new(tree),
                title: Mutex::new(String::new()),
                disposed: AtomicBool::new(false),
                config,
            }),
        })
    }

    /// Navigator with default configuration and an in-memory history at `/`
    pub fn with_defaults() -> Result<Self> {
        Self::new(NavigatorConfig::default(), Arc::new(MemoryHistory::default()))
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.shared.config
    }

    pub fn root(&self) -> Router {
        Router {
            shared: Arc::clone(&self.shared),
            id: RouterId(0),
        }
    }

    /// Find a router anywhere in the tree by name
    pub fn router(&self, name: &str) -> Option<Router> {
        let id = self.shared.tree().ok()?.find(name)?;
        Some(Router {
            shared: Arc::clone(&self.shared),
            id,
        })
    }

    /// Navigate from the root
    pub fn go(&self, path: &str) -> TransitionFuture {
        self.root().go(path)
    }

    /// Bring the whole tree in line with the URL of the current history entry
    pub fn sync(&self) -> TransitionFuture {
        let url = self.shared.history.current_url();
        queue::enqueue(&self.shared, Transition::sync(RouterId(0), url))
    }

    /// React to a back/forward navigation that landed on `url`
    pub fn handle_pop_state(&self, url: impl Into<String>) -> TransitionFuture {
        queue::enqueue(&self.shared, Transition::pop_state(RouterId(0), url))
    }

    pub fn back(&self) -> TransitionFuture {
        self.traverse(-1)
    }

    pub fn forward(&self) -> TransitionFuture {
        self.traverse(1)
    }

    fn traverse(&self, delta: isize) -> TransitionFuture {
        if self.is_disposed() {
            return futures::future::ready(Err(RouterError::Disposed)).boxed();
        }
        match self.shared.history.go(delta) {
            Some(url) => self.handle_pop_state(url),
            None => futures::future::ready(Ok(Outcome::unchanged())).boxed(),
        }
    }

    /// URL of the current history entry
    pub fn current_url(&self) -> String {
        self.shared.history.current_url()
    }

    /// Canonical URL of the current router states
    pub fn encode_url(&self) -> Result<String> {
        let tree = self.shared.tree()?;
        executor::canonical_url(&tree, &self.shared, None)
    }

    /// Title written with the last URL update
    pub fn title(&self) -> String {
        self.shared.title()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RouterEvent> {
        self.shared.events.subscribe()
    }

    /// Number of requests waiting in the transition queue, including the one
    /// in flight
    pub fn pending_transitions(&self) -> usize {
        self.shared.queue.len()
    }

    /// Snapshot of the router tree
    pub fn snapshot(&self) -> Result<RouterSnapshot> {
        let tree = self.shared.tree()?;
        RouterSnapshot::capture(&tree, tree.root())
    }

    /// Discard pending transitions and tear the router tree down
    pub fn dispose(&self) {
        self.shared.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.is_disposed()
    }
}

impl fmt::Debug for Navigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("config", &self.shared.config)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Handle to one router of a navigator
#[derive(Clone)]
pub struct Router {
    shared: Arc<Shared>,
    id: RouterId,
}

impl Router {
    fn handle(&self, id: RouterId) -> Router {
        Router {
            shared: Arc::clone(&self.shared),
            id,
        }
    }

    fn read<T>(&self, f: impl FnOnce(&RouterNode) -> T) -> Result<T> {
        let tree = self.shared.tree()?;
        Ok(f(tree.node(self.id)?))
    }

    fn write<T>(&self, mut f: impl FnMut(&mut RouterNode) -> Result<T>) -> Result<T> {
        self.shared.with_states(|tree| f(tree.node_mut(self.id)?))
    }

    pub fn id(&self) -> RouterId {
        self.id
    }

    pub fn name(&self) -> String {
        self.shared.lock_tree().name(self.id)
    }

    pub fn is_root(&self) -> bool {
        self.id == RouterId(0)
    }

    pub fn parent(&self) -> Option<Router> {
        let parent = self.read(|n| n.parent).ok()??;
        Some(self.handle(parent))
    }

    /// Whether the router is part of the active chain
    pub fn is_active(&self) -> bool {
        self.shared
            .tree()
            .map(|tree| tree.is_active(self.id))
            .unwrap_or(false)
    }

    pub fn state_id(&self) -> Option<StateId> {
        self.read(|n| n.state_id.clone()).ok().flatten()
    }

    /// Descriptor of the current state
    pub fn current_state(&self) -> Option<RouterState> {
        self.read(|n| n.current_state().cloned()).ok().flatten()
    }

    /// Value of the current state
    pub fn current_value(&self) -> Option<serde_json::Value> {
        self.current_state().map(|s| s.value)
    }

    pub fn default_state_id(&self) -> Option<StateId> {
        self.read(|n| n.default_state.clone()).ok().flatten()
    }

    pub fn set_default_state_id(&self, id: Option<&str>) -> Result<()> {
        self.write(|node| {
            let id = id.map(StateId::from);
            if let Some(id) = &id {
                if !node.registry.contains(id) {
                    return Err(RouterError::UnknownState {
                        router: node.name.clone(),
                        state: id.to_string(),
                    });
                }
            }
            node.default_state = id;
            Ok(())
        })
    }

    /// Replace the state registry with a static set of states
    pub fn configure(&self, states: impl IntoIterator<Item = RouterState>) -> Result<()> {
        let registry = StateRegistry::from_states(states)?;
        let mut tree = self.shared.tree()?;
        let node = tree.node_mut(self.id)?;
        debug!(router = %node.name, states = registry.states().len(), "router configured");
        node.registry = registry;
        Ok(())
    }

    /// Replace the state registry with a resolver callback
    pub fn configure_with<F>(&self, resolver: F) -> Result<()>
    where
        F: Fn(&StateId) -> Option<RouterState> + Send + Sync + 'static,
    {
        self.shared.tree()?.node_mut(self.id)?.registry = StateRegistry::with_resolver(resolver);
        Ok(())
    }

    /// Look up a state, consulting the resolver when needed
    pub fn get_state(&self, id: &str) -> Option<RouterState> {
        self.write(|node| Ok(node.registry.resolve(&StateId::from(id))))
            .ok()
            .flatten()
    }

    /// Known states in configuration order
    pub fn states(&self) -> Vec<RouterState> {
        self.read(|n| n.registry.states().into_iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Create a child router active under `parent_state` (`None` for any)
    pub fn create_child_router(&self, name: &str, parent_state: Option<&str>) -> Result<Router> {
        let parent_state = parent_state.map(StateId::from);
        let id = self
            .shared
            .with_states(|tree| tree.add_child(self.id, name, parent_state.clone()))?;
        debug!(router = name, parent = %self.name(), ?parent_state, "child router created");
        Ok(self.handle(id))
    }

    pub fn get_child_router(&self, name: &str) -> Option<Router> {
        let tree = self.shared.tree().ok()?;
        let node = tree.node(self.id).ok()?;
        let child = node
            .children
            .iter()
            .copied()
            .find(|c| tree.node(*c).map(|n| n.name == name).unwrap_or(false))?;
        Some(self.handle(child))
    }

    pub fn children(&self) -> Vec<Router> {
        self.read(|n| n.children.clone())
            .unwrap_or_default()
            .into_iter()
            .map(|id| self.handle(id))
            .collect()
    }

    /// Dispose this router and its descendants; disposing the root disposes
    /// the whole navigator
    pub fn dispose(&self) -> Result<()> {
        if self.is_root() {
            self.shared.dispose();
            return Ok(());
        }
        let removed = self.shared.tree()?.remove(self.id)?;
        debug!(?removed, "routers disposed");
        Ok(())
    }

    /// Navigate to `path`, adding a history entry
    pub fn go(&self, path: &str) -> TransitionFuture {
        self.go_with(path, HistoryUpdate::Push)
    }

    pub fn go_with(&self, path: &str, history_update: HistoryUpdate) -> TransitionFuture {
        queue::enqueue(
            &self.shared,
            Transition::direct(self.id, path, history_update),
        )
    }

    /// Replay a path deferred by the parent, or match the current URL
    pub fn sync(&self) -> TransitionFuture {
        let deferred = match self.shared.tree() {
            Ok(mut tree) => take_deferred(&mut tree, self.id),
            Err(err) => return futures::future::ready(Err(err)).boxed(),
        };
        let transition = match deferred {
            Some(segments) => Transition::deferred(self.id, segments.join("/")),
            None => Transition::sync(self.id, self.shared.history.current_url()),
        };
        queue::enqueue(&self.shared, transition)
    }

    /// Attach bookmarkable data to the current state and rewrite the URL.
    ///
    /// Fails without any effect when the encoded data exceeds the bookmark
    /// length limit.
    pub fn store(&self, data: serde_json::Value) -> Result<()> {
        let (url, title) = {
            let mut tree = self.shared.tree()?;
            let node = tree.node(self.id)?;
            if node.state_id.is_none() {
                return Err(RouterError::Generic(format!(
                    "router '{}' has no current state",
                    node.name
                )));
            }

            let url = if tree.is_active(self.id) {
                Some(executor::canonical_url(
                    &tree,
                    &self.shared,
                    Some((self.id, &data)),
                )?)
            } else {
                let mut single = serde_json::Map::new();
                single.insert(node.name.clone(), data.clone());
                bookmark::encode(
                    &serde_json::Value::Object(single),
                    self.shared.config.max_bookmark_len,
                )?;
                None
            };

            tree.node_mut(self.id)?.bookmark = Some(data);
            (url, executor::title_states(&tree))
        };
        let title = executor::page_title(&title);

        if let Some(url) = url {
            self.shared.history.replace(&url, &title);
            self.shared.events.emit(RouterEvent::UrlChanged {
                url,
                update: HistoryUpdate::Replace,
            });
        }
        Ok(())
    }

    /// Bookmarkable data of the current state
    pub fn retrieve(&self) -> Option<serde_json::Value> {
        self.read(|n| n.bookmark.clone()).ok().flatten()
    }

    /// Bind a view-model whose guards are consulted before the guards of
    /// `state`
    pub fn bind_view_model(&self, state: &str, view_model: Arc<dyn ViewModel>) -> Result<()> {
        self.write(|node| {
            let id = StateId::from(state);
            if !node.registry.contains(&id) {
                return Err(RouterError::UnknownState {
                    router: node.name.clone(),
                    state: state.to_string(),
                });
            }
            node.view_models.insert(id, view_model.clone());
            Ok(())
        })
    }

    pub fn direction(&self) -> Option<Direction> {
        self.read(|n| n.direction).ok().flatten()
    }

    /// Visited states, most recent last
    pub fn history(&self) -> Vec<StateId> {
        self.read(|n| n.history.clone()).unwrap_or_default()
    }

    /// Segments waiting for a child router
    pub fn deferred_path(&self) -> Option<String> {
        self.read(|n| n.deferred.as_ref().map(|s| s.join("/")))
            .ok()
            .flatten()
    }

    /// Reactive cell following the current state
    pub fn watch_state(&self) -> Result<watch::Receiver<Option<StateId>>> {
        self.read(RouterNode::subscribe)
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("state", &self.state_id())
            .finish()
    }
}

/// Take the parent's deferred path if `id` is the child it was waiting for
fn take_deferred(tree: &mut RouterTree, id: RouterId) -> Option<Vec<String>> {
    let parent = tree.node(id).ok()?.parent?;
    let parent_state = tree.node(parent).ok()?.state_id.clone();
    if tree.child_for(parent, parent_state.as_ref()) != Some(id) {
        return None;
    }
    tree.node_mut(parent).ok()?.deferred.take()
}

/// Serializable view of a router and its descendants
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouterSnapshot {
    pub name: String,
    pub parent_state: Option<StateId>,
    pub state: Option<StateId>,
    pub default_state: Option<StateId>,
    pub states: Vec<StateId>,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookmark: Option<serde_json::Value>,
    pub children: Vec<RouterSnapshot>,
}

impl RouterSnapshot {
    fn capture(tree: &RouterTree, id: RouterId) -> Result<Self> {
        let node = tree.node(id)?;
        let children = node
            .children
            .iter()
            .map(|child| Self::capture(tree, *child))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            name: node.name.clone(),
            parent_state: node.parent_state.clone(),
            state: node.state_id.clone(),
            default_state: node.default_state.clone(),
            states: node.registry.states().iter().map(|s| s.id.clone()).collect(),
            active: tree.is_active(id),
            bookmark: node.bookmark.clone(),
            children,
        })
    }
}
