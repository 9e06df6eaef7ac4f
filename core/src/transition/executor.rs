//! Transition executor
//!
//! Runs one transition through the lifecycle:
//! plan → canExit (leaf first) → canEnter (root first) → commit → URL → title.
//! The router tree lock is only taken for short synchronous sections; every
//! hook runs with no lock held.

use super::change::{self, Change, Plan};
use super::{Origin, Outcome, Target, Transition};
use crate::codec::{bookmark, UrlSegment};
use crate::error::{Result, RouterError};
use crate::events::RouterEvent;
use crate::history::HistoryUpdate;
use crate::hooks::{Guard, ViewModel};
use crate::navigator::Shared;
use crate::state::RouterState;
use crate::tree::{RouterId, RouterTree};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Hooks consulted for one router by a guard phase
struct GuardStep {
    state: RouterState,
    view_model: Option<Arc<dyn ViewModel>>,
}

#[derive(Clone, Copy)]
enum Phase {
    Exit,
    Enter,
}

impl GuardStep {
    /// View-model opinion first, state descriptor hook second
    async fn allows(&self, phase: Phase) -> Result<bool> {
        let opinion = match (&self.view_model, phase) {
            (Some(vm), Phase::Exit) => vm.can_exit().await,
            (Some(vm), Phase::Enter) => vm.can_enter().await,
            (None, _) => None,
        };
        let allowed = match opinion {
            Some(result) => result,
            None => {
                let guard: Option<&Guard> = match phase {
                    Phase::Exit => self.state.can_exit.as_ref(),
                    Phase::Enter => self.state.can_enter.as_ref(),
                };
                match guard {
                    Some(guard) => guard.check().await,
                    None => Ok(true),
                }
            }
        };
        allowed.map_err(|e| e.in_hook(self.state.id.as_str()))
    }
}

/// Cooperative cancellation point; `Ok(false)` means stop quietly
fn checkpoint(shared: &Shared, transition: &Transition, stage: &str) -> Result<bool> {
    if shared.is_disposed() {
        return Err(RouterError::Disposed);
    }
    if transition.is_cancelled() {
        warn!(transition_id = %transition.id, stage, "transition cancelled");
        return Ok(false);
    }
    Ok(true)
}

pub(crate) async fn execute(shared: &Shared, transition: &Transition) -> Result<Outcome> {
    debug!(
        transition_id = %transition.id,
        origin = %transition.origin,
        target = ?transition.target,
        "executing transition"
    );

    let plan = match &transition.target {
        Target::Path(path) => {
            shared.with_states(|tree| change::plan_path(tree, transition.router, path))?
        }
        Target::Url(url) => {
            let parsed = shared.adapter.decode(url)?;
            shared.with_states(|tree| change::plan_url(tree, &parsed))?
        }
    };
    debug!(
        transition_id = %transition.id,
        changes = plan.changes.len(),
        reduced = plan.reduced.len(),
        "change set resolved"
    );

    if plan.reduced.is_empty() {
        {
            let mut tree = shared.tree()?;
            keep_pending_data(&mut tree, &plan)?;
        }
        if transition.history_update == HistoryUpdate::Replace {
            write_url(shared, transition.history_update)?;
        }
        debug!(transition_id = %transition.id, "nothing to change");
        return Ok(Outcome::unchanged());
    }

    if !checkpoint(shared, transition, "can_exit")? {
        return Ok(Outcome::unchanged());
    }
    let exits = {
        let tree = shared.tree()?;
        collect_exits(&tree, &plan)?
    };
    for step in &exits {
        if !checkpoint(shared, transition, "can_exit")? {
            return Ok(Outcome::unchanged());
        }
        if !step.allows(Phase::Exit).await? {
            warn!(transition_id = %transition.id, state = %step.state.id, "can_exit declined");
            return declined(shared, transition);
        }
    }

    if !checkpoint(shared, transition, "can_enter")? {
        return Ok(Outcome::unchanged());
    }
    let entries = shared.with_states(|tree| collect_entries(tree, &plan))?;
    for step in &entries {
        if !checkpoint(shared, transition, "can_enter")? {
            return Ok(Outcome::unchanged());
        }
        if !step.allows(Phase::Enter).await? {
            warn!(transition_id = %transition.id, state = %step.state.id, "can_enter declined");
            return declined(shared, transition);
        }
    }

    if !checkpoint(shared, transition, "commit")? {
        return Ok(Outcome::unchanged());
    }
    let mut committed = 0;
    for change in &plan.changes {
        if commit_change(shared, &plan, change).await? {
            committed += 1;
        }
    }

    {
        let mut tree = shared.tree()?;
        keep_pending_data(&mut tree, &plan)?;
    }

    if committed == 0 {
        return Ok(Outcome::unchanged());
    }
    let url = write_url(shared, transition.history_update)?;
    info!(
        transition_id = %transition.id,
        origin = %transition.origin,
        committed,
        %url,
        "transition committed"
    );
    Ok(Outcome::changed())
}

fn collect_exits(tree: &RouterTree, plan: &Plan) -> Result<Vec<GuardStep>> {
    let mut steps = Vec::new();
    for router in plan.exits(tree) {
        let node = tree.node(router)?;
        let Some(state) = node.current_state().cloned() else {
            continue;
        };
        let view_model = node.view_models.get(&state.id).cloned();
        steps.push(GuardStep { state, view_model });
    }
    Ok(steps)
}

fn collect_entries(tree: &mut RouterTree, plan: &Plan) -> Result<Vec<GuardStep>> {
    let mut steps = Vec::new();
    for Change { router, value } in plan.entries(tree) {
        let Some(id) = value else {
            continue;
        };
        let node = tree.node_mut(router)?;
        let state = node
            .registry
            .resolve(&id)
            .ok_or_else(|| RouterError::UnknownState {
                router: node.name.clone(),
                state: id.to_string(),
            })?;
        let view_model = node.view_models.get(&id).cloned();
        steps.push(GuardStep { state, view_model });
    }
    Ok(steps)
}

/// Exit the old state, commit the new value, enter the new state.
/// Returns whether the router actually changed.
async fn commit_change(shared: &Shared, plan: &Plan, change: &Change) -> Result<bool> {
    let old_state = {
        let tree = shared.tree()?;
        let node = tree.node(change.router)?;
        if node.state_id == change.value {
            return Ok(false);
        }
        node.current_state().cloned()
    };

    if let Some(old) = &old_state {
        if let Some(exit) = &old.exit {
            exit.run().await.map_err(|e| e.in_hook(old.id.as_str()))?;
        }
    }

    let (event, new_state) = {
        let mut tree = shared.tree()?;
        let parent_path = tree.parent_path_with(change.router, &plan.overrides);
        tree.commit(change.router, change.value.clone(), parent_path)?;
        let node = tree.node(change.router)?;
        let event = RouterEvent::StateChanged {
            router: node.name.clone(),
            from: old_state.as_ref().map(|s| s.id.clone()),
            to: change.value.clone(),
            direction: change.value.as_ref().and(node.direction),
        };
        (event, node.current_state().cloned())
    };
    debug!(?event, "router state committed");
    shared.events.emit(event);

    if let Some(new) = &new_state {
        if let Some(enter) = &new.enter {
            enter.run().await.map_err(|e| e.in_hook(new.id.as_str()))?;
        }
    }
    Ok(true)
}

/// Store deferred segments and URL bookmark data carried by the plan
fn keep_pending_data(tree: &mut RouterTree, plan: &Plan) -> Result<()> {
    for change in &plan.changes {
        tree.node_mut(change.router)?.deferred = None;
    }
    if let Some((router, segments)) = &plan.deferred {
        tree.node_mut(*router)?.deferred = Some(segments.clone());
    }
    if let Some(bookmarks) = &plan.bookmarks {
        for router in tree.active_chain() {
            let node = tree.node_mut(router)?;
            node.bookmark = bookmarks.get(&node.name).cloned();
        }
    }
    Ok(())
}

/// A declined back/forward navigation puts the current URL back
fn declined(shared: &Shared, transition: &Transition) -> Result<Outcome> {
    if transition.origin == Origin::PopState {
        let url = write_url(shared, HistoryUpdate::Push)?;
        debug!(transition_id = %transition.id, %url, "restored url after declined navigation");
    }
    Ok(Outcome::unchanged())
}

/// Recompute the title, then write the canonical URL to the history backend
pub(crate) fn write_url(shared: &Shared, update: HistoryUpdate) -> Result<String> {
    let (url, states) = {
        let tree = shared.tree()?;
        (canonical_url(&tree, shared, None)?, title_states(&tree))
    };
    let title = page_title(&states);
    shared.set_title(title.clone());

    match update {
        HistoryUpdate::Push => shared.history.push(&url, &title),
        HistoryUpdate::Replace => shared.history.replace(&url, &title),
        HistoryUpdate::Skip => return Ok(url),
    }
    shared.events.emit(RouterEvent::UrlChanged {
        url: url.clone(),
        update,
    });
    Ok(url)
}

/// URL of the active chain. `replacing` substitutes the bookmark data of
/// one router, which lets a store be validated before it is applied.
pub(crate) fn canonical_url(
    tree: &RouterTree,
    shared: &Shared,
    replacing: Option<(RouterId, &serde_json::Value)>,
) -> Result<String> {
    let chain = tree.active_chain();
    let mut segments = Vec::with_capacity(chain.len());
    let mut bookmarks = serde_json::Map::new();

    for router in chain {
        let node = tree.node(router)?;
        segments.push(UrlSegment {
            router: node.name.clone(),
            state: node.state_id.clone(),
            default: node.default_state.clone(),
        });

        let data = match replacing {
            Some((id, data)) if id == router => Some(data),
            _ => node.bookmark.as_ref(),
        };
        if let Some(data) = data {
            bookmarks.insert(node.name.clone(), data.clone());
        }
    }

    let param = if bookmarks.is_empty() {
        None
    } else {
        Some(bookmark::encode(
            &serde_json::Value::Object(bookmarks),
            shared.config.max_bookmark_len,
        )?)
    };
    Ok(shared.adapter.encode(&segments, param.as_deref()))
}

/// Current states of the active chain, leaf first
pub(crate) fn title_states(tree: &RouterTree) -> Vec<RouterState> {
    tree.active_chain()
        .into_iter()
        .rev()
        .filter_map(|id| tree.node(id).ok())
        .filter_map(|node| node.current_state().cloned())
        .collect()
}

/// Page title from [`title_states`]. Computed titles may read routers, so
/// this must run with the tree unlocked.
pub(crate) fn page_title(states: &[RouterState]) -> String {
    states
        .iter()
        .filter_map(RouterState::display_title)
        .collect::<Vec<_>>()
        .join(" | ")
}
