//! Change-set computation
//!
//! A transition target (path or URL) is resolved against the router tree into
//! an ordered list of per-router changes, completed with the changes it
//! implies (cascading defaults, orphaned states), and reduced to the changes
//! that actually alter a router.

use crate::codec::{bookmark, ParsedUrl};
use crate::error::{Result, RouterError};
use crate::state::StateId;
use crate::tree::{Overrides, RouterId, RouterTree};
use std::cmp::Reverse;

/// New value for one router
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub router: RouterId,
    pub value: Option<StateId>,
}

impl Change {
    fn new(router: RouterId, value: Option<StateId>) -> Self {
        Self { router, value }
    }
}

/// Everything the executor needs to run one transition
#[derive(Debug, Default)]
pub(crate) struct Plan {
    /// Full ordered change set: explicit and default changes root first,
    /// then orphaned routers leaf first
    pub changes: Vec<Change>,
    /// Changes whose value differs from the router's current value
    pub reduced: Vec<Change>,
    /// Final value of every router touched by `changes`
    pub overrides: Overrides,
    /// Segments that target a child router which does not exist yet
    pub deferred: Option<(RouterId, Vec<String>)>,
    /// Bookmark data carried by the URL, keyed by router name
    pub bookmarks: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Plan {
    /// Reduced changes leaving a current state, deepest router first
    pub fn exits(&self, tree: &RouterTree) -> Vec<RouterId> {
        let mut exits: Vec<RouterId> = self
            .reduced
            .iter()
            .filter(|c| {
                tree.node(c.router)
                    .map(|n| n.state_id.is_some())
                    .unwrap_or(false)
            })
            .map(|c| c.router)
            .collect();
        exits.sort_by_key(|id| Reverse(tree.depth(*id)));
        exits
    }

    /// Reduced changes entering a state, root first
    pub fn entries(&self, tree: &RouterTree) -> Vec<Change> {
        let mut entries: Vec<Change> = self
            .reduced
            .iter()
            .filter(|c| c.value.is_some())
            .cloned()
            .collect();
        entries.sort_by_key(|c| tree.depth(c.router));
        entries
    }
}

/// Resolve a path of state identifiers requested on router `from`
pub(crate) fn plan_path(tree: &mut RouterTree, from: RouterId, path: &str) -> Result<Plan> {
    let relative = !path.starts_with('/');
    let mut segments: Vec<String> = Vec::new();

    if relative {
        for ancestor in tree.ancestors(from) {
            let value = tree.node(ancestor)?.state_id.clone().ok_or_else(|| {
                RouterError::invalid_path(
                    path,
                    format!("router '{}' has no current state", tree.name(ancestor)),
                )
            })?;
            segments.push(value.0);
        }
    }
    let prefix_len = segments.len();
    segments.extend(
        path.split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    );

    let from_name = tree.name(from);
    let inactive = || {
        RouterError::invalid_path(path, format!("router '{from_name}' is not active"))
    };

    let mut explicit = Vec::new();
    let mut cursor = Some(tree.root());
    let mut consumed = 0;
    while consumed < segments.len() {
        if relative && consumed == prefix_len && cursor != Some(from) {
            return Err(inactive());
        }
        let Some(router) = cursor else {
            break;
        };

        let state = StateId::from(segments[consumed].as_str());
        let node = tree.node_mut(router)?;
        if !node.registry.is_configured() {
            return Err(RouterError::NotConfigured(node.name.clone()));
        }
        if !node.registry.contains(&state) {
            return Err(RouterError::UnknownState {
                router: node.name.clone(),
                state: state.to_string(),
            });
        }

        cursor = tree.child_for(router, Some(&state));
        explicit.push(Change::new(router, Some(state)));
        consumed += 1;
    }

    if relative && consumed <= prefix_len && cursor != Some(from) {
        return Err(inactive());
    }

    let deferred = if consumed < segments.len() {
        explicit
            .last()
            .map(|last| (last.router, segments[consumed..].to_vec()))
    } else {
        None
    };

    complete(tree, explicit, deferred, None)
}

/// Resolve a parsed URL against the whole tree
pub(crate) fn plan_url(tree: &mut RouterTree, parsed: &ParsedUrl) -> Result<Plan> {
    let mut explicit = Vec::new();
    let mut cursor = Some(tree.root());
    let mut depth = 0;

    while let Some(router) = cursor {
        let node = tree.node_mut(router)?;
        let value = match parsed.value_for(depth, &node.name) {
            Some(state) => {
                if !node.registry.contains(state) {
                    return Err(RouterError::UnknownState {
                        router: node.name.clone(),
                        state: state.to_string(),
                    });
                }
                Some(state.clone())
            }
            None => node.default_state.clone(),
        };
        let Some(value) = value else {
            break;
        };

        cursor = tree.child_for(router, Some(&value));
        explicit.push(Change::new(router, Some(value)));
        depth += 1;
    }

    let remainder = parsed.remainder(depth);
    let deferred = if remainder.is_empty() {
        None
    } else {
        explicit.last().map(|last| (last.router, remainder))
    };

    let bookmarks = match parsed.bookmark.as_deref() {
        Some(raw) => match bookmark::decode(raw)? {
            serde_json::Value::Object(map) => Some(map),
            other => {
                return Err(RouterError::decode(format!(
                    "bookmark data must be an object, got {other}"
                )))
            }
        },
        None => Some(serde_json::Map::new()),
    };

    complete(tree, explicit, deferred, bookmarks)
}

/// Append implied changes and compute the reduced set
fn complete(
    tree: &RouterTree,
    mut changes: Vec<Change>,
    deferred: Option<(RouterId, Vec<String>)>,
    bookmarks: Option<serde_json::Map<String, serde_json::Value>>,
) -> Result<Plan> {
    let mut overrides: Overrides = changes
        .iter()
        .map(|c| (c.router, c.value.clone()))
        .collect();

    // Routers below the deepest explicit change fall back to their defaults
    let mut cursor = match changes.last() {
        Some(last) => tree.child_for(last.router, last.value.as_ref()),
        None => Some(tree.root()),
    };
    while let Some(router) = cursor {
        if overrides.contains_key(&router) {
            break;
        }
        let Some(default) = tree.node(router)?.default_state.clone() else {
            break;
        };
        cursor = tree.child_for(router, Some(&default));
        overrides.insert(router, Some(default.clone()));
        changes.push(Change::new(router, Some(default)));
    }

    // Routers whose ancestors moved lose their state
    let mut orphaned = Vec::new();
    for router in tree.walk() {
        if overrides.contains_key(&router) {
            continue;
        }
        let node = tree.node(router)?;
        if node.state_id.is_none() {
            continue;
        }
        let parent_path = tree.parent_path_with(router, &overrides);
        if node.parent_path.as_deref() != Some(parent_path.as_str()) {
            overrides.insert(router, None);
            orphaned.push(Change::new(router, None));
        }
    }
    orphaned.sort_by_key(|c| Reverse(tree.depth(c.router)));
    changes.extend(orphaned);

    let reduced = changes
        .iter()
        .filter(|c| {
            tree.node(c.router)
                .map(|n| n.state_id != c.value)
                .unwrap_or(false)
        })
        .cloned()
        .collect();

    Ok(Plan {
        changes,
        reduced,
        overrides,
        deferred,
        bookmarks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{UrlAdapter, UrlPathAdapter};
    use crate::registry::StateRegistry;
    use crate::state::RouterState;

    struct Fixture {
        tree: RouterTree,
        root: RouterId,
        chapter: RouterId,
        section: RouterId,
    }

    /// root: home* | book | tables
    ///   chapter (under book): ch1* | ch2
    ///     section (any chapter): intro* | body
    fn fixture() -> Fixture {
        let mut tree = RouterTree::new("root", 10).unwrap();
        let root = tree.root();
        {
            let node = tree.node_mut(root).unwrap();
            node.registry = StateRegistry::from_states(
                ["home", "book", "tables"].map(RouterState::new),
            )
            .unwrap();
            node.default_state = Some(StateId::from("home"));
        }
        let chapter = tree
            .add_child(root, "chapter", Some(StateId::from("book")))
            .unwrap();
        {
            let node = tree.node_mut(chapter).unwrap();
            node.registry =
                StateRegistry::from_states(["ch1", "ch2"].map(RouterState::new)).unwrap();
            node.default_state = Some(StateId::from("ch1"));
        }
        let section = tree.add_child(chapter, "section", None).unwrap();
        {
            let node = tree.node_mut(section).unwrap();
            node.registry =
                StateRegistry::from_states(["intro", "body"].map(RouterState::new)).unwrap();
            node.default_state = Some(StateId::from("intro"));
        }
        Fixture {
            tree,
            root,
            chapter,
            section,
        }
    }

    fn apply(tree: &mut RouterTree, plan: &Plan) {
        for change in &plan.changes {
            let parent_path = tree.parent_path_with(change.router, &plan.overrides);
            tree.commit(change.router, change.value.clone(), parent_path)
                .unwrap();
        }
    }

    fn values(plan: &Plan) -> Vec<(RouterId, Option<&str>)> {
        plan.changes
            .iter()
            .map(|c| (c.router, c.value.as_ref().map(|s| s.as_str())))
            .collect()
    }

    #[test]
    fn test_absolute_path_cascades_defaults() {
        let mut f = fixture();
        let plan = plan_path(&mut f.tree, f.root, "/book").unwrap();
        assert_eq!(
            values(&plan),
            vec![
                (f.root, Some("book")),
                (f.chapter, Some("ch1")),
                (f.section, Some("intro")),
            ]
        );
        assert_eq!(plan.reduced.len(), 3);
        assert!(plan.deferred.is_none());
    }

    #[test]
    fn test_unknown_state_fails_whole_path() {
        let mut f = fixture();
        let err = plan_path(&mut f.tree, f.root, "/book/ch9").unwrap_err();
        assert_eq!(
            err,
            RouterError::UnknownState {
                router: "chapter".into(),
                state: "ch9".into()
            }
        );
    }

    #[test]
    fn test_relative_path_is_prefixed_by_ancestors() {
        let mut f = fixture();
        let plan = plan_path(&mut f.tree, f.root, "/book").unwrap();
        apply(&mut f.tree, &plan);

        let plan = plan_path(&mut f.tree, f.chapter, "ch2").unwrap();
        assert_eq!(
            values(&plan),
            vec![
                (f.root, Some("book")),
                (f.chapter, Some("ch2")),
                (f.section, Some("intro")),
            ]
        );
        // only the chapter actually changes
        assert_eq!(plan.reduced, vec![Change::new(f.chapter, Some("ch2".into()))]);
    }

    #[test]
    fn test_relative_path_on_inactive_router_fails() {
        let mut f = fixture();
        let plan = plan_path(&mut f.tree, f.root, "/home").unwrap();
        apply(&mut f.tree, &plan);

        let err = plan_path(&mut f.tree, f.chapter, "ch2").unwrap_err();
        assert!(matches!(err, RouterError::InvalidPath { .. }));
    }

    #[test]
    fn test_leaving_parent_state_orphans_children_leaf_first() {
        let mut f = fixture();
        let plan = plan_path(&mut f.tree, f.root, "/book/ch2/body").unwrap();
        apply(&mut f.tree, &plan);

        let plan = plan_path(&mut f.tree, f.root, "/tables").unwrap();
        assert_eq!(
            values(&plan),
            vec![(f.root, Some("tables")), (f.section, None), (f.chapter, None)]
        );
        assert_eq!(plan.exits(&f.tree), vec![f.section, f.chapter, f.root]);
        assert_eq!(plan.entries(&f.tree).len(), 1);
    }

    #[test]
    fn test_wildcard_child_is_orphaned_when_parent_moves() {
        let mut f = fixture();
        let plan = plan_path(&mut f.tree, f.root, "/book/ch1/body").unwrap();
        apply(&mut f.tree, &plan);

        let plan = plan_path(&mut f.tree, f.chapter, "ch2").unwrap();
        // section is active under any chapter and falls back to its default
        assert!(plan
            .changes
            .contains(&Change::new(f.section, Some("intro".into()))));
    }

    #[test]
    fn test_extra_segments_are_deferred() {
        let mut f = fixture();
        let plan = plan_path(&mut f.tree, f.root, "/home/profile/edit").unwrap();
        assert_eq!(
            plan.deferred,
            Some((f.root, vec!["profile".to_string(), "edit".to_string()]))
        );
    }

    #[test]
    fn test_url_plan_matches_path_plan() {
        let mut f = fixture();
        let adapter = UrlPathAdapter::default();

        let direct = plan_path(&mut f.tree, f.root, "/book/ch2").unwrap();
        let parsed = adapter.decode("/book/ch2").unwrap();
        let from_url = plan_url(&mut f.tree, &parsed).unwrap();

        assert_eq!(direct.changes, from_url.changes);
        assert_eq!(from_url.bookmarks, Some(serde_json::Map::new()));
    }

    #[test]
    fn test_url_plan_rejects_non_object_bookmark() {
        let mut f = fixture();
        let adapter = UrlPathAdapter::default();
        let parsed = adapter.decode("/book?_state=0%5B1%5D").unwrap();
        assert!(plan_url(&mut f.tree, &parsed).is_err());
    }
}
