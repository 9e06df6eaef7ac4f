//! CLI command implementations

pub mod codec;
pub mod go;
pub mod shell;
pub mod sync;
pub mod tree;

pub use codec::{decode_command, encode_command};
pub use go::go_command;
pub use shell::shell_command;
pub use sync::sync_command;
pub use tree::tree_command;

use crate::config::CliConfigLoader;
use anyhow::{Context, Result};
use std::sync::Arc;
use waymark_core::{MemoryHistory, Navigator, RouterSnapshot};

/// Load the route map and build a navigator whose history starts at `url`
/// (the configured base URL when `None`), synchronized with that URL
async fn open_navigator(loader: &CliConfigLoader, url: Option<&str>) -> Result<Navigator> {
    let map = loader.load().await?;
    let start = url.unwrap_or(&map.navigator.base_url).to_string();
    let navigator = map.build(Arc::new(MemoryHistory::new(start.clone())))?;
    navigator
        .sync()
        .await
        .with_context(|| format!("Failed to synchronize with '{start}'"))?;
    Ok(navigator)
}

/// `name=state` pairs along the active chain
fn active_states(navigator: &Navigator) -> Result<String> {
    let snapshot = navigator.snapshot()?;
    let mut parts = Vec::new();
    let mut current = Some(&snapshot);
    while let Some(router) = current {
        let state = router
            .state
            .as_ref()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        parts.push(format!("{}={}", router.name, state));
        current = router.children.iter().find(|c| c.active);
    }
    Ok(parts.join(" "))
}

/// Print the current state, URL and title of a navigator
fn print_location(navigator: &Navigator) -> Result<()> {
    println!("state: {}", active_states(navigator)?);
    println!("url: {}", navigator.current_url());
    println!("title: {}", navigator.title());
    Ok(())
}

/// Indented text rendering of a router tree
fn render_tree(snapshot: &RouterSnapshot) -> String {
    fn walk(router: &RouterSnapshot, depth: usize, out: &mut String) {
        let binding = match (&router.parent_state, depth) {
            (_, 0) => String::new(),
            (Some(state), _) => format!(" [{state}]"),
            (None, _) => " [any]".to_string(),
        };
        let states = router
            .states
            .iter()
            .map(|id| {
                let mut text = id.to_string();
                if router.default_state.as_ref() == Some(id) {
                    text.push('!');
                }
                if router.state.as_ref() == Some(id) {
                    text = format!("({text})");
                }
                text
            })
            .collect::<Vec<_>>()
            .join(" ");
        let marker = if router.active { '*' } else { ' ' };

        out.push_str(&format!(
            "{}{} {}{}: {}\n",
            "  ".repeat(depth),
            marker,
            router.name,
            binding,
            states
        ));
        for child in &router.children {
            walk(child, depth + 1, out);
        }
    }

    let mut out = String::new();
    walk(snapshot, 0, &mut out);
    out
}
