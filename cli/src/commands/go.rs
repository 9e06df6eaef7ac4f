//! `waymark go` - run transitions in order

use super::{open_navigator, print_location};
use crate::config::CliConfigLoader;
use anyhow::{Context, Result};

/// Navigate through `paths` one after the other and report where we ended up
pub async fn go_command(loader: CliConfigLoader, paths: Vec<String>) -> Result<()> {
    let navigator = open_navigator(&loader, None).await?;

    for path in &paths {
        let outcome = navigator
            .go(path)
            .await
            .with_context(|| format!("Transition to '{path}' failed"))?;
        let verdict = if outcome.has_changed {
            "changed"
        } else {
            "unchanged"
        };
        println!("{path}: {verdict}");
    }

    print_location(&navigator)
}
