//! `waymark tree` - print the configured router tree

use super::{open_navigator, render_tree};
use crate::config::CliConfigLoader;
use anyhow::Result;

pub async fn tree_command(loader: CliConfigLoader, json: bool) -> Result<()> {
    let navigator = open_navigator(&loader, None).await?;
    let snapshot = navigator.snapshot()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print!("{}", render_tree(&snapshot));
    }
    Ok(())
}
