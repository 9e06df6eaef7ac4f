//! `waymark sync` - resolve a URL into the router tree

use super::{open_navigator, print_location};
use crate::config::CliConfigLoader;
use anyhow::Result;

pub async fn sync_command(loader: CliConfigLoader, url: String) -> Result<()> {
    let navigator = open_navigator(&loader, Some(url.as_str())).await?;
    print_location(&navigator)?;

    let canonical = navigator.encode_url()?;
    if canonical != url {
        println!("canonical: {canonical}");
    }
    Ok(())
}
