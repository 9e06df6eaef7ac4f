//! `waymark encode` / `waymark decode` - bookmark parameter codec

use crate::config::CliConfigLoader;
use anyhow::{Context, Result};
use waymark_core::codec::bookmark;
use waymark_core::BOOKMARK_PARAM;

/// Encode JSON data into a bookmark parameter value
pub async fn encode_command(loader: CliConfigLoader, json: String) -> Result<()> {
    let map = loader.load().await?;
    let data: serde_json::Value =
        serde_json::from_str(&json).context("Bookmark data must be valid JSON")?;

    let encoded = bookmark::encode(&data, map.navigator.max_bookmark_len)?;
    println!("{BOOKMARK_PARAM}={encoded}");
    Ok(())
}

/// Decode a bookmark parameter value, with or without the `_state=` prefix
pub async fn decode_command(param: String) -> Result<()> {
    let prefix = format!("{BOOKMARK_PARAM}=");
    let raw = param.strip_prefix(&prefix).unwrap_or(&param);

    let data = bookmark::decode_url_param(raw).context("Invalid bookmark parameter")?;
    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}
