//! Route map loader for waymark
//!
//! Implements single-source priority loading with flag overrides:
//! 1. --config file/dir (highest priority)
//! 2. Current working directory: ./waymark.json or ./.waymark/config.json
//! 3. XDG config: $XDG_CONFIG_HOME/waymark/config.json or the platform config dir
//! 4. Built-in demo route map (no files)

use super::RouteMap;
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use waymark_core::AdapterKind;

/// CLI configuration loader
pub struct CliConfigLoader {
    /// Override config file/directory path
    config_override: Option<PathBuf>,
    /// Directory searched before the XDG location
    working_dir: Option<PathBuf>,
    /// Flag overrides
    adapter_override: Option<AdapterKind>,
    base_url_override: Option<String>,
}

impl CliConfigLoader {
    /// Create a new loader
    pub fn new() -> Self {
        Self {
            config_override: None,
            working_dir: None,
            adapter_override: None,
            base_url_override: None,
        }
    }

    /// Set config file/directory override
    pub fn with_config_override(mut self, path: PathBuf) -> Self {
        self.config_override = Some(path);
        self
    }

    /// Search `dir` instead of the process working directory
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }

    /// Set URL adapter override
    pub fn with_adapter_override(mut self, adapter: AdapterKind) -> Self {
        self.adapter_override = Some(adapter);
        self
    }

    /// Set base URL override
    pub fn with_base_url_override(mut self, base_url: String) -> Self {
        self.base_url_override = Some(base_url);
        self
    }

    /// Load the route map and apply flag overrides
    pub async fn load(&self) -> Result<RouteMap> {
        // Step 1: Find and load the route map
        let mut map = if let Some(override_path) = &self.config_override {
            let expanded = expand_path(override_path);
            self.load_from_path(&expanded).await.with_context(|| {
                format!(
                    "Failed to load config from override path: {}",
                    override_path.display()
                )
            })?
        } else {
            self.search_and_load().await?
        };

        // Step 2: Apply flag overrides
        if let Some(adapter) = self.adapter_override {
            map.navigator.adapter = adapter;
        }
        if let Some(base_url) = &self.base_url_override {
            map.navigator.base_url = base_url.clone();
        }

        map.navigator
            .validate()
            .map_err(|e| anyhow!("Configuration validation failed: {}", e))?;
        Ok(map)
    }

    /// Search for a route map in priority order
    async fn search_and_load(&self) -> Result<RouteMap> {
        if let Some(map) = self.try_load_cwd().await? {
            return Ok(map);
        }

        if let Some(map) = self.try_load_xdg().await? {
            return Ok(map);
        }

        tracing::debug!("no route map found, using the built-in demo map");
        Ok(RouteMap::demo())
    }

    /// Try loading from the working directory
    async fn try_load_cwd(&self) -> Result<Option<RouteMap>> {
        let cwd = match &self.working_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };

        // Try ./waymark.json first
        let waymark_json = cwd.join("waymark.json");
        if waymark_json.exists() {
            return Ok(Some(self.load_file(&waymark_json).await?));
        }

        // Try ./.waymark/config.json
        let waymark_dir_config = cwd.join(".waymark").join("config.json");
        if waymark_dir_config.exists() {
            return Ok(Some(self.load_file(&waymark_dir_config).await?));
        }

        Ok(None)
    }

    /// Try loading from XDG config directory
    async fn try_load_xdg(&self) -> Result<Option<RouteMap>> {
        if let Some(config_dir) = self.get_xdg_config_dir() {
            let config_path = config_dir.join("waymark").join("config.json");
            if config_path.exists() {
                return Ok(Some(self.load_file(&config_path).await?));
            }
        }
        Ok(None)
    }

    /// Load a route map from a specific path (file or directory)
    async fn load_from_path(&self, path: &Path) -> Result<RouteMap> {
        if path.is_file() {
            self.load_file(path).await
        } else if path.is_dir() {
            // Try config.json in the directory
            let config_file = path.join("config.json");
            if config_file.exists() {
                self.load_file(&config_file).await
            } else {
                Err(anyhow!(
                    "No config.json found in directory: {}",
                    path.display()
                ))
            }
        } else {
            Err(anyhow!("Config path does not exist: {}", path.display()))
        }
    }

    /// Load a single route map file
    async fn load_file(&self, path: &Path) -> Result<RouteMap> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        tracing::debug!(path = %path.display(), "loading route map");
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get XDG config directory
    fn get_xdg_config_dir(&self) -> Option<PathBuf> {
        match std::env::var("XDG_CONFIG_HOME") {
            Ok(xdg_config) if !xdg_config.is_empty() => Some(PathBuf::from(xdg_config)),
            _ => dirs::config_dir(),
        }
    }
}

impl Default for CliConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Expand `~` and environment variables in a user supplied path
fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.into_owned()),
        Err(_) => path.to_path_buf(),
    }
}
