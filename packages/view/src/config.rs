use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_NAME: &str = "markup.config.json";

/// Children fetched per container unless "show all" was requested
pub const DEFAULT_MAX_CHILDREN: usize = 100;

/// Rows moved by page up / page down
pub const DEFAULT_NAVIGATION_PAGE: usize = 10;

/// Markup view configuration file format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkupConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default = "default_navigation_page")]
    pub navigation_page: usize,

    /// Maximum undo levels (0 = unlimited)
    #[serde(default = "default_undo_depth")]
    pub undo_depth: usize,
}

fn default_page_size() -> usize {
    DEFAULT_MAX_CHILDREN
}

fn default_navigation_page() -> usize {
    DEFAULT_NAVIGATION_PAGE
}

fn default_undo_depth() -> usize {
    markup_editor::DEFAULT_UNDO_DEPTH
}

impl MarkupConfig {
    /// Load config from a directory, falling back to defaults when the
    /// directory has no config file
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_json(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            navigation_page: default_navigation_page(),
            undo_depth: default_undo_depth(),
        }
    }
}
