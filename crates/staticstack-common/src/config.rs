//! Configuration model for a stack composition.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StackError};

/// Caller-supplied configuration for composing the stack.
///
/// The asset source path is the only override; cache durations, key
/// prefixes, and retention counts are fixed in [`crate::constants`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackConfig {
    /// Directory of pre-built static assets. Defaults to
    /// [`DEFAULT_ASSET_PATH`](crate::constants::DEFAULT_ASSET_PATH).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_path: Option<PathBuf>,
}

impl StackConfig {
    /// Creates a configuration with an explicit asset path.
    #[must_use]
    pub fn with_asset_path(path: impl Into<PathBuf>) -> Self {
        Self {
            asset_path: Some(path.into()),
        }
    }

    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains unknown or
    /// malformed fields.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| StackError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| StackError::Config {
            message: format!("{}: {e}", path.display()),
        })
    }

    /// Returns the asset path, falling back to the conventional build output.
    #[must_use]
    pub fn resolved_asset_path(&self) -> PathBuf {
        self.asset_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(crate::constants::DEFAULT_ASSET_PATH))
    }
}
