//! Workspace configuration loaded from a `config.json` file.
//!
//! The file is the one the Azure ML portal hands out ("Download
//! config.json"). It is looked for in the starting directory and then
//! in every parent, checking `config.json` before `.azureml/config.json`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::consts::CONFIG_CANDIDATES;
use crate::error::Error;

/// The workspace a service lives in. Read-only input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkspaceConfig {
    pub subscription_id: String,
    pub resource_group: String,
    pub workspace_name: String,
}

impl WorkspaceConfig {
    /// Search `start` and its ancestors for a config file and load it.
    pub fn discover(start: &Path) -> Result<Self, Error> {
        let path = find_config_file(start).ok_or_else(|| Error::ConfigNotFound {
            start: start.to_path_buf(),
        })?;
        tracing::debug!(path = %path.display(), "found workspace config");
        Self::from_file(&path)
    }

    /// Load a config from an explicit path.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw).map_err(|reason| Error::ConfigInvalid {
            path: path.to_path_buf(),
            reason,
        })
    }

    fn parse(raw: &str) -> Result<Self, String> {
        let config: Self = serde_json::from_str(raw).map_err(|e| e.to_string())?;
        for (key, value) in [
            ("subscription_id", &config.subscription_id),
            ("resource_group", &config.resource_group),
            ("workspace_name", &config.workspace_name),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{key} must not be empty"));
            }
        }
        Ok(config)
    }

    /// ARM resource id of the workspace.
    pub fn arm_id(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.MachineLearningServices/workspaces/{}",
            self.subscription_id, self.resource_group, self.workspace_name
        )
    }
}

/// First existing config file, walking up from `start`.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    start.ancestors().find_map(|dir| {
        CONFIG_CANDIDATES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}
