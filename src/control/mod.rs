pub mod azure;
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::WorkspaceConfig;
use crate::error::Error;

/// A deployed web service as reported by the control plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub name: String,
    pub id: String,
    pub compute_type: Option<String>,
    pub state: Option<String>,
    pub app_insights_enabled: bool,
    /// ARM id of the workspace the service was resolved in.
    pub workspace_id: String,
    /// Base URL of the data plane that owns the service.
    pub endpoint: String,
}

/// One JSON Patch operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOp {
    pub op: String,
    pub path: String,
    pub value: serde_json::Value,
}

/// Attribute changes sent to a service. Applying the same update twice
/// leaves the service in the same state as applying it once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceUpdate {
    pub app_insights_enabled: bool,
}

impl ServiceUpdate {
    pub fn enable_app_insights() -> Self {
        Self {
            app_insights_enabled: true,
        }
    }

    /// Render as the JSON Patch document the service endpoint expects.
    pub fn to_patch(self) -> Vec<PatchOp> {
        vec![PatchOp {
            op: "replace".to_string(),
            path: "/appInsightsEnabled".to_string(),
            value: serde_json::Value::Bool(self.app_insights_enabled),
        }]
    }
}

/// The remote collaborator that owns deployed services.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Resolve a service by name within a workspace.
    async fn find_service(&self, workspace: &WorkspaceConfig, name: &str)
    -> Result<Service, Error>;

    /// Apply an attribute update to a previously resolved service.
    async fn update_service(&self, service: &Service, update: &ServiceUpdate)
    -> Result<(), Error>;
}
