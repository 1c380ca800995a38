//! Project-wide constants.

use std::path::PathBuf;

/// The deployed web service this tool updates when no name is given.
pub const DEFAULT_SERVICE_NAME: &str = "bank-marketing-predictor";

/// Key under which Azure credentials are stored.
pub const PROVIDER: &str = "azure";

/// Azure Resource Manager endpoint.
pub const ARM_ENDPOINT: &str = "https://management.azure.com";

/// API version for `Microsoft.MachineLearningServices/workspaces`.
pub const WORKSPACE_API_VERSION: &str = "2023-04-01";

/// Azure AD login host.
pub const LOGIN_ENDPOINT: &str = "https://login.microsoftonline.com";

/// Tenant used for interactive login when none is given.
pub const DEFAULT_TENANT: &str = "organizations";

/// Workspace config file names, checked in this order in each directory.
pub const CONFIG_CANDIDATES: &[&str] = &["config.json", ".azureml/config.json"];

/// Default database path: `~/.beacon/beacon.db`.
pub fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".beacon")
        .join("beacon.db")
}

/// Model-management endpoint for a region, used when the workspace
/// does not advertise a discovery URL.
pub fn model_management_endpoint(location: &str) -> String {
    format!("https://{location}.modelmanagement.azureml.net")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_db_path_under_dot_beacon() {
        let path = default_db_path();
        assert!(path.ends_with(".beacon/beacon.db"));
    }

    #[test]
    fn model_management_endpoint_uses_region() {
        assert_eq!(
            model_management_endpoint("eastus"),
            "https://eastus.modelmanagement.azureml.net"
        );
    }
}
