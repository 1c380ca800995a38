use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{ControlPlane, Service, ServiceUpdate};
use crate::config::WorkspaceConfig;
use crate::consts::{ARM_ENDPOINT, WORKSPACE_API_VERSION, model_management_endpoint};
use crate::error::Error;

const SERVICES_API_VERSION: &str = "2018-11-19";

/// Talks to Azure Resource Manager and the workspace's model-management
/// endpoint with a bearer token.
pub struct AzureControlPlane {
    client: reqwest::Client,
    token: String,
    arm_endpoint: String,
}

impl AzureControlPlane {
    pub fn new(token: String) -> Self {
        Self::with_arm_endpoint(token, ARM_ENDPOINT)
    }

    /// Point at a different resource manager (sovereign clouds, tests).
    pub fn with_arm_endpoint(token: String, arm_endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            arm_endpoint: arm_endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    /// Find the model-management base URL for a workspace.
    async fn resolve_endpoint(&self, workspace: &WorkspaceConfig) -> Result<String, Error> {
        let url = parse_url(&format!("{}{}", self.arm_endpoint, workspace.arm_id()))?;
        let url = with_query(url, &[("api-version", WORKSPACE_API_VERSION)]);

        let resp = self.client.get(url).bearer_auth(&self.token).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(Error::WorkspaceNotFound(workspace.workspace_name.clone()));
        }
        let resource: WorkspaceResource = read_json(resp).await?;

        if let Some(discovery_url) = resource.properties.and_then(|p| p.discovery_url) {
            tracing::debug!(%discovery_url, "reading service discovery document");
            let resp = self
                .client
                .get(parse_url(&discovery_url)?)
                .bearer_auth(&self.token)
                .send()
                .await?;
            let discovery: Discovery = read_json(resp).await?;
            if let Some(endpoint) = discovery.modelmanagement {
                return Ok(endpoint.trim_end_matches('/').to_string());
            }
        }

        match resource.location {
            Some(location) => Ok(model_management_endpoint(&location)),
            None => Err(Error::Decode(
                "workspace has neither a discovery URL nor a location".to_string(),
            )),
        }
    }
}

#[async_trait]
impl ControlPlane for AzureControlPlane {
    async fn find_service(
        &self,
        workspace: &WorkspaceConfig,
        name: &str,
    ) -> Result<Service, Error> {
        let endpoint = self.resolve_endpoint(workspace).await?;
        let url = parse_url(&format!("{endpoint}/api{}/services", workspace.arm_id()))?;
        let url = with_query(
            url,
            &[("api-version", SERVICES_API_VERSION), ("name", name)],
        );

        tracing::debug!(service = name, %endpoint, "looking up service");
        let resp = self.client.get(url).bearer_auth(&self.token).send().await?;
        let list: ServiceList = read_json(resp).await?;

        let found = list
            .value
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::ServiceNotFound(name.to_string()))?;

        Ok(Service {
            name: found.name,
            id: found.id,
            compute_type: found.compute_type,
            state: found.state,
            app_insights_enabled: found.app_insights_enabled.unwrap_or(false),
            workspace_id: workspace.arm_id(),
            endpoint,
        })
    }

    async fn update_service(
        &self,
        service: &Service,
        update: &ServiceUpdate,
    ) -> Result<(), Error> {
        let url = parse_url(&format!(
            "{}/api{}/services/{}",
            service.endpoint, service.workspace_id, service.id
        ))?;
        let url = with_query(url, &[("api-version", SERVICES_API_VERSION)]);

        let resp = self
            .client
            .patch(url)
            .bearer_auth(&self.token)
            .json(&update.to_patch())
            .send()
            .await?;

        let status = resp.status();
        if !matches!(
            status,
            StatusCode::OK | StatusCode::ACCEPTED | StatusCode::NO_CONTENT
        ) {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        if let Some(operation) = resp
            .headers()
            .get("Operation-Location")
            .and_then(|v| v.to_str().ok())
        {
            tracing::info!(service = %service.name, %operation, "update accepted");
        }
        Ok(())
    }
}

fn parse_url(raw: &str) -> Result<Url, Error> {
    Url::parse(raw).map_err(|e| Error::Decode(format!("invalid URL {raw}: {e}")))
}

fn with_query(mut url: Url, pairs: &[(&str, &str)]) -> Url {
    url.query_pairs_mut().extend_pairs(pairs);
    url
}

/// Map non-success statuses to `Rejected`, then decode the body.
async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(Error::Rejected {
            status: status.as_u16(),
            body,
        });
    }
    serde_json::from_str(&body).map_err(|e| Error::Decode(e.to_string()))
}

// --- API types ---

#[derive(Deserialize)]
struct WorkspaceResource {
    location: Option<String>,
    properties: Option<WorkspaceProperties>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkspaceProperties {
    discovery_url: Option<String>,
}

#[derive(Deserialize)]
struct Discovery {
    modelmanagement: Option<String>,
}

#[derive(Deserialize)]
struct ServiceList {
    #[serde(default)]
    value: Vec<ServiceEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceEntry {
    name: String,
    id: String,
    compute_type: Option<String>,
    state: Option<String>,
    app_insights_enabled: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arm_endpoint_trailing_slash_trimmed() {
        let plane = AzureControlPlane::with_arm_endpoint("t".into(), "http://localhost:1/");
        assert_eq!(plane.arm_endpoint, "http://localhost:1");
    }

    #[test]
    fn with_query_encodes_values() {
        let url = Url::parse("https://example.com/services").unwrap();
        let url = with_query(url, &[("name", "a b&c")]);
        assert_eq!(url.as_str(), "https://example.com/services?name=a+b%26c");
    }

    #[test]
    fn service_entry_decodes_camel_case() {
        let entry: ServiceEntry = serde_json::from_str(
            r#"{"name": "svc", "id": "svc", "computeType": "ACI", "state": "Healthy", "appInsightsEnabled": false}"#,
        )
        .unwrap();
        assert_eq!(entry.compute_type.as_deref(), Some("ACI"));
        assert_eq!(entry.app_insights_enabled, Some(false));
    }

    #[test]
    fn service_list_without_value_is_empty() {
        let list: ServiceList = serde_json::from_str("{}").unwrap();
        assert!(list.value.is_empty());
    }

    #[test]
    fn workspace_resource_reads_discovery_url() {
        let resource: WorkspaceResource = serde_json::from_str(
            r#"{"location": "eastus", "properties": {"discoveryUrl": "https://eastus.api.azureml.ms/discovery"}}"#,
        )
        .unwrap();
        assert_eq!(resource.location.as_deref(), Some("eastus"));
        assert_eq!(
            resource.properties.unwrap().discovery_url.as_deref(),
            Some("https://eastus.api.azureml.ms/discovery")
        );
    }
}
