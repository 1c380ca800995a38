use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{ControlPlane, Service, ServiceUpdate};
use crate::config::WorkspaceConfig;
use crate::error::Error;

/// An in-memory control plane for tests. Holds services keyed by name,
/// records every update it receives, and can be told to reject updates.
pub struct MockControlPlane {
    services: Mutex<HashMap<String, Service>>,
    updates: Mutex<Vec<(String, ServiceUpdate)>>,
    reject_with: Option<(u16, String)>,
}

impl Default for MockControlPlane {
    fn default() -> Self {
        Self::new()
    }
}

impl MockControlPlane {
    pub fn new() -> Self {
        Self {
            services: Mutex::new(HashMap::new()),
            updates: Mutex::new(Vec::new()),
            reject_with: None,
        }
    }

    /// Add a service with the given name and monitoring flag.
    pub fn with_service(self, name: &str, app_insights_enabled: bool) -> Self {
        let service = Service {
            name: name.to_string(),
            id: format!("{name}-id"),
            compute_type: Some("ACI".to_string()),
            state: Some("Healthy".to_string()),
            app_insights_enabled,
            workspace_id: String::new(),
            endpoint: "mock://".to_string(),
        };
        self.services
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), service);
        self
    }

    /// Reject every update with this status and body.
    pub fn rejecting(mut self, status: u16, body: &str) -> Self {
        self.reject_with = Some((status, body.to_string()));
        self
    }

    /// Current monitoring flag of a service, if it exists.
    pub fn app_insights_enabled(&self, name: &str) -> Option<bool> {
        self.services
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .map(|s| s.app_insights_enabled)
    }

    /// Number of update calls received, rejected ones included.
    pub fn update_calls(&self) -> usize {
        self.updates.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl ControlPlane for MockControlPlane {
    async fn find_service(
        &self,
        workspace: &WorkspaceConfig,
        name: &str,
    ) -> Result<Service, Error> {
        let services = self.services.lock().unwrap_or_else(|e| e.into_inner());
        let mut service = services
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ServiceNotFound(name.to_string()))?;
        service.workspace_id = workspace.arm_id();
        Ok(service)
    }

    async fn update_service(
        &self,
        service: &Service,
        update: &ServiceUpdate,
    ) -> Result<(), Error> {
        self.updates
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((service.name.clone(), *update));

        if let Some((status, body)) = &self.reject_with {
            return Err(Error::Rejected {
                status: *status,
                body: body.clone(),
            });
        }

        let mut services = self.services.lock().unwrap_or_else(|e| e.into_inner());
        let stored = services
            .get_mut(&service.name)
            .ok_or_else(|| Error::ServiceNotFound(service.name.clone()))?;
        stored.app_insights_enabled = update.app_insights_enabled;
        Ok(())
    }
}
