//! The toggle itself: resolve a service, enable monitoring, confirm.

use std::fmt;

use crate::config::WorkspaceConfig;
use crate::control::{ControlPlane, ServiceUpdate};
use crate::error::Error;

/// Proof that a service was updated. Renders as the line printed on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub service: String,
}

impl fmt::Display for Confirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "✅ Application Insights enabled for {}.", self.service)
    }
}

/// Enable Application Insights on the named service.
///
/// The update is sent even when the service already reports monitoring as
/// enabled; the remote state is the same either way. The first error ends
/// the run and nothing is retried.
pub async fn run(
    plane: &dyn ControlPlane,
    workspace: &WorkspaceConfig,
    name: &str,
) -> Result<Confirmation, Error> {
    let service = plane.find_service(workspace, name).await?;
    tracing::info!(
        service = %service.name,
        compute = service.compute_type.as_deref().unwrap_or("unknown"),
        state = service.state.as_deref().unwrap_or("unknown"),
        "resolved service"
    );
    if service.app_insights_enabled {
        tracing::info!(service = %service.name, "Application Insights already enabled");
    }

    plane
        .update_service(&service, &ServiceUpdate::enable_app_insights())
        .await?;

    Ok(Confirmation {
        service: service.name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmation_line_is_exact() {
        let confirmation = Confirmation {
            service: "bank-marketing-predictor".to_string(),
        };
        assert_eq!(
            confirmation.to_string(),
            "✅ Application Insights enabled for bank-marketing-predictor."
        );
    }
}
