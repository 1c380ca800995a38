//! Error taxonomy for a toggle run.

use std::path::PathBuf;

use thiserror::Error;

/// Every way a run can fail. None of these are recovered from.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no workspace config found in {} or any parent directory", start.display())]
    ConfigNotFound { start: PathBuf },

    #[error("failed to read workspace config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid workspace config {}: {reason}", path.display())]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("no Azure credentials found. Run `beacon login` or set AZURE_CLIENT_ID/AZURE_CLIENT_SECRET/AZURE_TENANT_ID.")]
    NotAuthenticated,

    #[error("workspace not found: {0}")]
    WorkspaceNotFound(String),

    #[error("service not found: {0}")]
    ServiceNotFound(String),

    #[error("control plane rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("request to control plane failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected control plane response: {0}")]
    Decode(String),
}

/// Which stage of the run an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Config file or credentials could not be resolved.
    Configuration,
    /// The workspace or service does not exist remotely.
    NotFound,
    /// The remote call itself failed or was refused.
    Remote,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigNotFound { .. }
            | Self::ConfigRead { .. }
            | Self::ConfigInvalid { .. }
            | Self::NotAuthenticated => ErrorKind::Configuration,
            Self::WorkspaceNotFound(_) | Self::ServiceNotFound(_) => ErrorKind::NotFound,
            Self::Rejected { .. } | Self::Http(_) | Self::Decode(_) => ErrorKind::Remote,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        let missing = Error::ConfigNotFound {
            start: PathBuf::from("/tmp"),
        };
        assert_eq!(missing.kind(), ErrorKind::Configuration);
        assert_eq!(Error::NotAuthenticated.kind(), ErrorKind::Configuration);
        assert_eq!(
            Error::ServiceNotFound("svc".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            Error::Rejected {
                status: 401,
                body: String::new()
            }
            .kind(),
            ErrorKind::Remote
        );
    }

    #[test]
    fn rejected_message_includes_status_and_body() {
        let err = Error::Rejected {
            status: 403,
            body: "AuthorizationFailed".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("403"));
        assert!(msg.contains("AuthorizationFailed"));
    }

    #[test]
    fn not_found_message_names_service() {
        let err = Error::ServiceNotFound("bank-marketing-predictor".into());
        assert_eq!(err.to_string(), "service not found: bank-marketing-predictor");
    }
}
