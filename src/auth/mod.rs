pub mod oauth;
pub mod storage;

pub use storage::AuthStorage;

use anyhow::{Context, Result, bail};
use storage::Credential;

use crate::consts::PROVIDER;
use crate::error::Error;

/// Complete interactive login: exchange the pasted authorization code and
/// save the resulting tokens.
pub async fn login(db_path: &str, tenant: &str, pasted: &str, verifier: &str) -> Result<()> {
    let Some(code) = oauth::extract_code(pasted) else {
        bail!("no authorization code provided");
    };
    let credentials = oauth::exchange_code(tenant, &code, verifier)
        .await
        .context("token exchange failed")?;
    let storage = AuthStorage::open(db_path).context("failed to open auth storage")?;
    storage
        .set(PROVIDER, Credential::OAuth(credentials))
        .context("failed to save credentials")?;
    Ok(())
}

/// Verify a service principal can obtain a token, then save it.
pub async fn login_service_principal(
    db_path: &str,
    tenant_id: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<()> {
    if client_secret.is_empty() {
        bail!("no client secret provided");
    }
    oauth::client_credentials(tenant_id, client_id, client_secret)
        .await
        .context("service principal authentication failed")?;
    let storage = AuthStorage::open(db_path).context("failed to open auth storage")?;
    storage
        .set(
            PROVIDER,
            Credential::ServicePrincipal {
                tenant_id: tenant_id.to_string(),
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
            },
        )
        .context("failed to save credentials")?;
    Ok(())
}

/// Remove stored credentials.
pub fn logout(db_path: &str) -> Result<()> {
    let storage = AuthStorage::open(db_path).context("failed to open auth storage")?;
    storage
        .remove(PROVIDER)
        .context("failed to remove credentials")?;
    Ok(())
}

/// Resolve a bearer token for the management plane or fail with
/// [`Error::NotAuthenticated`].
pub async fn require_token(storage: &AuthStorage) -> Result<String> {
    match storage.access_token(PROVIDER).await? {
        Some(token) => Ok(token),
        None => Err(Error::NotAuthenticated.into()),
    }
}
