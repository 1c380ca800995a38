use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use rusqlite::Connection;

use super::oauth::{self, OAuthCredentials};

/// Credential types stored per provider.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum Credential {
    #[serde(rename = "oauth")]
    OAuth(OAuthCredentials),
    #[serde(rename = "service_principal")]
    ServicePrincipal {
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
}

/// Credentials taken from the process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvCredential {
    ServicePrincipal {
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
    AccessToken(String),
}

impl EnvCredential {
    /// Read `AZURE_TENANT_ID`/`AZURE_CLIENT_ID`/`AZURE_CLIENT_SECRET`, falling
    /// back to a raw `AZURE_ACCESS_TOKEN`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let (Some(tenant_id), Some(client_id), Some(client_secret)) = (
            get("AZURE_TENANT_ID"),
            get("AZURE_CLIENT_ID"),
            get("AZURE_CLIENT_SECRET"),
        ) {
            return Some(Self::ServicePrincipal {
                tenant_id,
                client_id,
                client_secret,
            });
        }

        get("AZURE_ACCESS_TOKEN").map(Self::AccessToken)
    }

    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Manages credential storage in SQLite.
pub struct AuthStorage {
    conn: Mutex<Connection>,
}

impl AuthStorage {
    /// Open or create a credentials table in the given database path.
    /// Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self> {
        if path != ":memory:"
            && let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path).context("failed to open credential database")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS credentials (
                provider TEXT PRIMARY KEY,
                data     TEXT NOT NULL
            )",
        )
        .context("failed to create credentials table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("credential store lock poisoned"))
    }

    /// Get credential for a provider.
    pub fn get(&self, provider: &str) -> Result<Option<Credential>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT data FROM credentials WHERE provider = ?1")?;
        let mut rows = stmt.query([provider])?;
        match rows.next()? {
            Some(row) => {
                let json: String = row.get(0)?;
                let cred: Credential = serde_json::from_str(&json)?;
                Ok(Some(cred))
            }
            None => Ok(None),
        }
    }

    /// Store credential for a provider (upsert).
    pub fn set(&self, provider: &str, credential: Credential) -> Result<()> {
        let json = serde_json::to_string(&credential)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO credentials (provider, data) VALUES (?1, ?2)
             ON CONFLICT(provider) DO UPDATE SET data = excluded.data",
            [provider, &json],
        )?;
        Ok(())
    }

    /// Remove credential for a provider.
    pub fn remove(&self, provider: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM credentials WHERE provider = ?1", [provider])?;
        Ok(())
    }

    /// Get a management-plane bearer token, refreshing OAuth tokens as needed.
    /// Priority: stored OAuth → stored service principal → environment.
    pub async fn access_token(&self, provider: &str) -> Result<Option<String>> {
        self.access_token_with(provider, EnvCredential::from_env())
            .await
    }

    /// Same as [`access_token`](Self::access_token) with the environment
    /// credential supplied by the caller.
    pub async fn access_token_with(
        &self,
        provider: &str,
        env: Option<EnvCredential>,
    ) -> Result<Option<String>> {
        if let Some(cred) = self.get(provider)? {
            match cred {
                Credential::OAuth(mut creds) => {
                    if creds.is_expired() {
                        tracing::debug!(provider, "access token expired, refreshing");
                        let refreshed = oauth::refresh_token(&creds.tenant, &creds.refresh)
                            .await
                            .context("failed to refresh access token")?;
                        self.set(provider, Credential::OAuth(refreshed.clone()))?;
                        creds = refreshed;
                    }
                    return Ok(Some(creds.access));
                }
                Credential::ServicePrincipal {
                    tenant_id,
                    client_id,
                    client_secret,
                } => {
                    let (token, _) =
                        oauth::client_credentials(&tenant_id, &client_id, &client_secret).await?;
                    return Ok(Some(token));
                }
            }
        }

        match env {
            Some(EnvCredential::ServicePrincipal {
                tenant_id,
                client_id,
                client_secret,
            }) => {
                tracing::debug!("using service principal from environment");
                let (token, _) =
                    oauth::client_credentials(&tenant_id, &client_id, &client_secret).await?;
                Ok(Some(token))
            }
            Some(EnvCredential::AccessToken(token)) => Ok(Some(token)),
            None => Ok(None),
        }
    }
}
