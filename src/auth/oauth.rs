use anyhow::{Result, bail};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngExt;
use reqwest::Url;
use sha2::{Digest, Sha256};

use crate::consts::LOGIN_ENDPOINT;

/// Public client id of the Azure CLI, allowed to request management tokens.
const CLIENT_ID: &str = "04b07795-8ddb-461a-bbee-02f9e1bf7b46";
const REDIRECT_URI: &str = "http://localhost";
const SCOPES: &str = "https://management.azure.com/.default offline_access";
const CLIENT_CREDENTIALS_SCOPE: &str = "https://management.azure.com/.default";

/// Safety margin subtracted from every token lifetime.
const EXPIRY_BUFFER_MS: u64 = 5 * 60 * 1000;

/// OAuth credentials stored after login.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OAuthCredentials {
    pub access: String,
    pub refresh: String,
    /// Expiration timestamp in milliseconds since epoch.
    pub expires: u64,
    pub tenant: String,
}

impl OAuthCredentials {
    pub fn is_expired(&self) -> bool {
        now_ms() >= self.expires
    }
}

/// PKCE verifier and challenge pair.
struct Pkce {
    verifier: String,
    challenge: String,
}

/// Generate a PKCE code verifier and S256 challenge.
fn generate_pkce() -> Pkce {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    let verifier = URL_SAFE_NO_PAD.encode(bytes);
    let challenge = challenge_for(&verifier);

    Pkce {
        verifier,
        challenge,
    }
}

fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn expires_at(expires_in_secs: u64) -> u64 {
    (now_ms() + expires_in_secs * 1000).saturating_sub(EXPIRY_BUFFER_MS)
}

fn token_url(tenant: &str) -> String {
    format!("{LOGIN_ENDPOINT}/{tenant}/oauth2/v2.0/token")
}

/// Build the authorization URL for the user to visit.
/// Returns (url, pkce_verifier); the caller keeps the verifier for token exchange.
pub fn build_authorize_url(tenant: &str) -> (String, String) {
    let pkce = generate_pkce();

    let params = [
        ("client_id", CLIENT_ID),
        ("response_type", "code"),
        ("redirect_uri", REDIRECT_URI),
        ("response_mode", "query"),
        ("scope", SCOPES),
        ("code_challenge", &pkce.challenge),
        ("code_challenge_method", "S256"),
        ("prompt", "select_account"),
    ];

    let url = format!(
        "{LOGIN_ENDPOINT}/{tenant}/oauth2/v2.0/authorize?{}",
        encode_form(&params)
    );
    (url, pkce.verifier)
}

/// Pull the authorization code out of whatever the user pasted: either the
/// bare code or the full `http://localhost/?code=...&...` redirect URL.
pub fn extract_code(pasted: &str) -> Option<String> {
    let pasted = pasted.trim();
    if pasted.is_empty() {
        return None;
    }
    match Url::parse(pasted) {
        Ok(url) => url
            .query_pairs()
            .find(|(k, _)| k == "code")
            .map(|(_, v)| v.into_owned())
            .filter(|code| !code.is_empty()),
        Err(_) => Some(pasted.to_string()),
    }
}

/// Exchange an authorization code for tokens.
pub async fn exchange_code(tenant: &str, code: &str, verifier: &str) -> Result<OAuthCredentials> {
    let params = [
        ("grant_type", "authorization_code"),
        ("client_id", CLIENT_ID),
        ("code", code),
        ("redirect_uri", REDIRECT_URI),
        ("scope", SCOPES),
        ("code_verifier", verifier),
    ];
    let data = request_token(tenant, &params, "token exchange").await?;
    into_credentials(tenant, data)
}

/// Refresh an expired access token.
pub async fn refresh_token(tenant: &str, refresh: &str) -> Result<OAuthCredentials> {
    let params = [
        ("grant_type", "refresh_token"),
        ("client_id", CLIENT_ID),
        ("refresh_token", refresh),
        ("scope", SCOPES),
    ];
    let data = request_token(tenant, &params, "token refresh").await?;
    into_credentials(tenant, data)
}

/// Acquire a token for a service principal. Returns (access_token, expires_ms).
pub async fn client_credentials(
    tenant: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<(String, u64)> {
    let params = [
        ("grant_type", "client_credentials"),
        ("client_id", client_id),
        ("client_secret", client_secret),
        ("scope", CLIENT_CREDENTIALS_SCOPE),
    ];
    let data = request_token(tenant, &params, "client credentials").await?;
    Ok((data.access_token, expires_at(data.expires_in)))
}

async fn request_token(tenant: &str, params: &[(&str, &str)], what: &str) -> Result<TokenResponse> {
    let client = reqwest::Client::new();
    let resp = client
        .post(token_url(tenant))
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(encode_form(params))
        .send()
        .await?;

    if !resp.status().is_success() {
        let text = resp.text().await.unwrap_or_default();
        bail!("{what} failed: {text}");
    }

    Ok(resp.json().await?)
}

fn into_credentials(tenant: &str, data: TokenResponse) -> Result<OAuthCredentials> {
    let Some(refresh) = data.refresh_token else {
        bail!("identity provider returned no refresh token");
    };
    Ok(OAuthCredentials {
        access: data.access_token,
        refresh,
        expires: expires_at(data.expires_in),
        tenant: tenant.to_string(),
    })
}

#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: u64,
}

fn encode_form(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoded(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Minimal URL encoding for query parameters.
fn urlencoded(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            _ => {
                out.push_str(&format!("%{:02X}", b));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urlencoded_escapes_reserved() {
        assert_eq!(urlencoded("a b/c"), "a%20b%2Fc");
        assert_eq!(urlencoded("safe-_.~"), "safe-_.~");
    }

    fn query_param<'a>(url: &'a str, key: &str) -> &'a str {
        url.split(['?', '&'])
            .find_map(|p| p.strip_prefix(key)?.strip_prefix('='))
            .unwrap()
    }

    #[test]
    fn authorize_url_challenge_matches_verifier() {
        let (url, verifier) = build_authorize_url("organizations");
        assert_eq!(query_param(&url, "code_challenge"), challenge_for(&verifier));
        assert_eq!(query_param(&url, "code_challenge_method"), "S256");
    }

    #[test]
    fn challenge_differs_for_other_verifier() {
        let (url, _) = build_authorize_url("organizations");
        assert_ne!(query_param(&url, "code_challenge"), challenge_for("verifier"));
    }

    #[test]
    fn extract_code_decodes_redirect_query() {
        let pasted = "http://localhost/?code=0.AX%2Bq%2Fz&session_state=xyz";
        assert_eq!(extract_code(pasted).as_deref(), Some("0.AX+q/z"));
    }

    #[test]
    fn extract_code_empty_code_in_url() {
        assert!(extract_code("http://localhost/?code=&state=1").is_none());
    }

    #[test]
    fn expires_at_subtracts_buffer() {
        let before = now_ms();
        let at = expires_at(3600);
        assert!(at >= before + 3600 * 1000 - EXPIRY_BUFFER_MS);
        assert!(at < before + 3600 * 1000);
    }

    #[test]
    fn short_lifetime_does_not_underflow() {
        assert!(expires_at(0) <= now_ms());
    }

    #[test]
    fn token_url_includes_tenant() {
        assert_eq!(
            token_url("contoso.onmicrosoft.com"),
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/v2.0/token"
        );
    }
}
