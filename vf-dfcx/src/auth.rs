//! Access tokens for the Dialogflow API.
//!
//! A service-account key is turned into a short-lived access token with the OAuth 2.0
//! JWT bearer flow: sign an RS256 assertion with the key, then exchange it at the key's
//! `token_uri`. One token is fetched per run; it outlives any realistic import.

use anyhow::{Context, Result};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info};

use crate::load_config::Credentials;

pub const SCOPES: &str =
    "https://www.googleapis.com/auth/cloud-platform https://www.googleapis.com/auth/dialogflow";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: u64 = 3600;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The fields of a Google service-account JSON key this client needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub fn read_service_account_key(path: &Path) -> Result<ServiceAccountKey> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read key file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse service account key {}", path.display()))
}

/// Signs the assertion exchanged for an access token. `now` is seconds since the epoch.
pub fn sign_assertion(key: &ServiceAccountKey, now: u64) -> Result<String> {
    let claims = Claims {
        iss: key.client_email.clone(),
        scope: SCOPES.to_string(),
        aud: key.token_uri.clone(),
        iat: now,
        exp: now + ASSERTION_LIFETIME_SECS,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .context("Failed to parse service account private key")?;
    encode(&header, &claims, &encoding_key).context("Failed to sign JWT assertion")
}

pub async fn fetch_access_token(http: &reqwest::Client, key: &ServiceAccountKey) -> Result<String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("System clock is before the epoch")?
        .as_secs();
    let assertion = sign_assertion(key, now)?;

    info!(client_email = %key.client_email, token_uri = %key.token_uri, "Requesting access token");
    let response = http
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await
        .with_context(|| format!("Failed to reach token endpoint {}", key.token_uri))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
        error!(status = %status, token_uri = %key.token_uri, "Token endpoint returned error. Response body: {body}");
        anyhow::bail!("token endpoint returned {status}: {body}");
    }

    let token: TokenResponse = response
        .json()
        .await
        .context("Failed to parse token endpoint response")?;
    info!("Access token obtained");
    Ok(token.access_token)
}

pub async fn resolve_access_token(http: &reqwest::Client, credentials: &Credentials) -> Result<String> {
    match credentials {
        Credentials::AccessToken(token) => Ok(token.clone()),
        Credentials::KeyFile(path) => {
            let key = read_service_account_key(path)?;
            fetch_access_token(http, &key).await
        }
    }
}
