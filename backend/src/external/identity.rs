//! Identity provider client
//!
//! Fetches the realm signing key from a Keycloak-style issuer so tokens can be
//! verified without a key in the local configuration.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Realm metadata client
#[derive(Clone)]
pub struct IdentityProviderClient {
    client: Client,
    issuer: String,
}

/// Realm document served at the issuer URL
#[derive(Debug, Deserialize)]
struct RealmResponse {
    realm: Option<String>,
    public_key: String,
}

impl IdentityProviderClient {
    pub fn new(issuer: impl Into<String>) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::IdentityProvider(e.to_string()))?;

        Ok(Self {
            client,
            issuer: issuer.into(),
        })
    }

    /// Fetch the realm's RS256 public key as PEM
    pub async fn fetch_public_key(&self) -> AppResult<String> {
        let url = self.issuer.trim_end_matches('/');
        tracing::info!("Fetching realm public key from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::IdentityProvider(format!(
                "realm endpoint returned {}",
                response.status()
            )));
        }

        let realm: RealmResponse = response
            .json()
            .await
            .map_err(|e| AppError::IdentityProvider(format!("invalid realm document: {e}")))?;

        tracing::debug!(realm = ?realm.realm, "realm public key received");
        Ok(to_pem(&realm.public_key))
    }
}

/// Wrap a base64 DER public key in PEM armor with 64-column lines
pub fn to_pem(der_base64: &str) -> String {
    let compact: String = der_base64.chars().filter(|c| !c.is_whitespace()).collect();
    let mut pem = String::from("-----BEGIN PUBLIC KEY-----\n");

    let bytes = compact.as_bytes();
    for chunk in bytes.chunks(64) {
        pem.push_str(&String::from_utf8_lossy(chunk));
        pem.push('\n');
    }

    pem.push_str("-----END PUBLIC KEY-----\n");
    pem
}
