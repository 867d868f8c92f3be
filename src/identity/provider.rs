//! VSTS OAuth identity provider
//!
//! Builds the authorize redirect and performs the single code exchange at the
//! token endpoint (JWT bearer assertion grant)

use anyhow::{Result, bail};
use async_trait::async_trait;
use reqwest::Client;

use super::types::{IdentityData, TokenErrorResponse, TokenResponse};

const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";
const ASSERTION_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn key(&self) -> &str;

    /// URL the browser is sent to; `state` comes back on the redirect
    fn authorize_url(&self, state: &str, scopes: &[String]) -> String;

    async fn exchange_code(&self, code: &str, scopes: &[String]) -> Result<IdentityData>;
}

/// OAuth endpoints and app registration
#[derive(Debug, Clone)]
pub struct OAuthAppConfig {
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub redirect_url: String,
}

pub struct VstsIdentityProvider {
    app: OAuthAppConfig,
    http: Client,
}

impl VstsIdentityProvider {
    pub fn new(app: OAuthAppConfig, http: Client) -> Self {
        Self { app, http }
    }
}

#[async_trait]
impl IdentityProvider for VstsIdentityProvider {
    fn key(&self) -> &str {
        "vsts"
    }

    fn authorize_url(&self, state: &str, scopes: &[String]) -> String {
        let mut scopes = scopes.to_vec();
        scopes.sort();

        format!(
            "{}?client_id={}&response_type=Assertion&state={}&scope={}&redirect_uri={}",
            self.app.authorize_url,
            urlencoding::encode(&self.app.client_id),
            urlencoding::encode(state),
            urlencoding::encode(&scopes.join(" ")),
            urlencoding::encode(&self.app.redirect_url),
        )
    }

    async fn exchange_code(&self, code: &str, scopes: &[String]) -> Result<IdentityData> {
        let form = [
            ("client_assertion_type", CLIENT_ASSERTION_TYPE),
            ("client_assertion", self.app.client_secret.as_str()),
            ("grant_type", ASSERTION_GRANT_TYPE),
            ("assertion", code),
            ("redirect_uri", self.app.redirect_url.as_str()),
        ];

        let response = self
            .http
            .post(&self.app.token_url)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if let Ok(err_resp) = serde_json::from_str::<TokenErrorResponse>(&body) {
                bail!(
                    "Token exchange rejected: {}{}",
                    err_resp.error,
                    err_resp
                        .error_description
                        .map(|d| format!(" ({})", d))
                        .unwrap_or_default()
                );
            }
            bail!("Token exchange failed (status {}): {}", status, body);
        }

        let token: TokenResponse = response.json().await?;
        tracing::info!("OAuth code exchanged for access token");
        Ok(IdentityData::from_token(token, scopes))
    }
}
