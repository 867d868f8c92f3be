//! VSTS REST client
//!
//! Bearer-authenticated GETs against an account instance

use std::fmt;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::pipeline::PipelineError;

use super::types::ProjectList;

pub const API_VERSION: &str = "4.1";

/// Failure of a VSTS API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VstsApiError {
    /// Non-2xx response; the body is only logged
    Status { status_code: u16 },
    /// Connection, TLS or timeout failure
    Transport(String),
    /// 2xx response whose body did not parse
    Decode(String),
}

impl fmt::Display for VstsApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VstsApiError::Status { status_code } => {
                write!(f, "VSTS API returned status {}", status_code)
            }
            VstsApiError::Transport(msg) => write!(f, "VSTS API request failed: {}", msg),
            VstsApiError::Decode(msg) => write!(f, "VSTS API response invalid: {}", msg),
        }
    }
}

impl std::error::Error for VstsApiError {}

impl From<VstsApiError> for PipelineError {
    fn from(error: VstsApiError) -> Self {
        match error {
            VstsApiError::Status { status_code } => PipelineError::UpstreamError { status_code },
            other => PipelineError::UpstreamUnavailable(other.to_string()),
        }
    }
}

pub struct VstsClient {
    http: Client,
    scheme: String,
}

impl VstsClient {
    pub fn new(http: Client, scheme: impl Into<String>) -> Self {
        Self {
            http,
            scheme: scheme.into(),
        }
    }

    fn instance_url(&self, instance: &str, path: &str) -> String {
        format!("{}://{}{}", self.scheme, instance, path)
    }

    /// `GET /DefaultCollection/_apis/projects`
    pub async fn get_projects(
        &self,
        instance: &str,
        access_token: &str,
    ) -> Result<ProjectList, VstsApiError> {
        let url = self.instance_url(instance, "/DefaultCollection/_apis/projects");
        self.get_json(&url, access_token).await
    }

    /// `GET /_apis/accounts?api-version=4.1`, returned as raw JSON
    pub async fn get_account_info(
        &self,
        instance: &str,
        access_token: &str,
    ) -> Result<Value, VstsApiError> {
        let url = self.instance_url(
            instance,
            &format!("/_apis/accounts?api-version={}", API_VERSION),
        );
        self.get_json(&url, access_token).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, VstsApiError> {
        tracing::debug!("VSTS GET {}", url);

        let response = self
            .http
            .get(url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await
            .map_err(|e| VstsApiError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("VSTS GET {} failed with status {}: {}", url, status, body);
            return Err(VstsApiError::Status {
                status_code: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| VstsApiError::Decode(e.to_string()))
    }
}
