//! Admin API type definitions

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::integration::IntegrationRecord;

// ============ Integration registry ============

/// Registry listing response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationListResponse {
    /// Number of stored integrations
    pub total: usize,
    /// Setup runs currently in progress
    pub active_setup_runs: usize,
    pub integrations: Vec<IntegrationSummary>,
}

/// One stored integration, without its access token
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationSummary {
    pub provider: String,
    /// Default project name
    pub name: String,
    pub external_id: String,
    pub domain_name: String,
    pub scopes: Vec<String>,
    /// SHA-256 of the access token (for duplicate detection)
    pub access_token_hash: String,
}

impl From<&IntegrationRecord> for IntegrationSummary {
    fn from(record: &IntegrationRecord) -> Self {
        Self {
            provider: record.provider.clone(),
            name: record.name.clone(),
            external_id: record.external_id.clone(),
            domain_name: record.metadata.domain_name.clone(),
            scopes: record.metadata.scopes.clone(),
            access_token_hash: sha256_hex(&record.credential.access_token),
        }
    }
}

fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

// ============ Error response ============

#[derive(Debug, Serialize)]
pub struct AdminErrorResponse {
    pub error: AdminError,
}

#[derive(Debug, Serialize)]
pub struct AdminError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

impl AdminErrorResponse {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: AdminError {
                error_type: error_type.into(),
                message: message.into(),
            },
        }
    }

    pub fn authentication_error() -> Self {
        Self::new("authentication_error", "Invalid or missing admin API key")
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }

    pub fn api_error(message: impl Into<String>) -> Self {
        Self::new("api_error", message)
    }
}
