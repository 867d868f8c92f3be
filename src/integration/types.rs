//! Integration type definitions

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============ Persisted record ============

/// Terminal artifact of a setup run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationRecord {
    /// Provider key, e.g. "vsts"
    pub provider: String,
    pub name: String,
    pub external_id: String,
    pub metadata: IntegrationMetadata,
    pub credential: IdentityCredential,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationMetadata {
    /// Granted scopes, sorted ascending
    pub scopes: Vec<String>,
    pub domain_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityCredential {
    pub access_token: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub external_id: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl IntegrationRecord {
    /// Identity of the record in a store
    pub fn store_key(&self) -> (&str, &str) {
        (&self.provider, &self.external_id)
    }
}

// ============ Provider description ============

#[derive(Debug, Clone, Serialize)]
pub struct IntegrationDescriptor {
    pub key: String,
    pub name: String,
    pub domain: String,
    pub api_version: String,
    pub metadata: ProviderMetadata,
    pub setup_dialog: SetupDialogConfig,
    pub oauth_scopes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderMetadata {
    pub description: String,
    pub author: String,
    pub issue_url: String,
    pub source_url: String,
    pub aspects: Map<String, Value>,
}

/// Size of the popup the host opens the setup pipeline in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SetupDialogConfig {
    pub width: u32,
    pub height: u32,
}
