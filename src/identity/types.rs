//! OAuth identity types

use serde::{Deserialize, Deserializer, Serialize};

/// Token endpoint success response
///
/// VSTS encodes `expires_in` as a string; plain numbers are accepted too.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Token endpoint error response
#[derive(Debug, Deserialize)]
pub struct TokenErrorResponse {
    #[serde(alias = "Error")]
    pub error: String,
    #[serde(default, alias = "ErrorDescription")]
    pub error_description: Option<String>,
}

/// Identity payload bound under `identity.data`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityData {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub scopes: Vec<String>,
}

impl IdentityData {
    /// Build from a token response; falls back to the requested scopes when
    /// the provider does not echo the granted ones
    pub fn from_token(token: TokenResponse, requested_scopes: &[String]) -> Self {
        let mut scopes: Vec<String> = match token.scope.as_deref() {
            Some(granted) if !granted.trim().is_empty() => {
                granted.split_whitespace().map(str::to_string).collect()
            }
            _ => requested_scopes.to_vec(),
        };
        scopes.sort();
        scopes.dedup();

        Self {
            access_token: token.access_token,
            token_type: token.token_type,
            expires_in: token.expires_in,
            refresh_token: token.refresh_token,
            scopes,
        }
    }
}

fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Number(i64),
        Text(String),
    }

    Ok(match Option::<Seconds>::deserialize(deserializer)? {
        Some(Seconds::Number(n)) => Some(n),
        Some(Seconds::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}
