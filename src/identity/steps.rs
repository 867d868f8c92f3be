//! Steps of the identity sub-pipeline

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::pipeline::{
    FormField, FormView, PipelineError, PipelineState, Scratch, Step, StepRequest, StepResult,
    StepView,
};

use super::provider::IdentityProvider;

pub const INSTANCE_KEY: &str = "instance";
pub const DATA_KEY: &str = "data";

/// Asks for the account hostname, e.g. `fabrikam.visualstudio.com`
pub struct InstanceStep {
    domain: String,
    any_host: bool,
}

impl InstanceStep {
    /// Only hosts under `domain` are accepted
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            any_host: false,
        }
    }

    /// Accept any `host[:port]`; for local stand-ins of the provider
    pub fn allow_any_host(mut self, any_host: bool) -> Self {
        self.any_host = any_host;
        self
    }

    fn validate(&self, raw: &str) -> Result<String, PipelineError> {
        let invalid = || {
            PipelineError::InvalidInput(format!("'{}' is not an account hostname", raw.trim()))
        };
        let host = normalize_instance(raw).ok_or_else(invalid)?;
        if self.any_host {
            return Ok(host);
        }

        let domain = self.domain.to_ascii_lowercase();
        match host.strip_suffix(domain.as_str()) {
            Some(account) if !account.is_empty() && !host.contains(':') => Ok(host),
            _ => Err(PipelineError::InvalidInput(format!(
                "'{}' is not a *{} account",
                raw.trim(),
                self.domain
            ))),
        }
    }
}

/// Reduce user input to a bare hostname; `None` if it isn't one
fn normalize_instance(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let host = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed)
        .trim_end_matches('/');

    let valid = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':'));
    valid.then(|| host.to_ascii_lowercase())
}

#[async_trait]
impl Step for InstanceStep {
    fn key(&self) -> &str {
        INSTANCE_KEY
    }

    async fn dispatch(
        &self,
        request: &StepRequest,
        _state: &PipelineState,
        _scratch: &mut Scratch,
    ) -> Result<StepResult, PipelineError> {
        if let Some(raw) = request.param(INSTANCE_KEY) {
            let instance = self.validate(raw)?;
            return Ok(StepResult::advance(INSTANCE_KEY, Value::String(instance)));
        }

        let form = FormView::new("Connect your account")
            .with_field(
                FormField::text(INSTANCE_KEY, "Account")
                    .with_placeholder(format!("myaccount{}", self.domain))
                    .with_help_text("Hostname of the account you want to connect"),
            )
            .with_submit_label("Authorize");
        Ok(StepResult::NeedsInput(StepView::Form(form)))
    }
}

/// Redirects to the provider, then exchanges the returned code
pub struct OAuthLoginStep {
    provider: Arc<dyn IdentityProvider>,
    scopes: Vec<String>,
}

impl OAuthLoginStep {
    pub fn new(provider: Arc<dyn IdentityProvider>, scopes: Vec<String>) -> Self {
        Self { provider, scopes }
    }
}

#[async_trait]
impl Step for OAuthLoginStep {
    fn key(&self) -> &str {
        "oauth"
    }

    async fn dispatch(
        &self,
        request: &StepRequest,
        _state: &PipelineState,
        _scratch: &mut Scratch,
    ) -> Result<StepResult, PipelineError> {
        if let Some(error) = request.param("error") {
            let description = request.param("error_description").unwrap_or_default();
            tracing::warn!(provider = self.provider.key(), "Authorization denied: {}", error);
            return Err(PipelineError::IdentityFailed(
                format!("{} {}", error, description).trim_end().to_string(),
            ));
        }

        if let Some(code) = request.param("code") {
            if request.param("state") != Some(request.run_id()) {
                return Err(PipelineError::IdentityFailed(
                    "authorization state does not match this setup".to_string(),
                ));
            }
            let data = self
                .provider
                .exchange_code(code, &self.scopes)
                .await
                .map_err(|e| PipelineError::IdentityFailed(e.to_string()))?;
            let value = serde_json::to_value(data)
                .map_err(|e| PipelineError::IdentityFailed(e.to_string()))?;
            return Ok(StepResult::advance(DATA_KEY, value));
        }

        let url = self.provider.authorize_url(request.run_id(), &self.scopes);
        tracing::debug!(provider = self.provider.key(), "Redirecting to authorize URL");
        Ok(StepResult::NeedsInput(StepView::Redirect { url }))
    }
}
