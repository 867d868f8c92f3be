//! Visual Studio Team Services integration provider

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::identity::{IDENTITY_KEY, IdentityProvider, identity_pipeline_step};
use crate::integration::types::{
    IdentityCredential, IntegrationDescriptor, IntegrationMetadata, ProviderMetadata,
    SetupDialogConfig,
};
use crate::integration::{IntegrationProvider, IntegrationRecord};
use crate::pipeline::{PipelineError, PipelineState, Step};

use super::client::{API_VERSION, VstsApiError, VstsClient};
use super::project_step::{PROJECT_KEY, ProjectConfigStep};

pub const PROVIDER_KEY: &str = "vsts";
pub const PROVIDER_NAME: &str = "Visual Studio Team Services";
pub const DOMAIN: &str = ".visualstudio.com";

const DESCRIPTION: &str = "VSTS";
const AUTHOR: &str = "The Sentry Team";
const ISSUE_URL: &str = "https://github.com/getsentry/sentry/issues/new?title=VSTS%20Integration:%20&labels=Component%3A%20Integrations";
const SOURCE_URL: &str = "https://github.com/getsentry/sentry/tree/master/src/sentry/integrations/vsts";

/// Scopes requested from the identity provider
pub const IDENTITY_OAUTH_SCOPES: [&str; 3] = ["vso.code_full", "vso.identity_manage", "vso.work_full"];

pub struct VstsIntegration {
    descriptor: IntegrationDescriptor,
    client: Arc<VstsClient>,
    identity_provider: Arc<dyn IdentityProvider>,
    /// Held unordered; readers sort
    oauth_scopes: HashSet<String>,
    any_instance_host: bool,
}

impl VstsIntegration {
    pub fn new(client: Arc<VstsClient>, identity_provider: Arc<dyn IdentityProvider>) -> Self {
        let oauth_scopes: HashSet<String> =
            IDENTITY_OAUTH_SCOPES.iter().map(|s| s.to_string()).collect();

        let descriptor = IntegrationDescriptor {
            key: PROVIDER_KEY.to_string(),
            name: PROVIDER_NAME.to_string(),
            domain: DOMAIN.to_string(),
            api_version: API_VERSION.to_string(),
            metadata: ProviderMetadata {
                description: DESCRIPTION.to_string(),
                author: AUTHOR.to_string(),
                issue_url: ISSUE_URL.to_string(),
                source_url: SOURCE_URL.to_string(),
                aspects: Map::new(),
            },
            setup_dialog: SetupDialogConfig {
                width: 600,
                height: 800,
            },
            oauth_scopes: sorted(&oauth_scopes),
        };

        Self {
            descriptor,
            client,
            identity_provider,
            oauth_scopes,
            any_instance_host: false,
        }
    }

    /// Accept account hosts outside [`DOMAIN`], e.g. a local stand-in
    pub fn allow_any_instance_host(mut self, allow: bool) -> Self {
        self.any_instance_host = allow;
        self
    }

    /// OAuth scopes in ascending order, independent of set iteration order
    pub fn sorted_scopes(&self) -> Vec<String> {
        sorted(&self.oauth_scopes)
    }

    pub async fn get_account_info(
        &self,
        instance: &str,
        access_token: &str,
    ) -> Result<Value, VstsApiError> {
        self.client.get_account_info(instance, access_token).await
    }

    /// Default project chosen during setup: the `project` binding, else
    /// `identity.default_project`
    fn default_project_name(state: &PipelineState) -> Result<&str, PipelineError> {
        state
            .get(PROJECT_KEY)
            .and_then(Value::as_str)
            .or_else(|| {
                state
                    .get_path(&[IDENTITY_KEY, "default_project"])
                    .and_then(Value::as_str)
            })
            .ok_or_else(|| PipelineError::MissingState(PROJECT_KEY.to_string()))
    }
}

fn sorted(scopes: &HashSet<String>) -> Vec<String> {
    let mut scopes: Vec<String> = scopes.iter().cloned().collect();
    scopes.sort();
    scopes
}

#[async_trait]
impl IntegrationProvider for VstsIntegration {
    fn descriptor(&self) -> &IntegrationDescriptor {
        &self.descriptor
    }

    fn pipeline_steps(&self) -> Vec<Arc<dyn Step>> {
        vec![
            identity_pipeline_step(
                self.identity_provider.clone(),
                self.sorted_scopes(),
                DOMAIN,
                self.any_instance_host,
            ),
            Arc::new(ProjectConfigStep::new(self.client.clone())),
        ]
    }

    async fn build_integration(
        &self,
        state: &PipelineState,
    ) -> Result<IntegrationRecord, PipelineError> {
        let access_token = state.require_str(&[IDENTITY_KEY, "data", "access_token"])?;
        let instance = state.require_str(&[IDENTITY_KEY, "instance"])?;
        let project_name = Self::default_project_name(state)?;

        // Projects may have changed since the selection form was rendered
        let projects = self.client.get_projects(instance, access_token).await?;
        let project = projects
            .find_by_name(project_name)
            .ok_or_else(|| PipelineError::ProjectNotFound(project_name.to_string()))?;

        Ok(IntegrationRecord {
            provider: PROVIDER_KEY.to_string(),
            name: project.name.clone(),
            external_id: project.id.clone(),
            metadata: IntegrationMetadata {
                scopes: self.sorted_scopes(),
                domain_name: instance.to_string(),
            },
            credential: IdentityCredential {
                access_token: access_token.to_string(),
                kind: PROVIDER_KEY.to_string(),
                external_id: instance.to_string(),
                scopes: Vec::new(),
                data: Map::new(),
            },
        })
    }

    async fn account_info(&self, record: &IntegrationRecord) -> Result<Value, PipelineError> {
        Ok(self
            .get_account_info(&record.metadata.domain_name, &record.credential.access_token)
            .await?)
    }
}
