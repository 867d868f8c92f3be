//! Default project selection step

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::pipeline::{
    Choice, FormField, FormView, PipelineError, PipelineState, Scratch, Step, StepRequest,
    StepResult, StepView,
};

use super::client::VstsClient;

pub const PROJECT_KEY: &str = "project";

const PROJECT_HELP_TEXT: &str = "Enter the Visual Studio Team Services project name that you wish to use as a default for new work items";

/// Lists the account's projects and binds the chosen name under `project`
pub struct ProjectConfigStep {
    client: Arc<VstsClient>,
}

impl ProjectConfigStep {
    pub fn new(client: Arc<VstsClient>) -> Self {
        Self { client }
    }

    async fn project_form(&self, state: &PipelineState) -> Result<FormView, PipelineError> {
        let instance = state.require_str(&["identity", "instance"])?;
        let access_token = state.require_str(&["identity", "data", "access_token"])?;

        let projects = self
            .client
            .get_projects(instance, access_token)
            .await
            .map_err(|e| PipelineError::UpstreamUnavailable(e.to_string()))?;

        let choices = projects
            .value
            .into_iter()
            .map(|p| Choice {
                id: p.id,
                name: p.name,
            })
            .collect();

        Ok(FormView::new("Default project")
            .with_field(
                FormField::choice(PROJECT_KEY, "Project", choices).with_help_text(PROJECT_HELP_TEXT),
            )
            .with_submit_label("Install"))
    }
}

#[async_trait]
impl Step for ProjectConfigStep {
    fn key(&self) -> &str {
        PROJECT_KEY
    }

    async fn dispatch(
        &self,
        request: &StepRequest,
        state: &PipelineState,
        _scratch: &mut Scratch,
    ) -> Result<StepResult, PipelineError> {
        if let Some(project) = request.param(PROJECT_KEY) {
            // Checked against the remote list only at finalize time
            if project.trim().is_empty() {
                return Err(PipelineError::InvalidInput(
                    "a project must be selected".to_string(),
                ));
            }
            return Ok(StepResult::advance(
                PROJECT_KEY,
                Value::String(project.to_string()),
            ));
        }

        let form = self.project_form(state).await?;
        Ok(StepResult::NeedsInput(StepView::Form(form)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockVsts;
    use axum::http::StatusCode;
    use serde_json::json;

    fn state_for(instance: &str) -> PipelineState {
        let mut state = PipelineState::new();
        state
            .bind(
                "identity",
                "identity",
                json!({"instance": instance, "data": {"access_token": "tok", "scopes": []}}),
            )
            .unwrap();
        state
    }

    fn step() -> ProjectConfigStep {
        ProjectConfigStep::new(Arc::new(VstsClient::new(reqwest::Client::new(), "http")))
    }

    fn request(params: &[(&str, &str)]) -> StepRequest {
        StepRequest::new(
            "run",
            params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_first_visit_renders_remote_choices() {
        let mock = MockVsts::spawn(&[("p1", "Alpha"), ("p2", "Beta")]).await;
        let state = state_for(&mock.instance);

        let result = step()
            .dispatch(&request(&[]), &state, &mut Scratch::new())
            .await
            .unwrap();

        let StepResult::NeedsInput(StepView::Form(form)) = result else {
            panic!("expected project form, got {:?}", result);
        };
        let field = form.field(PROJECT_KEY).unwrap();
        assert_eq!(field.help_text.as_deref(), Some(PROJECT_HELP_TEXT));
        assert_eq!(
            field.choices(),
            &[
                Choice { id: "p1".to_string(), name: "Alpha".to_string() },
                Choice { id: "p2".to_string(), name: "Beta".to_string() },
            ]
        );
        assert_eq!(mock.last_authorization().as_deref(), Some("Bearer tok"));
    }

    #[tokio::test]
    async fn test_posted_project_advances_without_remote_call() {
        let mock = MockVsts::spawn(&[("p1", "Alpha")]).await;
        let state = state_for(&mock.instance);

        let result = step()
            .dispatch(&request(&[("project", "Gamma")]), &state, &mut Scratch::new())
            .await
            .unwrap();

        assert_eq!(result, StepResult::advance(PROJECT_KEY, json!("Gamma")));
        assert_eq!(mock.project_hits(), 0);
    }

    #[tokio::test]
    async fn test_blank_project_rejected() {
        let state = state_for("unused");
        let err = step()
            .dispatch(&request(&[("project", "  ")]), &state, &mut Scratch::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_not_an_empty_form() {
        let mock = MockVsts::spawn(&[("p1", "Alpha")]).await;
        mock.respond_with(StatusCode::INTERNAL_SERVER_ERROR);
        let state = state_for(&mock.instance);

        let err = step()
            .dispatch(&request(&[]), &state, &mut Scratch::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn test_missing_identity_is_reported() {
        let err = step()
            .dispatch(&request(&[]), &PipelineState::new(), &mut Scratch::new())
            .await
            .unwrap_err();
        assert_eq!(err, PipelineError::MissingState("identity.instance".to_string()));
    }
}
