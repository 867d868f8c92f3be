//! Setup dialog router
//!
//! Serves the provider descriptor and the setup pipeline. The setup URL is
//! also the OAuth redirect target, so the `state` parameter always carries
//! the run id.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{OriginalUri, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};

use crate::pipeline::{PipelineError, PipelineOutcome, SetupPipeline, StepView};

use super::templates;

/// Setup state for handlers
#[derive(Clone)]
pub struct SetupState {
    pub pipeline: Arc<SetupPipeline>,
}

/// Create setup router
///
/// # Endpoints
/// - `GET /{provider}` - Provider descriptor
/// - `GET|POST /{provider}/setup` - Start or resume a setup run
pub fn create_setup_router(pipeline: Arc<SetupPipeline>) -> Router {
    let key = pipeline.provider().descriptor().key.clone();
    let state = SetupState { pipeline };

    Router::new()
        .route(&format!("/{}", key), get(handle_descriptor))
        .route(
            &format!("/{}/setup", key),
            get(handle_setup_get).post(handle_setup_post),
        )
        .route(
            &format!("/{}/setup/", key),
            get(handle_setup_get).post(handle_setup_post),
        )
        .with_state(state)
}

/// Handle descriptor (GET /extensions/vsts)
async fn handle_descriptor(State(state): State<SetupState>) -> impl IntoResponse {
    Json(state.pipeline.provider().descriptor().clone())
}

/// Handle setup page or OAuth callback (GET /extensions/vsts/setup)
async fn handle_setup_get(
    State(state): State<SetupState>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    run_setup(&state, uri.path(), params).await
}

/// Handle form submission (POST /extensions/vsts/setup)
async fn handle_setup_post(
    State(state): State<SetupState>,
    OriginalUri(uri): OriginalUri,
    Query(mut params): Query<HashMap<String, String>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    // Posted fields win over the query string
    params.extend(form);
    run_setup(&state, uri.path(), params).await
}

async fn run_setup(state: &SetupState, path: &str, params: HashMap<String, String>) -> Response {
    let run_id = match params.get("state") {
        Some(run_id) if !run_id.is_empty() => run_id.clone(),
        _ => state.pipeline.start(),
    };

    match state.pipeline.dispatch(&run_id, params).await {
        Ok(PipelineOutcome::Render(StepView::Form(form))) => {
            Html(templates::render_form(path, &run_id, &form)).into_response()
        }
        Ok(PipelineOutcome::Render(StepView::Redirect { url })) => {
            Redirect::to(&url).into_response()
        }
        Ok(PipelineOutcome::Finished(record)) => {
            Html(templates::render_success(&record)).into_response()
        }
        Err(e) => render_error(path, &run_id, &e),
    }
}

/// Render error page
fn render_error(path: &str, run_id: &str, error: &PipelineError) -> Response {
    let retry_url = (!error.requires_restart())
        .then(|| format!("{}?state={}", path, urlencoding::encode(run_id)));
    let html = templates::render_error(error.title(), &error.to_string(), retry_url.as_deref(), path);
    (error.status_code(), Html(html)).into_response()
}
