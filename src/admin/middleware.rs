//! Admin API middleware

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};

use crate::common::auth;
use crate::pipeline::SetupPipeline;

use super::types::AdminErrorResponse;

/// Admin API shared state
#[derive(Clone)]
pub struct AdminState {
    pub admin_api_key: String,
    pub pipeline: Arc<SetupPipeline>,
}

impl AdminState {
    pub fn new(admin_api_key: impl Into<String>, pipeline: Arc<SetupPipeline>) -> Self {
        Self {
            admin_api_key: admin_api_key.into(),
            pipeline,
        }
    }
}

/// Admin API authentication middleware
pub async fn admin_auth_middleware(
    State(state): State<AdminState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match auth::extract_api_key(&request) {
        Some(key) if auth::constant_time_eq(&key, &state.admin_api_key) => next.run(request).await,
        _ => {
            tracing::warn!(path = %request.uri().path(), "Rejected admin request");
            let error = AdminErrorResponse::authentication_error();
            (StatusCode::UNAUTHORIZED, Json(error)).into_response()
        }
    }
}
