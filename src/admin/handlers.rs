//! Admin API HTTP handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use super::{
    middleware::AdminState,
    types::{AdminErrorResponse, IntegrationListResponse, IntegrationSummary},
};

/// GET /api/integrations
/// List stored integrations
pub async fn list_integrations(State(state): State<AdminState>) -> impl IntoResponse {
    let records = state.pipeline.store().list();
    let integrations: Vec<IntegrationSummary> = records.iter().map(IntegrationSummary::from).collect();

    Json(IntegrationListResponse {
        total: integrations.len(),
        active_setup_runs: state.pipeline.active_runs(),
        integrations,
    })
}

/// GET /api/integrations/:external_id/account
/// Fetch account details with the stored credential
pub async fn get_integration_account(
    State(state): State<AdminState>,
    Path(external_id): Path<String>,
) -> impl IntoResponse {
    let provider = state.pipeline.provider();
    let record = state.pipeline.store().list().into_iter().find(|r| {
        r.provider == provider.descriptor().key && r.external_id == external_id
    });

    let Some(record) = record else {
        return (
            StatusCode::NOT_FOUND,
            Json(AdminErrorResponse::not_found(format!(
                "Integration not found: {}",
                external_id
            ))),
        )
            .into_response();
    };

    match provider.account_info(&record).await {
        Ok(info) => Json(info).into_response(),
        Err(e) => {
            tracing::warn!(external_id = %external_id, "Account lookup failed: {}", e);
            (e.status_code(), Json(AdminErrorResponse::api_error(e.to_string()))).into_response()
        }
    }
}
