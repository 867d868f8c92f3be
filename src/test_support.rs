//! Local stand-in for a VSTS account and its OAuth token endpoint

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Form, Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use parking_lot::Mutex;
use serde_json::{Value, json};

/// Serve `router` on an ephemeral localhost port, returning `host:port`
pub(crate) async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr.to_string()
}

#[derive(Default)]
struct MockState {
    projects: Mutex<Vec<(String, String)>>,
    status: Mutex<Option<StatusCode>>,
    project_hits: AtomicUsize,
    last_authorization: Mutex<Option<String>>,
    last_token_form: Mutex<Option<HashMap<String, String>>>,
}

pub(crate) struct MockVsts {
    /// Value to use as the account instance (with the "http" scheme)
    pub instance: String,
    state: Arc<MockState>,
}

impl MockVsts {
    pub(crate) async fn spawn(projects: &[(&str, &str)]) -> Self {
        let state = Arc::new(MockState::default());
        state.set_projects(projects);

        let router = Router::new()
            .route("/DefaultCollection/_apis/projects", get(list_projects))
            .route("/_apis/accounts", get(list_accounts))
            .route("/oauth2/token", post(issue_token))
            .with_state(state.clone());

        Self {
            instance: serve(router).await,
            state,
        }
    }

    /// Make every following projects call answer with `status`
    pub(crate) fn respond_with(&self, status: StatusCode) {
        *self.state.status.lock() = Some(status);
    }

    pub(crate) fn set_projects(&self, projects: &[(&str, &str)]) {
        self.state.set_projects(projects);
    }

    pub(crate) fn project_hits(&self) -> usize {
        self.state.project_hits.load(Ordering::SeqCst)
    }

    pub(crate) fn last_authorization(&self) -> Option<String> {
        self.state.last_authorization.lock().clone()
    }

    pub(crate) fn last_token_form(&self) -> Option<HashMap<String, String>> {
        self.state.last_token_form.lock().clone()
    }

    pub(crate) fn token_url(&self) -> String {
        format!("http://{}/oauth2/token", self.instance)
    }
}

impl MockState {
    fn set_projects(&self, projects: &[(&str, &str)]) {
        *self.projects.lock() = projects
            .iter()
            .map(|(id, name)| (id.to_string(), name.to_string()))
            .collect();
    }
}

async fn list_projects(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.project_hits.fetch_add(1, Ordering::SeqCst);
    *state.last_authorization.lock() = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if let Some(status) = *state.status.lock() {
        return (status, "upstream says no").into_response();
    }

    let value: Vec<Value> = state
        .projects
        .lock()
        .iter()
        .map(|(id, name)| json!({"id": id, "name": name, "state": "wellFormed"}))
        .collect();
    Json(json!({"count": value.len(), "value": value})).into_response()
}

async fn list_accounts(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    Json(json!({
        "apiVersion": query.get("api-version"),
        "value": [{"accountId": "a1", "accountName": "fabrikam"}]
    }))
}

async fn issue_token(
    State(state): State<Arc<MockState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let assertion = form.get("assertion").cloned().unwrap_or_default();
    *state.last_token_form.lock() = Some(form);

    if assertion == "bad-code" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"Error": "invalid_grant", "ErrorDescription": "code expired"})),
        )
            .into_response();
    }

    Json(json!({
        "access_token": format!("access-for-{}", assertion),
        "token_type": "jwt-bearer",
        "expires_in": "3599",
        "refresh_token": "refresh-token",
        "scope": "vso.work_full vso.code_full vso.identity_manage"
    }))
    .into_response()
}
