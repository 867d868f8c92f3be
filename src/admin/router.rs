//! Admin API routing configuration

use axum::{Router, middleware, routing::get};

use super::{
    handlers::{get_integration_account, list_integrations},
    middleware::{AdminState, admin_auth_middleware},
};

/// Create Admin API router
///
/// # Endpoints
/// - `GET /integrations` - List stored integrations
/// - `GET /integrations/:external_id/account` - Account details via the stored credential
///
/// # Authentication
/// Requires Admin API Key authentication, supports:
/// - `x-api-key` header
/// - `Authorization: Bearer <token>` header
pub fn create_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/integrations", get(list_integrations))
        .route(
            "/integrations/{external_id}/account",
            get(get_integration_account),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::http::StatusCode;
    use serde_json::{Map, Value};

    use crate::identity::StaticIdentityProvider;
    use crate::integration::types::{IdentityCredential, IntegrationMetadata};
    use crate::integration::{IntegrationRecord, IntegrationStore, MemoryIntegrationStore};
    use crate::pipeline::SetupPipeline;
    use crate::test_support::{MockVsts, serve};
    use crate::vsts::{VstsClient, VstsIntegration};

    /// Base URL of the admin API with one integration stored for `domain`
    async fn admin_url(domain: &str) -> String {
        let store = Arc::new(MemoryIntegrationStore::new());
        store
            .create_or_update(IntegrationRecord {
                provider: "vsts".to_string(),
                name: "Alpha".to_string(),
                external_id: "p1".to_string(),
                metadata: IntegrationMetadata {
                    scopes: vec!["vso.code_full".to_string()],
                    domain_name: domain.to_string(),
                },
                credential: IdentityCredential {
                    access_token: "secret-token".to_string(),
                    kind: "vsts".to_string(),
                    external_id: domain.to_string(),
                    scopes: Vec::new(),
                    data: Map::new(),
                },
            })
            .unwrap();

        let integration = VstsIntegration::new(
            Arc::new(VstsClient::new(reqwest::Client::new(), "http")),
            Arc::new(StaticIdentityProvider),
        )
        .allow_any_instance_host(true);
        let pipeline = Arc::new(SetupPipeline::new(
            Arc::new(integration),
            store,
            chrono::Duration::minutes(10),
        ));
        pipeline.start();

        let router = Router::new().nest(
            "/api",
            create_admin_router(AdminState::new("admin-key", pipeline)),
        );
        format!("http://{}/api", serve(router).await)
    }

    #[tokio::test]
    async fn test_requires_admin_key() {
        let url = format!("{}/integrations", admin_url("fabrikam.visualstudio.com").await);
        let client = reqwest::Client::new();

        let resp = client.get(&url).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["type"], "authentication_error");

        let resp = client.get(&url).header("x-api-key", "wrong").send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_lists_integrations_without_tokens() {
        let url = format!("{}/integrations", admin_url("fabrikam.visualstudio.com").await);
        let resp = reqwest::Client::new()
            .get(&url)
            .bearer_auth("admin-key")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let text = resp.text().await.unwrap();
        assert!(!text.contains("secret-token"));

        let body: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(body["total"], 1);
        assert_eq!(body["activeSetupRuns"], 1);
        assert_eq!(body["integrations"][0]["externalId"], "p1");
        assert_eq!(body["integrations"][0]["domainName"], "fabrikam.visualstudio.com");
        assert_eq!(
            body["integrations"][0]["accessTokenHash"].as_str().unwrap().len(),
            64
        );
    }

    #[tokio::test]
    async fn test_account_lookup_uses_stored_credential() {
        let mock = MockVsts::spawn(&[]).await;
        let base = admin_url(&mock.instance).await;
        let client = reqwest::Client::new();

        let resp = client
            .get(format!("{}/integrations/p1/account", base))
            .header("x-api-key", "admin-key")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["apiVersion"], "4.1");
        assert_eq!(body["value"][0]["accountName"], "fabrikam");

        let resp = client
            .get(format!("{}/integrations/missing/account", base))
            .header("x-api-key", "admin-key")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
