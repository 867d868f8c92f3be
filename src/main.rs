mod admin;
mod common;
mod http_client;
mod identity;
mod integration;
mod model;
mod pipeline;
mod setup;
#[cfg(test)]
mod test_support;
mod vsts;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use clap::Parser;
use identity::{OAuthAppConfig, VstsIdentityProvider};
use integration::{IntegrationStore, JsonFileIntegrationStore, MemoryIntegrationStore};
use model::arg::Args;
use model::config::Config;
use pipeline::SetupPipeline;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use vsts::{VstsClient, VstsIntegration};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config_path = args
        .config
        .unwrap_or_else(|| Config::default_config_path().to_string());
    let config = Config::load(&config_path).unwrap_or_else(|e| {
        tracing::error!("Failed to load config: {}", e);
        std::process::exit(1);
    });

    let (client_id, client_secret) = match (&config.vsts_client_id, &config.vsts_client_secret) {
        (Some(id), Some(secret)) if !id.trim().is_empty() && !secret.trim().is_empty() => {
            (id.clone(), secret.clone())
        }
        _ => {
            tracing::error!("vstsClientId and vstsClientSecret must be set in config file");
            std::process::exit(1);
        }
    };

    let http = http_client::build_client(&config).unwrap_or_else(|e| {
        tracing::error!("Failed to build HTTP client: {}", e);
        std::process::exit(1);
    });

    // Integration store: CLI flag wins over config
    let store_path = args.store.or_else(|| config.integration_store_path.clone());
    let store: Arc<dyn IntegrationStore> = match store_path {
        Some(path) => {
            let store = JsonFileIntegrationStore::load(&path).unwrap_or_else(|e| {
                tracing::error!("Failed to load integration store {}: {}", path, e);
                std::process::exit(1);
            });
            Arc::new(store)
        }
        None => {
            tracing::warn!("No integration store path configured, integrations are kept in memory");
            Arc::new(MemoryIntegrationStore::new())
        }
    };

    let identity_provider = VstsIdentityProvider::new(
        OAuthAppConfig {
            client_id,
            client_secret,
            authorize_url: config.authorize_url.clone(),
            token_url: config.token_url.clone(),
            redirect_url: config.redirect_url.clone(),
        },
        http.clone(),
    );
    let vsts_client = VstsClient::new(http, config.api_scheme.clone());
    let integration = VstsIntegration::new(Arc::new(vsts_client), Arc::new(identity_provider))
        .allow_any_instance_host(config.allow_any_instance_host);
    if config.allow_any_instance_host {
        tracing::warn!("allowAnyInstanceHost is set, account hosts are not restricted");
    }

    let pipeline = Arc::new(SetupPipeline::new(
        Arc::new(integration),
        store,
        config.pipeline_ttl(),
    ));

    // Sweep abandoned setup runs
    let sweeper = pipeline.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let removed = sweeper.cleanup_expired_sessions();
            if removed > 0 {
                tracing::debug!("Removed {} expired setup runs", removed);
            }
        }
    });

    let mut app = Router::new().nest("/extensions", setup::create_setup_router(pipeline.clone()));

    // Security check: empty string is treated as not configured, preventing empty key bypass
    let admin_enabled = match config.effective_admin_api_key() {
        Some(admin_key) => {
            let admin_state = admin::AdminState::new(admin_key, pipeline.clone());
            let admin_app = admin::create_admin_router(admin_state).layer(CorsLayer::permissive());
            app = app.nest("/api", admin_app);
            tracing::info!("Admin API enabled");
            true
        }
        None => {
            if config.admin_api_key.is_some() {
                tracing::warn!("adminApiKey is empty, Admin API not enabled");
            }
            false
        }
    };
    let app = app.layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting VSTS setup service: {}", addr);
    tracing::info!("OAuth redirect URL: {}", config.redirect_url);
    tracing::info!("Available endpoints:");
    tracing::info!("  GET  /extensions/vsts");
    tracing::info!("  GET  /extensions/vsts/setup");
    tracing::info!("  POST /extensions/vsts/setup");
    if admin_enabled {
        tracing::info!("Admin API:");
        tracing::info!("  GET  /api/integrations");
    }

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        });
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
