use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::pipeline::MAX_RUN_TTL_DAYS;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TlsBackend {
    Rustls,
    NativeTls,
}

impl Default for TlsBackend {
    fn default() -> Self {
        Self::Rustls
    }
}

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_tls_backend")]
    pub tls_backend: TlsBackend,

    /// HTTP proxy URL (optional)
    /// Supported formats: http://host:port, https://host:port, socks5://host:port
    #[serde(default)]
    pub proxy_url: Option<String>,

    /// Proxy authentication username (optional)
    #[serde(default)]
    pub proxy_username: Option<String>,

    /// Proxy authentication password (optional)
    #[serde(default)]
    pub proxy_password: Option<String>,

    /// Timeout for outbound calls to VSTS, in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Scheme used to reach account instances ("https" outside of tests)
    #[serde(default = "default_api_scheme")]
    pub api_scheme: String,

    /// Accept account hosts outside `*.visualstudio.com` (local stand-ins only)
    #[serde(default)]
    pub allow_any_instance_host: bool,

    /// OAuth application id registered with VSTS
    #[serde(default)]
    pub vsts_client_id: Option<String>,

    /// OAuth client secret (the JWT assertion issued with the app registration)
    #[serde(default)]
    pub vsts_client_secret: Option<String>,

    /// Absolute URL VSTS redirects back to after authorization
    #[serde(default = "default_redirect_url")]
    pub redirect_url: String,

    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,

    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// Lifetime of an idle setup pipeline run, in seconds
    #[serde(default = "default_pipeline_ttl_secs")]
    pub pipeline_ttl_secs: i64,

    /// Admin API key (optional, enables the integration registry API)
    #[serde(default)]
    pub admin_api_key: Option<String>,

    /// JSON file the finished integrations are written to (in-memory if unset)
    #[serde(default)]
    pub integration_store_path: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_tls_backend() -> TlsBackend {
    TlsBackend::Rustls
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_api_scheme() -> String {
    "https".to_string()
}

fn default_redirect_url() -> String {
    "http://127.0.0.1:8080/extensions/vsts/setup/".to_string()
}

fn default_authorize_url() -> String {
    "https://app.vssps.visualstudio.com/oauth2/authorize".to_string()
}

fn default_token_url() -> String {
    "https://app.vssps.visualstudio.com/oauth2/token".to_string()
}

fn default_pipeline_ttl_secs() -> i64 {
    600
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            tls_backend: default_tls_backend(),
            proxy_url: None,
            proxy_username: None,
            proxy_password: None,
            http_timeout_secs: default_http_timeout_secs(),
            api_scheme: default_api_scheme(),
            allow_any_instance_host: false,
            vsts_client_id: None,
            vsts_client_secret: None,
            redirect_url: default_redirect_url(),
            authorize_url: default_authorize_url(),
            token_url: default_token_url(),
            pipeline_ttl_secs: default_pipeline_ttl_secs(),
            admin_api_key: None,
            integration_store_path: None,
        }
    }
}

impl Config {
    /// Get default config file path
    pub fn default_config_path() -> &'static str {
        "config.json"
    }

    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            // Config file doesn't exist, return default config
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let max_secs = MAX_RUN_TTL_DAYS * 24 * 3600;
        if self.pipeline_ttl_secs <= 0 || self.pipeline_ttl_secs > max_secs {
            anyhow::bail!(
                "pipelineTtlSecs must be between 1 and {}, got {}",
                max_secs,
                self.pipeline_ttl_secs
            );
        }
        Ok(())
    }

    /// Admin key, treating blank strings as not configured
    pub fn effective_admin_api_key(&self) -> Option<&str> {
        self.admin_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn pipeline_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.pipeline_ttl_secs)
    }
}
