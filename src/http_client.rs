//! HTTP Client builder module
//!
//! Builds the single reqwest client shared by the VSTS API client and the
//! OAuth identity provider

use reqwest::{Client, Proxy};
use std::time::Duration;

use crate::model::config::{Config, TlsBackend};

const USER_AGENT: &str = concat!("vsts-connect/", env!("CARGO_PKG_VERSION"));

/// Proxy configuration
#[derive(Debug, Clone, Default)]
pub struct ProxyConfig {
    /// Proxy URL, supports http/https/socks5
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Read proxy settings from config; `None` when no proxy URL is set
    pub fn from_config(config: &Config) -> Option<Self> {
        let url = config.proxy_url.as_deref()?.trim();
        if url.is_empty() {
            return None;
        }

        let credentials = match (&config.proxy_username, &config.proxy_password) {
            (Some(username), Some(password)) => Some((username.clone(), password.clone())),
            _ => None,
        };

        Some(Self {
            url: url.to_string(),
            username: credentials.as_ref().map(|(u, _)| u.clone()),
            password: credentials.map(|(_, p)| p),
        })
    }
}

/// Build the outbound HTTP client from service configuration
pub fn build_client(config: &Config) -> anyhow::Result<Client> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .user_agent(USER_AGENT);

    if config.tls_backend == TlsBackend::Rustls {
        builder = builder.use_rustls_tls();
    }

    if let Some(proxy_config) = ProxyConfig::from_config(config) {
        let mut proxy = Proxy::all(&proxy_config.url)?;

        if let (Some(username), Some(password)) = (&proxy_config.username, &proxy_config.password) {
            proxy = proxy.basic_auth(username, password);
        }

        builder = builder.proxy(proxy);
        tracing::info!("HTTP proxy configured: {}", proxy_config.url);
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_absent_without_url() {
        let config = Config::default();
        assert!(ProxyConfig::from_config(&config).is_none());

        let mut blank = Config::default();
        blank.proxy_url = Some("  ".to_string());
        assert!(ProxyConfig::from_config(&blank).is_none());
    }

    #[test]
    fn test_proxy_auth_requires_both_parts() {
        let mut config = Config::default();
        config.proxy_url = Some("socks5://127.0.0.1:1080".to_string());
        config.proxy_username = Some("user".to_string());

        let proxy = ProxyConfig::from_config(&config).unwrap();
        assert_eq!(proxy.url, "socks5://127.0.0.1:1080");
        assert!(proxy.username.is_none());

        config.proxy_password = Some("pass".to_string());
        let proxy = ProxyConfig::from_config(&config).unwrap();
        assert_eq!(proxy.username.as_deref(), Some("user"));
        assert_eq!(proxy.password.as_deref(), Some("pass"));
    }

    #[test]
    fn test_build_client_with_and_without_proxy() {
        let mut config = Config::default();
        assert!(build_client(&config).is_ok());

        config.proxy_url = Some("http://127.0.0.1:7890".to_string());
        assert!(build_client(&config).is_ok());
    }
}
