/// Authorizer client configuration
///
/// Manages the endpoint, tenant, credentials and TLS settings used to reach the
/// policy-decision service. Supports environment-based configuration for
/// different deployments.
use crate::connection::{Connection, Credentials};
use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizerConfig {
    /// Base URL of the authorizer REST API
    pub url: String,

    /// Tenant id sent with every call
    pub tenant_id: Option<String>,

    /// API key credentials
    pub api_key: Option<String>,

    /// OAuth token credentials, used when no API key is set
    pub token: Option<String>,

    /// Path to a CA certificate (PEM) trusted as a root
    pub ca_cert_path: Option<String>,

    /// Skip TLS certificate verification
    pub insecure: bool,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

impl AuthorizerConfig {
    /// Load configuration from environment variables
    /// Falls back to defaults for development
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            url: env::var("AUTHORIZER_URL").unwrap_or_else(|_| "https://localhost:8383".to_string()),
            tenant_id: env::var("AUTHORIZER_TENANT_ID").ok(),
            api_key: env::var("AUTHORIZER_API_KEY").ok(),
            token: env::var("AUTHORIZER_TOKEN").ok(),
            ca_cert_path: env::var("AUTHORIZER_CA_CERT_PATH").ok(),
            insecure: env::var("AUTHORIZER_INSECURE")
                .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE"))
                .unwrap_or(false),
            connect_timeout_secs: env::var("AUTHORIZER_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            request_timeout_secs: env::var("AUTHORIZER_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
        }
    }

    /// Configuration for a local authorizer with a self-signed certificate
    pub fn development() -> Self {
        Self {
            url: "https://localhost:8383".to_string(),
            tenant_id: None,
            api_key: None,
            token: None,
            ca_cert_path: None,
            insecure: true,
            connect_timeout_secs: 5,
            request_timeout_secs: 10,
        }
    }

    /// Tenant and credentials derived from this configuration
    pub fn connection(&self) -> Connection {
        let credentials = match (&self.api_key, &self.token) {
            (Some(key), _) => Some(Credentials::ApiKey(key.clone())),
            (None, Some(token)) => Some(Credentials::Token(token.clone())),
            (None, None) => None,
        };

        Connection {
            tenant_id: self.tenant_id.clone(),
            credentials,
        }
    }

    /// Build a reqwest client with timeouts and TLS settings applied
    pub fn http_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .timeout(Duration::from_secs(self.request_timeout_secs))
            .tcp_nodelay(true);

        if let Some(ca_path) = &self.ca_cert_path {
            let ca_pem = fs::read(ca_path)?;
            let certificate = reqwest::Certificate::from_pem(&ca_pem)
                .map_err(|e| ClientError::Config(format!("invalid CA certificate {}: {}", ca_path, e)))?;
            builder = builder.add_root_certificate(certificate);
        }

        if self.insecure {
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(builder.build()?)
    }
}
