//! Tenant and credential metadata for outgoing authorizer calls
//!
//! Every call to the authorizer carries the caller's tenant id and, when
//! configured, an API key or OAuth token. The REST client adds these as HTTP
//! headers; gRPC callers attach [`ConnectionInterceptor`] to their own stubs.

use crate::error::{ClientError, Result};
use std::fmt;
use tonic::metadata::AsciiMetadataValue;
use tonic::service::Interceptor;
use tonic::{Request, Status};

/// Metadata key carrying the tenant id
pub const TENANT_ID_KEY: &str = "tenant-id";

const AUTHORIZATION_KEY: &str = "authorization";

/// Credentials used to authenticate with the authorizer service
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Sent as `authorization: basic <key>`
    ApiKey(String),

    /// Sent as `authorization: Bearer <token>`
    Token(String),
}

impl Credentials {
    pub fn header_value(&self) -> String {
        match self {
            Credentials::ApiKey(key) => format!("basic {}", key),
            Credentials::Token(token) => format!("Bearer {}", token),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::ApiKey(_) => f.write_str("ApiKey(***)"),
            Credentials::Token(_) => f.write_str("Token(***)"),
        }
    }
}

/// Session settings shared by every call made through a client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Connection {
    pub tenant_id: Option<String>,
    pub credentials: Option<Credentials>,
}

impl Connection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Header name/value pairs to attach to an outgoing call
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = Vec::with_capacity(2);

        if let Some(tenant_id) = self.tenant_id.as_deref().filter(|t| !t.is_empty()) {
            headers.push((TENANT_ID_KEY, tenant_id.to_string()));
        }

        if let Some(credentials) = &self.credentials {
            headers.push((AUTHORIZATION_KEY, credentials.header_value()));
        }

        headers
    }

    /// Build a tonic client interceptor injecting this connection's metadata.
    ///
    /// ## Errors
    ///
    /// Returns `ClientError::Config` if the tenant id or credentials are not
    /// valid ASCII metadata values.
    pub fn interceptor(&self) -> Result<ConnectionInterceptor> {
        let entries = self
            .headers()
            .into_iter()
            .map(|(key, value)| {
                AsciiMetadataValue::try_from(value)
                    .map(|value| (key, value))
                    .map_err(|e| ClientError::Config(format!("invalid {} metadata: {}", key, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ConnectionInterceptor { entries })
    }
}

/// Client-side interceptor that injects tenant and credential metadata
///
/// Values are parsed once when the interceptor is built and cloned into each
/// request.
///
/// ```rust,no_run
/// use authz_client::{Connection, Credentials};
///
/// # fn example() -> Result<(), authz_client::ClientError> {
/// let interceptor = Connection::new()
///     .with_tenant_id("0fb5d7eb-8190-4f9d-ac7f-db0ba8374cb7")
///     .with_credentials(Credentials::ApiKey("my-key".into()))
///     .interceptor()?;
///
/// // let client = AuthorizerClient::with_interceptor(channel, interceptor);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct ConnectionInterceptor {
    entries: Vec<(&'static str, AsciiMetadataValue)>,
}

impl Interceptor for ConnectionInterceptor {
    fn call(&mut self, mut request: Request<()>) -> std::result::Result<Request<()>, Status> {
        for (key, value) in &self.entries {
            request.metadata_mut().insert(*key, value.clone());
        }

        Ok(request)
    }
}
