use crate::request::{strip_port, InboundRequest};
use serde_json::Value;
use std::time::Duration;
use tonic::metadata::MetadataMap;

pub const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

/// Call context of an inbound RPC as seen by the mappers.
///
/// The message is present for unary calls only; streams are authorized when
/// they open, before any message is read.
#[derive(Debug, Default)]
pub struct RpcRequest {
    method: String,
    metadata: MetadataMap,
    extensions: http::Extensions,
    authority: Option<String>,
    message: Option<Value>,
}

impl RpcRequest {
    /// `method` is the full method path, `/pkg.Service/Method`
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, metadata: MetadataMap) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_extensions(mut self, extensions: http::Extensions) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = Some(authority.into());
        self
    }

    pub fn with_message(mut self, message: Value) -> Self {
        self.message = Some(message);
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    pub fn extensions(&self) -> &http::Extensions {
        &self.extensions
    }

    /// Request message as JSON, `None` for streams
    pub fn message(&self) -> Option<&Value> {
        self.message.as_ref()
    }

    /// Deadline the client attached to the call
    pub fn timeout(&self) -> Option<Duration> {
        self.header(GRPC_TIMEOUT_HEADER).and_then(parse_grpc_timeout)
    }

    pub(crate) fn into_parts(self) -> (MetadataMap, http::Extensions) {
        (self.metadata, self.extensions)
    }
}

impl InboundRequest for RpcRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.metadata
            .get(name.to_ascii_lowercase().as_str())
            .and_then(|v| v.to_str().ok())
    }

    fn hostname(&self) -> Option<String> {
        let authority = self.authority.as_deref().or_else(|| self.header("host"))?;
        let host = strip_port(authority);
        (!host.is_empty()).then(|| host.to_string())
    }

    fn extension<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.extensions.get::<T>().cloned()
    }
}

/// `grpc-timeout` value: up to eight digits and a unit (H, M, S, m, u, n)
pub(crate) fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    if !value.is_ascii() || value.len() < 2 || value.len() > 9 {
        return None;
    }

    let (digits, unit) = value.split_at(value.len() - 1);
    let amount: u64 = digits.parse().ok()?;

    let timeout = match unit {
        "H" => Duration::from_secs(amount * 3600),
        "M" => Duration::from_secs(amount * 60),
        "S" => Duration::from_secs(amount),
        "m" => Duration::from_millis(amount),
        "u" => Duration::from_micros(amount),
        "n" => Duration::from_nanos(amount),
        _ => return None,
    };

    Some(timeout)
}
