//! Read-only view of an inbound request
//!
//! Mappers are written against this trait so the same identity, policy and
//! resource strategies serve both the actix-web middleware and the gRPC
//! interceptor.

use actix_web::dev::ServiceRequest;
use actix_web::http::header;
use actix_web::HttpMessage;
use authz_client::{Identity, ResourceContext};
use std::sync::Arc;

/// Inbound request as seen by the mapping pipeline
pub trait InboundRequest {
    /// First value of a header (HTTP) or metadata field (gRPC)
    fn header(&self, name: &str) -> Option<&str>;

    /// Host name without the port
    fn hostname(&self) -> Option<String>;

    /// Typed value attached to the request by an earlier layer
    fn extension<T: Clone + Send + Sync + 'static>(&self) -> Option<T>;
}

/// Extracts a string (policy path) from a request
pub type StringMapper<R> = Arc<dyn Fn(&R) -> String + Send + Sync>;

/// Extracts the resource context from a request
pub type StructMapper<R> = Arc<dyn Fn(&R) -> ResourceContext + Send + Sync>;

/// Sets the caller identity for a request
pub type IdentityMapper<R> = Arc<dyn Fn(&R, &mut Identity) + Send + Sync>;

impl InboundRequest for ServiceRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers().get(name).and_then(|v| v.to_str().ok())
    }

    fn hostname(&self) -> Option<String> {
        let authority = self
            .headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| self.uri().authority().map(|a| a.as_str()))?;

        let host = strip_port(authority);
        (!host.is_empty()).then(|| host.to_string())
    }

    fn extension<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.extensions().get::<T>().cloned()
    }
}

/// `host:port` and `[v6]:port` to the bare host
pub(crate) fn strip_port(authority: &str) -> &str {
    if let Some(rest) = authority.strip_prefix('[') {
        return rest.split(']').next().unwrap_or_default();
    }

    authority.split(':').next().unwrap_or_default()
}
