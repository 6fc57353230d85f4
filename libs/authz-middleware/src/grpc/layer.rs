//! Tower layer authorizing every call of a tonic server
use super::{RpcRequest, ServerInterceptor};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tonic::metadata::MetadataMap;
use tower::{Layer, Service};
use tracing::error;

/// Authorization layer for tonic servers
///
/// Calls are checked when they open, from the method path, metadata and
/// extensions of the HTTP/2 request. Denied calls never reach the service and
/// get a trailers-only gRPC response carrying the error status.
#[derive(Clone)]
pub struct AuthzLayer {
    interceptor: Arc<ServerInterceptor>,
}

impl AuthzLayer {
    pub fn new(interceptor: ServerInterceptor) -> Self {
        Self {
            interceptor: Arc::new(interceptor),
        }
    }
}

impl<S> Layer<S> for AuthzLayer {
    type Service = AuthzService<S>;

    fn layer(&self, service: S) -> Self::Service {
        AuthzService {
            inner: service,
            interceptor: self.interceptor.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthzService<S> {
    inner: S,
    interceptor: Arc<ServerInterceptor>,
}

impl<S, ReqBody, ResBody> Service<http::Request<ReqBody>> for AuthzService<S>
where
    S: Service<http::Request<ReqBody>, Response = http::Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Default,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<ReqBody>) -> Self::Future {
        let interceptor = self.interceptor.clone();
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let mut rpc = RpcRequest::new(req.uri().path())
            .with_metadata(MetadataMap::from_headers(req.headers().clone()))
            .with_extensions(req.extensions().clone());
        if let Some(authority) = req.uri().authority() {
            rpc = rpc.with_authority(authority.as_str());
        }

        Box::pin(async move {
            if let Err(err) = interceptor.authorize(&rpc).await {
                return Ok(status_response(err.to_status()));
            }

            inner.call(req).await
        })
    }
}

/// Trailers-only response carrying `status`
fn status_response<B: Default>(status: tonic::Status) -> http::Response<B> {
    let mut response = http::Response::new(B::default());

    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/grpc"),
    );

    if let Err(e) = status.add_header(response.headers_mut()) {
        error!(error = %e, "Failed to encode gRPC status headers");
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_response_headers() {
        let response: http::Response<String> = status_response(tonic::Status::permission_denied("unauthorized"));

        assert_eq!(response.status(), http::StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "application/grpc");
        assert_eq!(response.headers()["grpc-status"], "7");
        assert_eq!(response.headers()["grpc-message"], "unauthorized");
    }
}
