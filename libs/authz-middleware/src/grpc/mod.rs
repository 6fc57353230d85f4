//! gRPC server authorization
//!
//! [`ServerInterceptor`] authorizes tonic calls before they reach the handler:
//!
//! - **Unary**: identity, policy path and resource are resolved from the call
//!   metadata and the request message
//! - **Stream**: evaluated once when the stream opens, without message access
//! - **Layer**: [`AuthzLayer`] does the stream-open check for every method of a
//!   tonic server, from the HTTP/2 request head
//!
//! The default policy path is the full method name under the configured root,
//! `/pkg.Service/Method` becoming `root.pkg.Service.Method`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use authz_client::{AuthorizerConfig, RestAuthorizer};
//! use authz_middleware::grpc::{RpcRequest, ServerInterceptor};
//! use authz_middleware::{IdentityBuilder, Policy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let authorizer = RestAuthorizer::new(AuthorizerConfig::from_env())?;
//!
//! let interceptor = ServerInterceptor::new(authorizer, Policy::new("todo").with_root("todo"))?
//!     .with_identity(IdentityBuilder::<RpcRequest>::new().subject().from_header(["x-user"]))
//!     .with_resource_from_fields(["id"]);
//!
//! // In a handler:
//! // interceptor.unary("/todo.Todo/GetTodo", request, |req| self.get_todo(req)).await
//!
//! // Or for every method of a server:
//! // Server::builder().layer(interceptor.layer()).add_service(svc)
//! # Ok(())
//! # }
//! ```

mod layer;
mod request;

pub use layer::{AuthzLayer, AuthzService};
pub use request::{RpcRequest, GRPC_TIMEOUT_HEADER};

use crate::config::Policy;
use crate::error::{AuthzError, Result};
use crate::evaluator::Evaluator;
use crate::identity::{IdentityBuilder, AUTHORIZATION_HEADER};
use crate::pipeline::AuthzPipeline;
use crate::policy::{method_policy_path, static_path};
use crate::request::StringMapper;
use crate::resource::{no_resource, select};
use authz_client::{Authorizer, ClientError, ResourceContext};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tonic::{Request, Status};
use tracing::warn;

/// Authorizes inbound gRPC calls
#[derive(Clone)]
pub struct ServerInterceptor {
    pipeline: AuthzPipeline<RpcRequest>,
}

impl ServerInterceptor {
    /// Fails when the policy name or decision is missing.
    ///
    /// The caller identity defaults to the bearer token in `authorization`.
    pub fn new<A: Authorizer + 'static>(authorizer: A, policy: Policy) -> Result<Self> {
        Self::with_evaluator(Evaluator::new(authorizer), policy)
    }

    pub fn with_evaluator(evaluator: Evaluator, policy: Policy) -> Result<Self> {
        policy.validate()?;

        let mapper = match &policy.path {
            Some(path) => static_path(path.clone()),
            None => method_policy_mapper(policy.root()),
        };

        let mut pipeline = AuthzPipeline::new(evaluator, policy.reference(), mapper);
        pipeline.set_identity(IdentityBuilder::new().token().from_header([AUTHORIZATION_HEADER]));

        Ok(Self { pipeline })
    }

    pub fn with_identity(mut self, identity: IdentityBuilder<RpcRequest>) -> Self {
        self.pipeline.set_identity(identity);
        self
    }

    /// Use `path` for every call
    pub fn with_policy_path(mut self, path: impl Into<String>) -> Self {
        self.pipeline.set_policy_path(path);
        self
    }

    pub fn with_policy_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&RpcRequest) -> String + Send + Sync + 'static,
    {
        self.pipeline.set_policy_mapper(mapper);
        self
    }

    pub fn with_resource_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&RpcRequest) -> ResourceContext + Send + Sync + 'static,
    {
        self.pipeline.set_resource_mapper(mapper);
        self
    }

    /// Send the selected message fields as the resource.
    ///
    /// Fields are dotted paths into the message; nesting is preserved. Streams
    /// have no message and send an empty resource.
    pub fn with_resource_from_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();

        self.pipeline.set_resource_mapper(move |request: &RpcRequest| {
            let Some(message) = request.message() else {
                return no_resource();
            };

            select(message, fields.as_slice()).unwrap_or_else(|e| {
                warn!(method = %request.method(), error = %e, "Resource field selection failed");
                no_resource()
            })
        });
        self
    }

    pub fn pipeline(&self) -> &AuthzPipeline<RpcRequest> {
        &self.pipeline
    }

    /// Tower layer authorizing every call of a tonic server
    pub fn layer(&self) -> AuthzLayer {
        AuthzLayer::new(self.clone())
    }

    /// Evaluate one call, bounded by the client's `grpc-timeout`
    pub async fn authorize(&self, request: &RpcRequest) -> Result<()> {
        let query = self.pipeline.query(request)?;
        let evaluation = self.pipeline.evaluator().authorize(&query);

        match request.timeout() {
            Some(timeout) => tokio::time::timeout(timeout, evaluation).await.map_err(|_| {
                warn!(method = %request.method(), "Deadline exceeded during authorization");
                AuthzError::Transport(ClientError::DeadlineExceeded)
            })?,
            None => evaluation.await,
        }
    }

    /// Authorize a unary call, then hand the request to `handler`
    pub async fn unary<M, T, F, Fut>(&self, method: &str, request: Request<M>, handler: F) -> std::result::Result<T, Status>
    where
        M: Serialize,
        F: FnOnce(Request<M>) -> Fut,
        Fut: Future<Output = std::result::Result<T, Status>>,
    {
        let (metadata, extensions, message) = request.into_parts();

        let mut rpc = RpcRequest::new(method)
            .with_metadata(metadata)
            .with_extensions(extensions);

        match serde_json::to_value(&message) {
            Ok(value) => rpc = rpc.with_message(value),
            Err(e) => warn!(method = %method, error = %e, "Request message is not serializable"),
        }

        self.authorize(&rpc).await.map_err(|e| e.to_status())?;

        let (metadata, extensions) = rpc.into_parts();
        handler(Request::from_parts(metadata, extensions, message)).await
    }

    /// Authorize a stream when it opens, then hand it to `handler`
    pub async fn stream<S, T, F, Fut>(&self, method: &str, request: Request<S>, handler: F) -> std::result::Result<T, Status>
    where
        F: FnOnce(Request<S>) -> Fut,
        Fut: Future<Output = std::result::Result<T, Status>>,
    {
        let (metadata, extensions, stream) = request.into_parts();

        let rpc = RpcRequest::new(method)
            .with_metadata(metadata)
            .with_extensions(extensions);

        self.authorize(&rpc).await.map_err(|e| e.to_status())?;

        let (metadata, extensions) = rpc.into_parts();
        handler(Request::from_parts(metadata, extensions, stream)).await
    }
}

fn method_policy_mapper(root: &str) -> StringMapper<RpcRequest> {
    let root = root.to_string();
    Arc::new(move |request: &RpcRequest| method_policy_path(&root, request.method()))
}
