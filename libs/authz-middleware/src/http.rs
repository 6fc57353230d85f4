//! actix-web authorization middleware
//!
//! Each request is evaluated once before the wrapped service runs. A denial
//! answers 401 (configurable, e.g. 403); a failed or inconclusive evaluation
//! answers 500. In both cases the wrapped service is not called.
//!
//! The default policy path is `root.METHOD.path`, using the route template for
//! parameterized routes: `POST /products/42` registered as `/products/{id}`
//! evaluates `root.POST.products.__id`.

use crate::config::Policy;
use crate::error::Result as AuthzResult;
use crate::evaluator::Evaluator;
use crate::identity::{IdentityBuilder, AUTHORIZATION_HEADER};
use crate::pipeline::AuthzPipeline;
use crate::policy::{param_name, route_policy_path, static_path, template_segments, url_policy_path};
use crate::request::StringMapper;
use crate::resource::{from_params, no_resource};
use actix_web::{
    dev::{forward_ready, Path, ResourceDef, Service, ServiceRequest, ServiceResponse, Transform},
    error::InternalError,
    http::StatusCode,
    Error,
};
use authz_client::{Authorizer, ResourceContext};
use futures::future::{ready, Ready};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use tracing::warn;

/// Authorization middleware for actix-web
pub struct AuthzMiddleware {
    pipeline: AuthzPipeline<ServiceRequest>,
    deny_status: StatusCode,
}

impl AuthzMiddleware {
    /// Fails when the policy name or decision is missing.
    ///
    /// The caller identity defaults to the bearer token in `Authorization`.
    pub fn new<A: Authorizer + 'static>(authorizer: A, policy: Policy) -> AuthzResult<Self> {
        Self::with_evaluator(Evaluator::new(authorizer), policy)
    }

    pub fn with_evaluator(evaluator: Evaluator, policy: Policy) -> AuthzResult<Self> {
        policy.validate()?;

        let mapper = match &policy.path {
            Some(path) => static_path(path.clone()),
            None => url_policy_mapper(policy.root()),
        };

        let mut pipeline = AuthzPipeline::new(evaluator, policy.reference(), mapper);
        pipeline.set_identity(IdentityBuilder::new().token().from_header([AUTHORIZATION_HEADER]));

        Ok(Self {
            pipeline,
            deny_status: StatusCode::UNAUTHORIZED,
        })
    }

    pub fn with_identity(mut self, identity: IdentityBuilder<ServiceRequest>) -> Self {
        self.pipeline.set_identity(identity);
        self
    }

    /// Use `path` for every request
    pub fn with_policy_path(mut self, path: impl Into<String>) -> Self {
        self.pipeline.set_policy_path(path);
        self
    }

    pub fn with_policy_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&ServiceRequest) -> String + Send + Sync + 'static,
    {
        self.pipeline.set_policy_mapper(mapper);
        self
    }

    pub fn with_resource_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&ServiceRequest) -> ResourceContext + Send + Sync + 'static,
    {
        self.pipeline.set_resource_mapper(mapper);
        self
    }

    /// Send every route parameter as a string field of the resource
    pub fn with_resource_from_params(self) -> Self {
        self.with_resource_mapper(params_resource)
    }

    /// Status answered when the policy denies a request
    pub fn with_deny_status(mut self, status: StatusCode) -> Self {
        self.deny_status = status;
        self
    }

    pub fn pipeline(&self) -> &AuthzPipeline<ServiceRequest> {
        &self.pipeline
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthzMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthzMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthzMiddlewareService {
            service: Rc::new(service),
            pipeline: Rc::new(self.pipeline.clone()),
            deny_status: self.deny_status,
        }))
    }
}

pub struct AuthzMiddlewareService<S> {
    service: Rc<S>,
    pipeline: Rc<AuthzPipeline<ServiceRequest>>,
    deny_status: StatusCode,
}

impl<S, B> Service<ServiceRequest> for AuthzMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let pipeline = self.pipeline.clone();
        let deny_status = self.deny_status;

        Box::pin(async move {
            if let Err(err) = pipeline.authorize(&req).await {
                let response = err.http_response(deny_status);
                return Err(InternalError::from_response(err, response).into());
            }

            service.call(req).await
        })
    }
}

fn url_policy_mapper(root: &str) -> StringMapper<ServiceRequest> {
    let root = root.to_string();
    Arc::new(move |req: &ServiceRequest| url_policy_path_for(&root, req))
}

/// Policy path of `req`, empty when its route template cannot be found
fn url_policy_path_for(root: &str, req: &ServiceRequest) -> String {
    let method = req.method().as_str();

    match req.match_pattern() {
        Some(template) if has_params(&template) => route_policy_path(root, method, &template),
        Some(_) => url_policy_path(root, method, req.path()),
        None if req.match_info().iter().next().is_some() => {
            warn!(path = %req.path(), "Route template unavailable for parameterized request");
            String::new()
        }
        None => url_policy_path(root, method, req.path()),
    }
}

fn has_params(template: &str) -> bool {
    template_segments(template).into_iter().any(|s| param_name(s).is_some())
}

/// Route parameters of `req`, matched against its template when routing has
/// not populated them yet (middleware registered on the whole app)
fn params_resource(req: &ServiceRequest) -> ResourceContext {
    let params: Vec<(&str, &str)> = req.match_info().iter().collect();
    if !params.is_empty() {
        return from_params(params);
    }

    let Some(template) = req.match_pattern() else {
        return no_resource();
    };

    let mut path = Path::new(req.path());
    if !ResourceDef::new(template.as_str()).capture_match_info(&mut path) {
        warn!(path = %req.path(), template = %template, "Request path does not match its route template");
        return no_resource();
    }

    from_params(path.iter())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_literal_path_without_route() {
        let req = TestRequest::get().uri("/api/users/").to_srv_request();
        assert_eq!(url_policy_path_for("peoplefinder", &req), "peoplefinder.GET.api.users");
    }

    #[test]
    fn test_params_without_template_is_empty() {
        let mut req = TestRequest::post().uri("/products/42").to_srv_request();
        req.match_info_mut().add_static("id", "42");

        assert_eq!(url_policy_path_for("myapp", &req), "");
    }

    #[test]
    fn test_params_resource_from_match_info() {
        let mut req = TestRequest::get().uri("/boards/general").to_srv_request();
        req.match_info_mut().add_static("board", "general");

        let resource = params_resource(&req);
        assert_eq!(resource["board"], "general");
    }

    #[test]
    fn test_params_resource_without_route() {
        let req = TestRequest::get().uri("/boards").to_srv_request();
        assert!(params_resource(&req).is_empty());
    }

    #[test]
    fn test_has_params() {
        assert!(has_params("/products/{id}"));
        assert!(!has_params("/products"));
    }
}
