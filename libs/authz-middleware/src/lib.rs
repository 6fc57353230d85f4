//! Authorization middleware for actix-web and tonic services
//!
//! Every inbound request is turned into a decision query (who is calling,
//! which policy rule governs the request, what it acts upon) and sent to an
//! external authorizer. The request proceeds only when the authorizer allows
//! it.
//!
//! ## Core Components
//!
//! - **IdentityBuilder**: caller identity from a header, a request extension,
//!   the host name, or a custom function
//! - **Policy path inference**: rule paths from RPC method names or HTTP route
//!   templates (`POST /products/{id}` evaluates `POST.products.__id`)
//! - **Resource extraction**: route parameters, selected message fields, or a
//!   custom function
//! - **QueryBuilder**: assembles and validates the query, reporting every
//!   missing option at once
//! - **Evaluator**: one round trip to the authorizer; tells a denial apart from
//!   an inconclusive answer
//! - **Adapters**: [`http::AuthzMiddleware`] for actix-web,
//!   [`grpc::ServerInterceptor`] and [`grpc::AuthzLayer`] for tonic
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use actix_web::{web, App, HttpServer};
//! use authz_client::{AuthorizerConfig, RestAuthorizer};
//! use authz_middleware::{http::AuthzMiddleware, Policy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let authorizer = RestAuthorizer::new(AuthorizerConfig::from_env())?;
//! let policy = Policy::from_env()?;
//!
//! HttpServer::new(move || {
//!     let authz = AuthzMiddleware::new(authorizer.clone(), policy.clone())
//!         .expect("valid policy configuration")
//!         .with_resource_from_params();
//!
//!     App::new()
//!         .wrap(authz)
//!         .route("/boards", web::get().to(|| async { "[]" }))
//! })
//! .bind(("127.0.0.1", 8080))?
//! .run()
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod evaluator;
pub mod grpc;
pub mod http;
pub mod identity;
pub mod pipeline;
pub mod policy;
pub mod query;
pub mod request;
pub mod resource;

pub use config::Policy;
pub use error::{AuthzError, Result};
pub use evaluator::Evaluator;
pub use identity::IdentityBuilder;
pub use pipeline::AuthzPipeline;
pub use query::{validate, QueryBuilder};
pub use request::{IdentityMapper, InboundRequest, StringMapper, StructMapper};
