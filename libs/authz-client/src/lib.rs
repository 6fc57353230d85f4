//! Decision transport for the authorization middleware
//!
//! This crate is the thin client side of an external policy-decision service.
//! It does not evaluate policies; it ships a [`DecisionQuery`] to the
//! authorizer and hands back whatever decisions come out.
//!
//! ## Core Components
//!
//! - **Model**: `Identity`, `PolicyReference`, `ResourceContext`, `DecisionQuery`,
//!   `Decision` and `DecisionTree`, serialized the way the authorizer expects them
//! - **Authorizer**: the transport trait (`evaluate`, `evaluate_tree`)
//! - **RestAuthorizer**: JSON-over-HTTPS implementation of `Authorizer`
//! - **Connection**: tenant id and credentials attached to every outgoing call,
//!   usable as a tonic client interceptor
//! - **AuthorizerConfig**: environment driven settings
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use authz_client::{Authorizer, AuthorizerConfig, DecisionQuery, Identity, PolicyReference, RestAuthorizer};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let authorizer = RestAuthorizer::new(AuthorizerConfig::from_env())?;
//!
//! let query = DecisionQuery {
//!     identity: Identity::subject("jeffh@acmecorp.com"),
//!     policy: PolicyReference::new("messageboards", "allowed").with_path("messageboards.GET.boards"),
//!     resource: Default::default(),
//! };
//!
//! let decisions = authorizer.evaluate(&query).await?;
//! # Ok(())
//! # }
//! ```

mod authorizer;
mod config;
mod connection;
mod error;
mod model;
mod rest;

pub use authorizer::Authorizer;
pub use config::AuthorizerConfig;
pub use connection::{Connection, ConnectionInterceptor, Credentials, TENANT_ID_KEY};
pub use error::ClientError;
pub use model::{
    Decision, DecisionQuery, DecisionTree, Identity, IdentityKind, PathSeparator, PolicyReference,
    ResourceContext,
};
pub use rest::RestAuthorizer;
