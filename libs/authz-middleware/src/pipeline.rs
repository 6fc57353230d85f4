//! Request-to-decision pipeline shared by the RPC and HTTP adapters

use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::identity::IdentityBuilder;
use crate::policy::static_path;
use crate::query::QueryBuilder;
use crate::request::{StringMapper, StructMapper};
use crate::resource::no_resource;
use authz_client::{DecisionQuery, PolicyReference, ResourceContext};
use std::sync::Arc;
use tracing::{debug, error};

/// Identity, policy path and resource strategies plus the evaluator.
///
/// Built once during setup and read concurrently afterwards.
pub struct AuthzPipeline<R> {
    policy: PolicyReference,
    identity: IdentityBuilder<R>,
    policy_mapper: StringMapper<R>,
    resource_mapper: StructMapper<R>,
    evaluator: Evaluator,
}

impl<R> Clone for AuthzPipeline<R> {
    fn clone(&self) -> Self {
        Self {
            policy: self.policy.clone(),
            identity: self.identity.clone(),
            policy_mapper: self.policy_mapper.clone(),
            resource_mapper: self.resource_mapper.clone(),
            evaluator: self.evaluator.clone(),
        }
    }
}

impl<R: 'static> AuthzPipeline<R> {
    pub fn new(evaluator: Evaluator, policy: PolicyReference, policy_mapper: StringMapper<R>) -> Self {
        Self {
            policy,
            identity: IdentityBuilder::new(),
            policy_mapper,
            resource_mapper: Arc::new(|_: &R| no_resource()),
            evaluator,
        }
    }

    pub fn set_identity(&mut self, identity: IdentityBuilder<R>) {
        self.identity = identity;
    }

    pub fn set_policy_path(&mut self, path: impl Into<String>) {
        self.policy_mapper = static_path(path);
    }

    pub fn set_policy_mapper<F>(&mut self, mapper: F)
    where
        F: Fn(&R) -> String + Send + Sync + 'static,
    {
        self.policy_mapper = Arc::new(mapper);
    }

    pub fn set_resource_mapper<F>(&mut self, mapper: F)
    where
        F: Fn(&R) -> ResourceContext + Send + Sync + 'static,
    {
        self.resource_mapper = Arc::new(mapper);
    }

    pub fn identity(&self) -> &IdentityBuilder<R> {
        &self.identity
    }

    pub fn policy(&self) -> &PolicyReference {
        &self.policy
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Resolve and validate the query for one request
    pub fn query(&self, request: &R) -> Result<DecisionQuery> {
        let query = QueryBuilder::new(self.policy.clone())
            .identity(self.identity.build(request))
            .policy_path((self.policy_mapper)(request))
            .resource((self.resource_mapper)(request))
            .build()
            .map_err(|e| {
                error!(error = %e, "Invalid authorization query");
                e
            })?;

        debug!(
            policy = %query.policy.name,
            policy_path = %query.policy.path,
            identity_kind = query.identity.kind.as_str(),
            resource_fields = query.resource.len(),
            "Authorization query resolved"
        );

        Ok(query)
    }

    /// Resolve the query and evaluate it
    pub async fn authorize(&self, request: &R) -> Result<()> {
        let query = self.query(request)?;
        self.evaluator.authorize(&query).await
    }
}
