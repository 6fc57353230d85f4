//! Decision query assembly and validation

use crate::error::{AuthzError, Result};
use authz_client::{DecisionQuery, Identity, IdentityKind, PolicyReference, ResourceContext};

/// Assembles a [`DecisionQuery`] from its three parts
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    identity: Identity,
    policy: PolicyReference,
    resource: ResourceContext,
}

impl QueryBuilder {
    /// Start from the static policy defaults
    pub fn new(policy: PolicyReference) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    pub fn policy_path(mut self, path: impl Into<String>) -> Self {
        self.policy.path = path.into();
        self
    }

    pub fn resource(mut self, resource: ResourceContext) -> Self {
        self.resource = resource;
        self
    }

    /// Validate and return the query
    pub fn build(self) -> Result<DecisionQuery> {
        let query = DecisionQuery {
            identity: self.identity,
            policy: self.policy,
            resource: self.resource,
        };

        validate(&query)?;
        Ok(query)
    }
}

/// Check every mandatory field, reporting all that are missing
pub fn validate(query: &DecisionQuery) -> Result<()> {
    let mut missing = Vec::new();

    if query.policy.name.is_empty() {
        missing.push("PolicyName");
    }
    if query.policy.path.is_empty() {
        missing.push("PolicyPath");
    }
    if query.policy.decisions.is_empty() || query.policy.decisions.iter().any(String::is_empty) {
        missing.push("Decision");
    }
    if query.identity.kind != IdentityKind::None && query.identity.value.is_empty() {
        missing.push("Identity");
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AuthzError::MissingOptions(missing))
    }
}
