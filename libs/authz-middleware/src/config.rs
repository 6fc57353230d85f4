/// Policy configuration
///
/// Names the policy instance, the decision to act on, and either a fixed rule
/// path or the root under which rule paths are inferred from requests.
use crate::error::{AuthzError, Result};
use authz_client::PolicyReference;
use serde::{Deserialize, Serialize};
use std::env;

pub const DEFAULT_DECISION: &str = "allowed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Policy instance name
    pub name: String,

    /// Fixed rule path used for every request
    #[serde(default)]
    pub path: Option<String>,

    /// Prefix of inferred rule paths
    #[serde(default)]
    pub root: Option<String>,

    /// Decision the middleware acts on
    #[serde(default = "default_decision")]
    pub decision: String,

    #[serde(default)]
    pub instance_label: Option<String>,
}

fn default_decision() -> String {
    DEFAULT_DECISION.to_string()
}

impl Policy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            root: None,
            decision: default_decision(),
            instance_label: None,
        }
    }

    pub fn with_decision(mut self, decision: impl Into<String>) -> Self {
        self.decision = decision.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_instance_label(mut self, label: impl Into<String>) -> Self {
        self.instance_label = Some(label.into());
        self
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let name = env::var("AUTHZ_POLICY_NAME").unwrap_or_default();
        if name.is_empty() {
            return Err(AuthzError::MissingOptions(vec!["PolicyName"]));
        }

        Ok(Self {
            name,
            path: non_empty_var("AUTHZ_POLICY_PATH"),
            root: non_empty_var("AUTHZ_POLICY_ROOT"),
            decision: non_empty_var("AUTHZ_DECISION").unwrap_or_else(default_decision),
            instance_label: non_empty_var("AUTHZ_INSTANCE_LABEL"),
        })
    }

    /// Checks what can be checked before any request arrives
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();

        if self.name.is_empty() {
            missing.push("PolicyName");
        }
        if self.path.as_deref() == Some("") {
            missing.push("PolicyPath");
        }
        if self.decision.is_empty() {
            missing.push("Decision");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AuthzError::MissingOptions(missing))
        }
    }

    /// Root prefix for inferred paths, empty when unset
    pub fn root(&self) -> &str {
        self.root.as_deref().unwrap_or_default()
    }

    /// Static part of every query; the path is filled in per request
    pub fn reference(&self) -> PolicyReference {
        let mut reference = PolicyReference::new(&self.name, &self.decision);
        if let Some(label) = &self.instance_label {
            reference = reference.with_instance_label(label);
        }
        reference
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}
