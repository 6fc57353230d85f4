//! Authorization query and decision types
//!
//! These are the values exchanged with the authorizer. Serialized names follow
//! the authorizer's JSON API so the same types can be logged, stored in test
//! fixtures, or sent on the wire without translation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured, policy-specific data describing the object being acted upon.
///
/// Always an object on the wire. An empty map means "no resource".
pub type ResourceContext = Map<String, Value>;

/// How the authorizer should interpret an identity value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IdentityKind {
    /// Anonymous caller
    #[default]
    #[serde(rename = "IDENTITY_TYPE_NONE")]
    None,

    /// Opaque subject id (email, user name, ...)
    #[serde(rename = "IDENTITY_TYPE_SUB")]
    Subject,

    /// Encoded bearer token, decoded by the authorizer
    #[serde(rename = "IDENTITY_TYPE_JWT")]
    Token,
}

impl IdentityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityKind::None => "none",
            IdentityKind::Subject => "subject",
            IdentityKind::Token => "token",
        }
    }
}

/// Caller identity sent with a decision query
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "type")]
    pub kind: IdentityKind,

    #[serde(rename = "identity")]
    pub value: String,
}

impl Identity {
    pub fn new(kind: IdentityKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn subject(value: impl Into<String>) -> Self {
        Self::new(IdentityKind::Subject, value)
    }

    pub fn token(value: impl Into<String>) -> Self {
        Self::new(IdentityKind::Token, value)
    }

    /// Set the identity value, keeping the kind.
    pub fn set_value(&mut self, value: impl Into<String>) -> &mut Self {
        self.value = value.into();
        self
    }

    /// Set the identity kind, keeping the value.
    pub fn set_kind(&mut self, kind: IdentityKind) -> &mut Self {
        self.kind = kind;
        self
    }

    /// Make the identity anonymous, dropping any value.
    pub fn clear(&mut self) -> &mut Self {
        self.kind = IdentityKind::None;
        self.value.clear();
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.kind == IdentityKind::None
    }

    /// An empty value always means an anonymous caller, whatever kind was declared.
    pub fn normalized(mut self) -> Self {
        if self.value.is_empty() {
            self.kind = IdentityKind::None;
        }
        self
    }
}

/// Location of the rule to evaluate and the decisions requested from it
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyReference {
    /// Policy (instance) name
    pub name: String,

    /// Dotted rule path inside the policy bundle
    pub path: String,

    /// Requested decision names, typically exactly one
    pub decisions: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_label: Option<String>,
}

impl PolicyReference {
    pub fn new(name: impl Into<String>, decision: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: String::new(),
            decisions: vec![decision.into()],
            instance_label: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_instance_label(mut self, label: impl Into<String>) -> Self {
        self.instance_label = Some(label.into());
        self
    }

    /// The decision the middleware acts on
    pub fn decision(&self) -> Option<&str> {
        self.decisions.first().map(String::as_str)
    }
}

/// Identity + policy + resource, the unit sent to the authorizer
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DecisionQuery {
    pub identity: Identity,
    pub policy: PolicyReference,
    #[serde(default)]
    pub resource: ResourceContext,
}

/// A named boolean outcome returned by the authorizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    #[serde(rename = "decision")]
    pub name: String,

    #[serde(rename = "is")]
    pub allowed: bool,
}

impl Decision {
    pub fn new(name: impl Into<String>, allowed: bool) -> Self {
        Self {
            name: name.into(),
            allowed,
        }
    }
}

/// Every decision under a policy subtree
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DecisionTree {
    #[serde(rename = "path_root")]
    pub root: String,

    pub path: Map<String, Value>,
}

/// Separator used for the keys of a decision tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PathSeparator {
    #[default]
    #[serde(rename = "PATH_SEPARATOR_DOT")]
    Dot,

    #[serde(rename = "PATH_SEPARATOR_SLASH")]
    Slash,
}

impl PathSeparator {
    pub fn as_char(&self) -> char {
        match self {
            PathSeparator::Dot => '.',
            PathSeparator::Slash => '/',
        }
    }
}
