//! Resource context extraction
//!
//! Built-in strategies: no resource, route parameters as a flat map, and a
//! projection of selected fields out of the request message.

use crate::error::{AuthzError, Result};
use authz_client::ResourceContext;
use serde_json::Value;

/// Empty resource
pub fn no_resource() -> ResourceContext {
    ResourceContext::new()
}

/// Route parameters as string fields
pub fn from_params<'a, I>(params: I) -> ResourceContext
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    params
        .into_iter()
        .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
        .collect()
}

/// Project `fields` out of `message`.
///
/// Fields are dotted paths. Nesting is preserved: selecting `a.b` and `a.c`
/// yields `{"a": {"b": .., "c": ..}}`. Selecting an object includes all of its
/// fields. Missing and null fields are skipped; descending into a scalar is
/// an error.
pub fn select<S: AsRef<str>>(message: &Value, fields: &[S]) -> Result<ResourceContext> {
    let mut selection = ResourceContext::new();

    for field in fields {
        let field = field.as_ref();
        if let Some(value) = lookup(message, field)? {
            insert_path(&mut selection, field, value.clone());
        }
    }

    Ok(selection)
}

fn lookup<'v>(message: &'v Value, field: &str) -> Result<Option<&'v Value>> {
    let mut current = message;

    for name in field.split('.') {
        if name.is_empty() {
            return Err(AuthzError::InvalidFieldPath(field.to_string()));
        }

        current = match current {
            Value::Object(map) => match map.get(name) {
                Some(Value::Null) | None => return Ok(None),
                Some(value) => value,
            },
            _ => return Err(AuthzError::InvalidFieldPath(field.to_string())),
        };
    }

    Ok(Some(current))
}

fn insert_path(target: &mut ResourceContext, field: &str, value: Value) {
    match field.split_once('.') {
        None => merge(target, field, value),
        Some((head, tail)) => {
            let child = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(ResourceContext::new()));

            if !child.is_object() {
                *child = Value::Object(ResourceContext::new());
            }
            if let Value::Object(map) = child {
                insert_path(map, tail, value);
            }
        }
    }
}

/// Insert `value` under `key`, merging objects selected by overlapping paths
fn merge(target: &mut ResourceContext, key: &str, value: Value) {
    match value {
        Value::Object(incoming) => {
            if let Some(Value::Object(existing)) = target.get_mut(key) {
                for (k, v) in incoming {
                    merge(existing, &k, v);
                }
                return;
            }
            target.insert(key.to_string(), Value::Object(incoming));
        }
        value => {
            target.insert(key.to_string(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message() -> Value {
        json!({
            "policy_context": {
                "name": "policyName",
                "path": "policy.path",
                "instance_label": "label",
            },
            "identity_context": {
                "type": "IDENTITY_TYPE_SUB",
                "identity": "username",
            },
            "resource_context": null,
        })
    }

    #[test]
    fn test_select_single_value() {
        let selection = select(&message(), &["policy_context.path"]).unwrap();
        assert_eq!(Value::Object(selection), json!({"policy_context": {"path": "policy.path"}}));
    }

    #[test]
    fn test_select_preserves_nesting() {
        let selection = select(&message(), &["policy_context.path", "identity_context.identity"]).unwrap();
        assert_eq!(
            Value::Object(selection),
            json!({
                "policy_context": {"path": "policy.path"},
                "identity_context": {"identity": "username"},
            })
        );
    }

    #[test]
    fn test_select_siblings_share_parent() {
        let selection = select(&message(), &["policy_context.path", "policy_context.name"]).unwrap();
        assert_eq!(
            Value::Object(selection),
            json!({"policy_context": {"path": "policy.path", "name": "policyName"}})
        );
    }

    #[test]
    fn test_select_whole_object() {
        let selection = select(&message(), &["policy_context"]).unwrap();
        assert_eq!(
            Value::Object(selection),
            json!({
                "policy_context": {
                    "name": "policyName",
                    "path": "policy.path",
                    "instance_label": "label",
                }
            })
        );
    }

    #[test]
    fn test_select_object_then_leaf_merges() {
        let selection = select(&message(), &["policy_context", "policy_context.path"]).unwrap();
        assert_eq!(selection["policy_context"]["name"], json!("policyName"));
        assert_eq!(selection["policy_context"]["path"], json!("policy.path"));
    }

    #[test]
    fn test_select_skips_missing_and_null() {
        let selection = select(&message(), &["resource_context", "policy_context.missing", "nope.deeper"]).unwrap();
        assert!(selection.is_empty());
    }

    #[test]
    fn test_select_into_scalar_is_error() {
        let result = select(&message(), &["policy_context.path.deeper"]);
        assert!(matches!(result, Err(AuthzError::InvalidFieldPath(f)) if f == "policy_context.path.deeper"));

        let result = select(&message(), &["policy_context..path"]);
        assert!(matches!(result, Err(AuthzError::InvalidFieldPath(_))));
    }

    #[test]
    fn test_from_params() {
        let resource = from_params([("id", "42"), ("board", "general")]);
        assert_eq!(Value::Object(resource), json!({"id": "42", "board": "general"}));
    }

    #[test]
    fn test_no_resource() {
        assert!(no_resource().is_empty());
    }
}
