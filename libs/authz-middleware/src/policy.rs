//! Policy path inference
//!
//! Rule paths are dot-separated. RPC calls map `/pkg.Service/Method` to
//! `pkg.Service.Method`. HTTP requests map to `METHOD.segment.segment`, using
//! the route template when the route has parameters so that every request
//! matching `/products/{id}` lands on the same rule, `POST.products.__id`.
//! An optional root is prepended in both cases.

use crate::request::StringMapper;
use std::sync::Arc;

/// Prefix of rule segments derived from route parameters
pub const PARAM_PREFIX: &str = "__";

/// URL or RPC method path as a dotted rule path
pub fn to_policy_path(path: &str) -> String {
    path.trim_matches('/').replace('/', ".")
}

/// Join non-empty parts with dots
pub fn join_path<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

/// Rule path of an RPC method
pub fn method_policy_path(root: &str, method: &str) -> String {
    join_path([root, to_policy_path(method).as_str()])
}

/// Rule path of an HTTP request routed through `template`
pub fn route_policy_path(root: &str, method: &str, template: &str) -> String {
    join_path([root, method, template_policy_path(template).as_str()])
}

/// Rule path of an HTTP request without route parameters
pub fn url_policy_path(root: &str, method: &str, path: &str) -> String {
    join_path([root, method, to_policy_path(path).as_str()])
}

/// Route template as a dotted rule path, `{name}` becoming `__name`
pub fn template_policy_path(template: &str) -> String {
    template_segments(template)
        .into_iter()
        .map(|segment| match param_name(segment) {
            Some(name) => format!("{}{}", PARAM_PREFIX, name),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Split a route template on `/`, ignoring slashes inside `{...}`.
///
/// `/files/{path:[a-z/]+}/raw` has three segments.
pub(crate) fn template_segments(template: &str) -> Vec<&str> {
    let template = template.trim_matches('/');
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in template.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => {
                segments.push(&template[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if start < template.len() {
        segments.push(&template[start..]);
    }

    segments.retain(|s| !s.is_empty());
    segments
}

/// Parameter name of a whole-segment placeholder, `{id}` or `{id:\d+}`.
///
/// Segments mixing several placeholders or literal text (`{name}.{ext}`) are
/// not whole-segment placeholders.
pub(crate) fn param_name(segment: &str) -> Option<&str> {
    if !closes_at_end(segment) {
        return None;
    }

    let inner = segment.strip_prefix('{')?.strip_suffix('}')?;
    let name = inner.split(':').next().unwrap_or_default().trim();
    (!name.is_empty()).then_some(name)
}

/// True when the brace opened by the first character closes at the last one
fn closes_at_end(segment: &str) -> bool {
    let mut depth = 0usize;

    for (i, c) in segment.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i + 1 == segment.len();
                }
            }
            _ if depth == 0 => return false,
            _ => {}
        }
    }

    false
}

/// Mapper that ignores the request and always returns `path`
pub fn static_path<R: 'static>(path: impl Into<String>) -> StringMapper<R> {
    let path = path.into();
    Arc::new(move |_: &R| path.clone())
}
