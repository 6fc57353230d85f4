//! Caller identity resolution
//!
//! An [`IdentityBuilder`] holds the static part of the identity (its kind and
//! an optional fixed value) plus at most one extraction strategy. The kind and
//! the value are independent: `subject().from_header(..)` and
//! `from_header(..).subject()` resolve the same way. An empty value always
//! resolves to an anonymous caller.

use crate::request::{IdentityMapper, InboundRequest};
use authz_client::{Identity, IdentityKind};
use jsonwebtoken::{DecodingKey, Validation};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

pub const AUTHORIZATION_HEADER: &str = "authorization";

const BEARER_SCHEME: &str = "bearer";

pub struct IdentityBuilder<R> {
    identity: Identity,
    mapper: Option<IdentityMapper<R>>,
}

impl<R> Clone for IdentityBuilder<R> {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            mapper: self.mapper.clone(),
        }
    }
}

impl<R> Default for IdentityBuilder<R> {
    fn default() -> Self {
        Self {
            identity: Identity::anonymous(),
            mapper: None,
        }
    }
}

impl<R> fmt::Debug for IdentityBuilder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityBuilder")
            .field("kind", &self.identity.kind)
            .field("has_value", &!self.identity.value.is_empty())
            .field("has_mapper", &self.mapper.is_some())
            .finish()
    }
}

impl<R> IdentityBuilder<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The identity value is an encoded bearer token
    pub fn token(mut self) -> Self {
        self.identity.set_kind(IdentityKind::Token);
        self
    }

    /// The identity value is a subject name (email, user id, ...)
    pub fn subject(mut self) -> Self {
        self.identity.set_kind(IdentityKind::Subject);
        self
    }

    /// Every request is anonymous.
    ///
    /// Clears the kind, any fixed value and any extraction strategy set before.
    pub fn none(mut self) -> Self {
        self.identity.clear();
        self.mapper = None;
        self
    }

    /// Fixed identity value. An empty string means anonymous.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.identity.set_value(id);
        self
    }

    /// Custom extraction, replacing any strategy set before
    pub fn mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&R, &mut Identity) + Send + Sync + 'static,
    {
        self.mapper = Some(Arc::new(mapper));
        self
    }

    pub fn kind(&self) -> IdentityKind {
        self.identity.kind
    }

    /// Resolve the identity of one request
    pub fn build(&self, request: &R) -> Identity {
        let mut identity = self.identity.clone();

        if let Some(mapper) = &self.mapper {
            mapper(request, &mut identity);
        }

        identity.normalized()
    }
}

impl<R: InboundRequest + 'static> IdentityBuilder<R> {
    /// Read the identity from the first non-empty header in `headers`.
    ///
    /// The `Authorization` header has its `Bearer` scheme removed. When the
    /// kind is subject, the `sub` claim of the token is used instead of the
    /// token itself.
    pub fn from_header<I, S>(self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let headers: Vec<String> = headers.into_iter().map(Into::into).collect();

        self.mapper(move |request: &R, identity: &mut Identity| {
            for name in &headers {
                let value = match request.header(name) {
                    Some(value) if !value.is_empty() => value,
                    _ => continue,
                };

                let value = if name.eq_ignore_ascii_case(AUTHORIZATION_HEADER) {
                    from_authorization_header(value, identity.kind)
                } else {
                    value.to_string()
                };

                identity.set_value(value);
                return;
            }

            identity.clear();
        })
    }

    /// Read the identity from a value attached to the request by an earlier
    /// layer, e.g. an authentication middleware. Missing means anonymous.
    pub fn from_context_value<T>(self) -> Self
    where
        T: AsRef<str> + Clone + Send + Sync + 'static,
    {
        self.mapper(|request: &R, identity: &mut Identity| {
            let value = request
                .extension::<T>()
                .map(|v| v.as_ref().to_string())
                .unwrap_or_default();
            identity.set_value(value);
        })
    }

    /// Read the identity from one dot-separated segment of the host name.
    ///
    /// Indexing is zero-based from the left; negative indices count from the
    /// right. For `service.user.company.com` both `1` and `-3` select `user`.
    pub fn from_hostname(self, segment: isize) -> Self {
        self.mapper(move |request: &R, identity: &mut Identity| {
            let hostname = request.hostname().unwrap_or_default();
            identity.set_value(hostname_segment(&hostname, segment));
        })
    }
}

/// Segment `level` of `hostname`, or an empty string when out of range
pub fn hostname_segment(hostname: &str, level: isize) -> &str {
    if hostname.is_empty() {
        return "";
    }

    let parts: Vec<&str> = hostname.split('.').collect();
    let index = if level < 0 {
        level + parts.len() as isize
    } else {
        level
    };

    usize::try_from(index)
        .ok()
        .and_then(|i| parts.get(i).copied())
        .unwrap_or_default()
}

/// Strip the bearer scheme and, for subject identities, swap the token for its subject
fn from_authorization_header(value: &str, kind: IdentityKind) -> String {
    let token = strip_bearer(value);

    match kind {
        IdentityKind::Subject => match token_subject(token) {
            Some(subject) => subject,
            None => {
                warn!("Could not read subject from bearer token, using raw value");
                token.to_string()
            }
        },
        IdentityKind::Token => {
            if let Some(subject) = token_subject(token) {
                debug!(subject = %subject, "Bearer token identity");
            }
            token.to_string()
        }
        IdentityKind::None => token.to_string(),
    }
}

fn strip_bearer(value: &str) -> &str {
    let value = value.trim();
    match value.get(..BEARER_SCHEME.len()) {
        Some(scheme) if scheme.eq_ignore_ascii_case(BEARER_SCHEME) => value[BEARER_SCHEME.len()..].trim(),
        _ => value,
    }
}

#[derive(Deserialize)]
struct SubjectClaim {
    sub: Option<String>,
}

/// `sub` claim of a compact JWT.
///
/// The signature is not checked: the authorizer decodes and verifies tokens
/// itself, this value only names the caller.
fn token_subject(token: &str) -> Option<String> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<SubjectClaim>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .and_then(|data| data.claims.sub)
        .filter(|sub| !sub.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header};
    use serde_json::json;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeRequest {
        headers: HashMap<String, String>,
        host: Option<String>,
        extensions: http::Extensions,
    }

    impl FakeRequest {
        fn with_header(mut self, name: &str, value: &str) -> Self {
            self.headers.insert(name.to_ascii_lowercase(), value.to_string());
            self
        }
    }

    impl InboundRequest for FakeRequest {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
        }

        fn hostname(&self) -> Option<String> {
            self.host.clone()
        }

        fn extension<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
            self.extensions.get::<T>().cloned()
        }
    }

    fn jwt(sub: &str) -> String {
        jsonwebtoken::encode(
            &Header::default(),
            &json!({"sub": sub, "exp": 1}),
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_no_strategy_is_anonymous() {
        let identity = IdentityBuilder::<FakeRequest>::new().build(&FakeRequest::default());
        assert_eq!(identity, Identity::anonymous());
    }

    #[test]
    fn test_kind_without_value_is_anonymous() {
        let identity = IdentityBuilder::<FakeRequest>::new()
            .token()
            .build(&FakeRequest::default());
        assert_eq!(identity.kind, IdentityKind::None);
    }

    #[test]
    fn test_assignment_order() {
        let request = FakeRequest::default();
        let a = IdentityBuilder::<FakeRequest>::new().id("id").subject().build(&request);
        let b = IdentityBuilder::<FakeRequest>::new().subject().id("id").build(&request);

        assert_eq!(a, b);
        assert_eq!(a, Identity::subject("id"));
    }

    #[test]
    fn test_empty_id_overrides_declared_kind() {
        let request = FakeRequest::default();
        let a = IdentityBuilder::<FakeRequest>::new().subject().id("").build(&request);
        let b = IdentityBuilder::<FakeRequest>::new().id("").token().build(&request);

        assert_eq!(a, Identity::anonymous());
        assert_eq!(b, Identity::anonymous());
    }

    #[test]
    fn test_none_overrides_previous_assignments() {
        let request = FakeRequest::default().with_header("x-user", "alice");

        let identity = IdentityBuilder::<FakeRequest>::new()
            .token()
            .id("id")
            .from_header(["x-user"])
            .none()
            .build(&request);

        assert_eq!(identity, Identity::anonymous());
    }

    #[test]
    fn test_from_header_first_non_empty_wins() {
        let request = FakeRequest::default()
            .with_header("x-first", "")
            .with_header("x-second", "bob")
            .with_header("x-third", "carol");

        let identity = IdentityBuilder::<FakeRequest>::new()
            .subject()
            .from_header(["x-first", "x-second", "x-third"])
            .build(&request);

        assert_eq!(identity, Identity::subject("bob"));
    }

    #[test]
    fn test_from_header_missing_is_anonymous() {
        let identity = IdentityBuilder::<FakeRequest>::new()
            .subject()
            .from_header(["x-user"])
            .build(&FakeRequest::default());

        assert_eq!(identity, Identity::anonymous());
    }

    #[test]
    fn test_authorization_header_strips_bearer() {
        let token = jwt("alice@acmecorp.com");
        let request = FakeRequest::default().with_header("Authorization", &format!("Bearer {}", token));

        let identity = IdentityBuilder::<FakeRequest>::new()
            .token()
            .from_header(["Authorization"])
            .build(&request);

        assert_eq!(identity, Identity::token(token));
    }

    #[test]
    fn test_authorization_header_subject_uses_sub_claim() {
        let request =
            FakeRequest::default().with_header("authorization", &format!("bearer {}", jwt("alice@acmecorp.com")));

        let identity = IdentityBuilder::<FakeRequest>::new()
            .from_header(["Authorization"])
            .subject()
            .build(&request);

        assert_eq!(identity, Identity::subject("alice@acmecorp.com"));
    }

    #[test]
    fn test_authorization_header_subject_falls_back_to_raw_value() {
        let request = FakeRequest::default().with_header("authorization", "Bearer not-a-jwt");

        let identity = IdentityBuilder::<FakeRequest>::new()
            .subject()
            .from_header(["authorization"])
            .build(&request);

        assert_eq!(identity, Identity::subject("not-a-jwt"));
    }

    #[test]
    fn test_from_context_value() {
        let builder = IdentityBuilder::<FakeRequest>::new()
            .subject()
            .from_context_value::<String>();

        let mut request = FakeRequest::default();
        request.extensions.insert("dana".to_string());
        assert_eq!(builder.build(&request), Identity::subject("dana"));
        assert_eq!(builder.build(&FakeRequest::default()), Identity::anonymous());
    }

    #[test]
    fn test_from_hostname() {
        let builder = IdentityBuilder::<FakeRequest>::new().subject().from_hostname(-3);
        let request = FakeRequest {
            host: Some("service.user.company.com".into()),
            ..Default::default()
        };

        assert_eq!(builder.build(&request), Identity::subject("user"));
    }

    #[test]
    fn test_custom_mapper() {
        let identity = IdentityBuilder::<FakeRequest>::new()
            .mapper(|req: &FakeRequest, identity: &mut Identity| {
                if let Some(user) = req.header("x-user") {
                    identity.set_kind(IdentityKind::Subject).set_value(format!("{}@acme", user));
                }
            })
            .build(&FakeRequest::default().with_header("x-user", "erin"));

        assert_eq!(identity, Identity::subject("erin@acme"));
    }

    #[test]
    fn test_hostname_segment() {
        assert_eq!(hostname_segment("user.example.com", 0), "user");
        assert_eq!(hostname_segment("com.example.user", -1), "user");
        assert_eq!(hostname_segment("user.example.com", 5), "");
        assert_eq!(hostname_segment("user.example.com", -5), "");
        assert_eq!(hostname_segment("", 0), "");
    }

    #[test]
    fn test_strip_bearer() {
        assert_eq!(strip_bearer("Bearer abc"), "abc");
        assert_eq!(strip_bearer("BEARER   abc "), "abc");
        assert_eq!(strip_bearer("abc"), "abc");
        assert_eq!(strip_bearer("Bear"), "Bear");
    }

    #[test]
    fn test_token_subject() {
        assert_eq!(token_subject(&jwt("frank")).as_deref(), Some("frank"));
        assert_eq!(token_subject("garbage"), None);
    }
}
