//! JSON-over-HTTPS authorizer client

use crate::authorizer::Authorizer;
use crate::config::AuthorizerConfig;
use crate::connection::Connection;
use crate::error::{ClientError, Result};
use crate::model::{Decision, DecisionQuery, DecisionTree, Identity, PathSeparator, ResourceContext};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const IS_ENDPOINT: &str = "api/v2/authz/is";
const DECISION_TREE_ENDPOINT: &str = "api/v2/authz/decisiontree";

/// Authorizer reached through its REST API
#[derive(Clone)]
pub struct RestAuthorizer {
    client: reqwest::Client,
    base_url: String,
    connection: Connection,
}

impl RestAuthorizer {
    pub fn new(config: AuthorizerConfig) -> Result<Self> {
        let client = config.http_client()?;
        Ok(Self::with_client(client, config.url.clone(), config.connection()))
    }

    /// Use an existing reqwest client, e.g. one shared with the rest of the service
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>, connection: Connection) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            connection,
        }
    }

    async fn post(&self, endpoint: &str, body: &WireRequest<'_>) -> Result<String> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let mut request = self.client.post(&url).json(body);
        for (key, value) in self.connection.headers() {
            request = request.header(key, value);
        }

        debug!(url = %url, "Calling authorizer");

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(url = %url, status = status.as_u16(), "Authorizer returned an error response");
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl Authorizer for RestAuthorizer {
    async fn evaluate(&self, query: &DecisionQuery) -> Result<Vec<Decision>> {
        let body = self.post(IS_ENDPOINT, &WireRequest::new(query, None)).await?;

        let response: IsResponse =
            serde_json::from_str(&body).map_err(|e| ClientError::UnexpectedSchema(e.to_string()))?;

        Ok(response.decisions)
    }

    async fn evaluate_tree(&self, query: &DecisionQuery, separator: PathSeparator) -> Result<DecisionTree> {
        let options = WireOptions {
            path_separator: separator,
        };
        let body = self
            .post(DECISION_TREE_ENDPOINT, &WireRequest::new(query, Some(options)))
            .await?;

        serde_json::from_str(&body).map_err(|e| ClientError::UnexpectedSchema(e.to_string()))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest<'a> {
    identity_context: &'a Identity,
    policy_context: WirePolicyContext<'a>,
    policy_instance: WirePolicyInstance<'a>,
    resource_context: &'a ResourceContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<WireOptions>,
}

impl<'a> WireRequest<'a> {
    fn new(query: &'a DecisionQuery, options: Option<WireOptions>) -> Self {
        Self {
            identity_context: &query.identity,
            policy_context: WirePolicyContext {
                path: &query.policy.path,
                decisions: &query.policy.decisions,
            },
            policy_instance: WirePolicyInstance {
                name: &query.policy.name,
                instance_label: query.policy.instance_label.as_deref().unwrap_or_default(),
            },
            resource_context: &query.resource,
            options,
        }
    }
}

#[derive(Serialize)]
struct WirePolicyContext<'a> {
    path: &'a str,
    decisions: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WirePolicyInstance<'a> {
    name: &'a str,
    instance_label: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireOptions {
    path_separator: PathSeparator,
}

#[derive(Deserialize)]
struct IsResponse {
    decisions: Vec<Decision>,
}
