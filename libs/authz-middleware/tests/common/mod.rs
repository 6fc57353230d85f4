//! Shared test helpers

#![allow(dead_code)]

use async_trait::async_trait;
use authz_client::{Authorizer, ClientError, Decision, DecisionQuery, DecisionTree, PathSeparator};
use serde_json::{Map, Value};
use std::sync::Mutex;
use std::time::Duration;

pub const DEFAULT_DECISION: &str = "allowed";

/// Authorizer returning a fixed answer and recording every query it receives
pub struct MockAuthorizer {
    decisions: Vec<Decision>,
    fail: bool,
    delay: Option<Duration>,
    queries: Mutex<Vec<DecisionQuery>>,
}

impl MockAuthorizer {
    pub fn allow() -> Self {
        Self::with_decisions(vec![Decision::new(DEFAULT_DECISION, true)])
    }

    pub fn deny() -> Self {
        Self::with_decisions(vec![Decision::new(DEFAULT_DECISION, false)])
    }

    /// Answers with an empty decision set
    pub fn silent() -> Self {
        Self::with_decisions(Vec::new())
    }

    /// Every call fails with a 503 from the authorizer
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::silent()
        }
    }

    pub fn with_decisions(decisions: Vec<Decision>) -> Self {
        Self {
            decisions,
            fail: false,
            delay: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Wait before answering
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queries(&self) -> Vec<DecisionQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn last_query(&self) -> DecisionQuery {
        self.queries().pop().expect("authorizer was not called")
    }

    async fn answer(&self, query: &DecisionQuery) -> Result<(), ClientError> {
        self.queries.lock().unwrap().push(query.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail {
            return Err(ClientError::Status {
                status: 503,
                body: "authorizer unavailable".into(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Authorizer for MockAuthorizer {
    async fn evaluate(&self, query: &DecisionQuery) -> Result<Vec<Decision>, ClientError> {
        self.answer(query).await?;
        Ok(self.decisions.clone())
    }

    async fn evaluate_tree(
        &self,
        query: &DecisionQuery,
        _separator: PathSeparator,
    ) -> Result<DecisionTree, ClientError> {
        self.answer(query).await?;

        let decisions: Map<String, Value> = self
            .decisions
            .iter()
            .map(|d| (d.name.clone(), Value::Bool(d.allowed)))
            .collect();

        let mut path = Map::new();
        path.insert(query.policy.path.clone(), Value::Object(decisions));

        Ok(DecisionTree {
            root: query.policy.name.clone(),
            path,
        })
    }
}

/// Install a test subscriber so tracing output shows up with `--nocapture`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("authz_middleware=debug")
        .with_test_writer()
        .try_init();
}
