//! Decision evaluation

use crate::error::{AuthzError, Result};
use authz_client::{Authorizer, Decision, DecisionQuery, DecisionTree, PathSeparator};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

/// Sends queries to the authorizer and interprets the decisions
#[derive(Clone)]
pub struct Evaluator {
    authorizer: Arc<dyn Authorizer>,
}

impl fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator").finish_non_exhaustive()
    }
}

impl Evaluator {
    pub fn new<A: Authorizer + 'static>(authorizer: A) -> Self {
        Self {
            authorizer: Arc::new(authorizer),
        }
    }

    pub fn from_shared(authorizer: Arc<dyn Authorizer>) -> Self {
        Self { authorizer }
    }

    /// One round trip; `Ok(false)` means the policy denied the request.
    ///
    /// An empty decision set is [`AuthzError::NoDecision`], never a denial.
    pub async fn evaluate(&self, query: &DecisionQuery) -> Result<bool> {
        let decisions = self.authorizer.evaluate(query).await.map_err(|e| {
            error!(policy_path = %query.policy.path, error = %e, "Authorization call failed");
            AuthzError::Transport(e)
        })?;

        match pick(&decisions, query.policy.decision()) {
            Some(decision) => Ok(decision.allowed),
            None => {
                error!(
                    policy = %query.policy.name,
                    policy_path = %query.policy.path,
                    "Authorizer returned no decisions"
                );
                Err(AuthzError::NoDecision)
            }
        }
    }

    /// Like [`evaluate`](Self::evaluate), with a denial as [`AuthzError::Unauthorized`]
    pub async fn authorize(&self, query: &DecisionQuery) -> Result<()> {
        if self.evaluate(query).await? {
            Ok(())
        } else {
            info!(
                policy_path = %query.policy.path,
                identity_kind = query.identity.kind.as_str(),
                "Request denied by policy"
            );
            Err(AuthzError::Unauthorized)
        }
    }

    /// Every decision under the query's policy path
    pub async fn decision_tree(&self, query: &DecisionQuery, separator: PathSeparator) -> Result<DecisionTree> {
        self.authorizer.evaluate_tree(query, separator).await.map_err(|e| {
            error!(policy_path = %query.policy.path, error = %e, "Decision tree call failed");
            AuthzError::Transport(e)
        })
    }
}

/// The requested decision, or the first one when the name is not echoed back
fn pick<'a>(decisions: &'a [Decision], requested: Option<&str>) -> Option<&'a Decision> {
    requested
        .and_then(|name| decisions.iter().find(|d| d.name == name))
        .or_else(|| decisions.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use authz_client::{ClientError, PolicyReference};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedAuthorizer {
        decisions: Vec<Decision>,
        calls: AtomicUsize,
    }

    impl FixedAuthorizer {
        fn new(decisions: Vec<Decision>) -> Self {
            Self {
                decisions,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Authorizer for FixedAuthorizer {
        async fn evaluate(&self, _query: &DecisionQuery) -> std::result::Result<Vec<Decision>, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.decisions.clone())
        }

        async fn evaluate_tree(
            &self,
            query: &DecisionQuery,
            _separator: PathSeparator,
        ) -> std::result::Result<DecisionTree, ClientError> {
            Ok(DecisionTree {
                root: query.policy.path.clone(),
                path: Default::default(),
            })
        }
    }

    struct FailingAuthorizer;

    #[async_trait]
    impl Authorizer for FailingAuthorizer {
        async fn evaluate(&self, _query: &DecisionQuery) -> std::result::Result<Vec<Decision>, ClientError> {
            Err(ClientError::Status {
                status: 503,
                body: "unavailable".into(),
            })
        }

        async fn evaluate_tree(
            &self,
            _query: &DecisionQuery,
            _separator: PathSeparator,
        ) -> std::result::Result<DecisionTree, ClientError> {
            Err(ClientError::DeadlineExceeded)
        }
    }

    fn query() -> DecisionQuery {
        DecisionQuery {
            policy: PolicyReference::new("boards", "allowed").with_path("boards.GET.boards"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_allowed() {
        let evaluator = Evaluator::new(FixedAuthorizer::new(vec![Decision::new("allowed", true)]));
        assert!(evaluator.evaluate(&query()).await.unwrap());
        assert!(evaluator.authorize(&query()).await.is_ok());
    }

    #[tokio::test]
    async fn test_denied() {
        let evaluator = Evaluator::new(FixedAuthorizer::new(vec![Decision::new("allowed", false)]));
        assert!(!evaluator.evaluate(&query()).await.unwrap());
        assert!(matches!(evaluator.authorize(&query()).await, Err(AuthzError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_empty_decisions_is_not_a_denial() {
        let evaluator = Evaluator::new(FixedAuthorizer::new(Vec::new()));
        assert!(matches!(evaluator.evaluate(&query()).await, Err(AuthzError::NoDecision)));
    }

    #[tokio::test]
    async fn test_requested_decision_is_preferred() {
        let evaluator = Evaluator::new(FixedAuthorizer::new(vec![
            Decision::new("visible", false),
            Decision::new("allowed", true),
        ]));
        assert!(evaluator.evaluate(&query()).await.unwrap());
    }

    #[tokio::test]
    async fn test_transport_error() {
        let evaluator = Evaluator::new(FailingAuthorizer);

        let err = evaluator.evaluate(&query()).await.unwrap_err();
        assert!(matches!(err, AuthzError::Transport(ClientError::Status { status: 503, .. })));

        let err = evaluator.decision_tree(&query(), PathSeparator::Dot).await.unwrap_err();
        assert!(matches!(err, AuthzError::Transport(ClientError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn test_repeated_evaluation_is_stable() {
        let authorizer = Arc::new(FixedAuthorizer::new(vec![Decision::new("allowed", false)]));
        let evaluator = Evaluator::from_shared(authorizer.clone());
        let query = query();

        let first = evaluator.evaluate(&query).await.unwrap();
        let second = evaluator.evaluate(&query).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(authorizer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_decision_tree() {
        let evaluator = Evaluator::new(FixedAuthorizer::new(Vec::new()));
        let tree = evaluator.decision_tree(&query(), PathSeparator::Dot).await.unwrap();
        assert_eq!(tree.root, "boards.GET.boards");
    }
}
