use crate::error::Result;
use crate::model::{Decision, DecisionQuery, DecisionTree, PathSeparator};
use async_trait::async_trait;
use std::sync::Arc;

/// Decision transport
///
/// One call is one round trip to the authorizer. Implementations do not retry;
/// cancellation is honored by dropping the returned future.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Evaluate the decisions named in `query.policy.decisions`.
    async fn evaluate(&self, query: &DecisionQuery) -> Result<Vec<Decision>>;

    /// Evaluate every decision under the policy path in `query`.
    async fn evaluate_tree(
        &self,
        query: &DecisionQuery,
        separator: PathSeparator,
    ) -> Result<DecisionTree>;
}

#[async_trait]
impl<T: Authorizer + ?Sized> Authorizer for Arc<T> {
    async fn evaluate(&self, query: &DecisionQuery) -> Result<Vec<Decision>> {
        (**self).evaluate(query).await
    }

    async fn evaluate_tree(
        &self,
        query: &DecisionQuery,
        separator: PathSeparator,
    ) -> Result<DecisionTree> {
        (**self).evaluate_tree(query, separator).await
    }
}
