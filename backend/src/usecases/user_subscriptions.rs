use std::{future::Future, sync::Arc, time::Duration};

use crates::domain::{
    errors::{UserSubscriptionError, UserSubscriptionResult},
    repositories::user_subscriptions::UserSubscriptionRepository,
    value_objects::user_subscriptions::{
        TotalCostFilter, UserSubscriptionDraft, UserSubscriptionModel,
    },
};
use tracing::{Instrument, Span, debug, error, warn};
use uuid::Uuid;

/// One repository call per operation, bounded by `query_timeout`.
///
/// Every call runs inside `log_span`, handed in by whoever wires the use case.
pub struct UserSubscriptionUseCase<T>
where
    T: UserSubscriptionRepository + Send + Sync,
{
    user_subscription_repo: Arc<T>,
    query_timeout: Duration,
    log_span: Span,
}

impl<T> UserSubscriptionUseCase<T>
where
    T: UserSubscriptionRepository + Send + Sync,
{
    pub fn new(user_subscription_repo: Arc<T>, query_timeout: Duration, log_span: Span) -> Self {
        Self {
            user_subscription_repo,
            query_timeout,
            log_span,
        }
    }

    pub async fn add(&self, draft: UserSubscriptionDraft) -> UserSubscriptionResult<i64> {
        debug!(
            user_id = %draft.user_id,
            service_name = %draft.service_name,
            "user_subscriptions: add requested"
        );
        self.call("add", self.user_subscription_repo.insert(draft.into()))
            .await
    }

    pub async fn get_by_id(&self, id: i64) -> UserSubscriptionResult<UserSubscriptionModel> {
        self.call("get_by_id", self.user_subscription_repo.find_by_id(id))
            .await
            .map(UserSubscriptionModel::from)
    }

    pub async fn list_by_user(
        &self,
        user_id: Uuid,
    ) -> UserSubscriptionResult<Vec<UserSubscriptionModel>> {
        let subscriptions = self
            .call("list_by_user", self.user_subscription_repo.list_by_user(user_id))
            .await?;

        Ok(subscriptions
            .into_iter()
            .map(UserSubscriptionModel::from)
            .collect())
    }

    pub async fn update_by_id(
        &self,
        id: i64,
        draft: UserSubscriptionDraft,
    ) -> UserSubscriptionResult<UserSubscriptionModel> {
        self.call(
            "update_by_id",
            self.user_subscription_repo.update(id, draft.into()),
        )
        .await
        .map(UserSubscriptionModel::from)
    }

    pub async fn delete_by_id(&self, id: i64) -> UserSubscriptionResult<()> {
        self.call("delete_by_id", self.user_subscription_repo.delete_by_id(id))
            .await
    }

    pub async fn total_cost(&self, filter: TotalCostFilter) -> UserSubscriptionResult<i64> {
        self.call("total_cost", self.user_subscription_repo.sum_cost(filter))
            .await
    }

    async fn call<R, F>(&self, operation: &'static str, store_call: F) -> UserSubscriptionResult<R>
    where
        F: Future<Output = UserSubscriptionResult<R>>,
    {
        let deadline = self.query_timeout;

        async move {
            let result = match tokio::time::timeout(deadline, store_call).await {
                Ok(result) => result,
                Err(_) => Err(UserSubscriptionError::Timeout {
                    operation,
                    after: deadline,
                }),
            };

            if let Err(err) = &result {
                log_failure(operation, err);
            }

            result
        }
        .instrument(self.log_span.clone())
        .await
    }
}

fn log_failure(operation: &'static str, err: &UserSubscriptionError) {
    match err {
        UserSubscriptionError::NotFound
        | UserSubscriptionError::UserNotFound
        | UserSubscriptionError::AlreadyExists
        | UserSubscriptionError::Overlap => {
            warn!(operation, error = %err, "user_subscriptions: rejected by store");
        }
        UserSubscriptionError::Timeout { .. } => {
            error!(operation, error = %err, "user_subscriptions: store call abandoned");
        }
        UserSubscriptionError::Internal(source) => {
            error!(operation, db_error = ?source, "user_subscriptions: store call failed");
        }
    }
}
