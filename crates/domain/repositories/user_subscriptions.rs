use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::user_subscriptions::{InsertUserSubscriptionEntity, UserSubscriptionEntity},
    errors::UserSubscriptionResult,
    value_objects::user_subscriptions::TotalCostFilter,
};

/// Persistence for user subscriptions.
///
/// Implementations report business outcomes through the domain variants of
/// `UserSubscriptionError` and wrap everything else in `Internal`.
#[automock]
#[async_trait]
pub trait UserSubscriptionRepository {
    /// `AlreadyExists` on a uniqueness violation.
    async fn insert(&self, entity: InsertUserSubscriptionEntity) -> UserSubscriptionResult<i64>;

    async fn find_by_id(&self, id: i64) -> UserSubscriptionResult<UserSubscriptionEntity>;

    /// Never returns an empty list: no rows is `UserNotFound`.
    async fn list_by_user(&self, user_id: Uuid)
    -> UserSubscriptionResult<Vec<UserSubscriptionEntity>>;

    async fn update(
        &self,
        id: i64,
        entity: InsertUserSubscriptionEntity,
    ) -> UserSubscriptionResult<UserSubscriptionEntity>;

    async fn delete_by_id(&self, id: i64) -> UserSubscriptionResult<()>;

    /// Sum of `price` over the matching rows, `0` when nothing matches.
    async fn sum_cost(&self, filter: TotalCostFilter) -> UserSubscriptionResult<i64>;
}
