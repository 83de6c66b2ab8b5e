use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{
    PgConnection, delete,
    dsl::{self, sum},
    insert_into,
    pg::Pg,
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
    sql_types::{BigInt, Nullable},
    update,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::user_subscriptions},
};
use domain::{
    entities::user_subscriptions::{InsertUserSubscriptionEntity, UserSubscriptionEntity},
    errors::{UserSubscriptionError, UserSubscriptionResult},
    repositories::user_subscriptions::UserSubscriptionRepository,
    value_objects::user_subscriptions::TotalCostFilter,
};

/// Name of the range-exclusion constraint a schema may define to reject
/// overlapping periods for the same user and service.
pub const OVERLAP_CONSTRAINT: &str = "user_subscriptions_no_overlap";

pub struct UserSubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl UserSubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }

    /// Runs `query` on a pooled connection off the async workers.
    async fn run<T, F>(&self, operation: &'static str, query: F) -> UserSubscriptionResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> UserSubscriptionResult<T> + Send + 'static,
    {
        let db_pool = Arc::clone(&self.db_pool);

        tokio::task::spawn_blocking(move || {
            let mut conn = db_pool
                .get()
                .with_context(|| format!("{operation}: failed to check out connection"))?;
            query(&mut conn)
        })
        .await
        .with_context(|| format!("{operation}: blocking task failed"))?
    }
}

/// Constraint violations that carry business meaning; `None` for the rest.
fn classify_write_error(err: &DieselError) -> Option<UserSubscriptionError> {
    match err {
        DieselError::DatabaseError(_, info) if info.constraint_name() == Some(OVERLAP_CONSTRAINT) => {
            Some(UserSubscriptionError::Overlap)
        }
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            Some(UserSubscriptionError::AlreadyExists)
        }
        _ => None,
    }
}

fn map_write_error(operation: &'static str, err: DieselError) -> UserSubscriptionError {
    classify_write_error(&err).unwrap_or_else(|| {
        UserSubscriptionError::Internal(anyhow::Error::new(err).context(operation))
    })
}

/// Every row owned by `user_id`, oldest id first.
fn list_by_user_query(user_id: Uuid) -> user_subscriptions::BoxedQuery<'static, Pg> {
    user_subscriptions::table
        .filter(user_subscriptions::user_id.eq(user_id))
        .order(user_subscriptions::id.asc())
        .into_boxed()
}

type UpdateById<'a> = dsl::Update<
    dsl::Find<user_subscriptions::table, i64>,
    (
        &'a InsertUserSubscriptionEntity,
        dsl::Eq<user_subscriptions::updated_at, DateTime<Utc>>,
    ),
>;

/// Replaces every column of row `id` and stamps `updated_at`.
fn update_query(
    id: i64,
    entity: &InsertUserSubscriptionEntity,
    updated_at: DateTime<Utc>,
) -> UpdateById<'_> {
    update(user_subscriptions::table.find(id))
        .set((entity, user_subscriptions::updated_at.eq(updated_at)))
}

/// A missing upper bound binds NULL, so `end_date <= NULL` matches nothing.
fn sum_cost_query(
    filter: TotalCostFilter,
) -> user_subscriptions::BoxedQuery<'static, Pg, Nullable<BigInt>> {
    user_subscriptions::table
        .filter(user_subscriptions::user_id.eq(filter.user_id))
        .filter(user_subscriptions::service_name.eq(filter.service_name))
        .filter(user_subscriptions::start_date.ge(filter.start.first_day()))
        .filter(user_subscriptions::end_date.le(filter.end.map(|end| end.first_day())))
        .select(sum(user_subscriptions::price))
        .into_boxed()
}

#[async_trait]
impl UserSubscriptionRepository for UserSubscriptionPostgres {
    async fn insert(&self, entity: InsertUserSubscriptionEntity) -> UserSubscriptionResult<i64> {
        self.run("insert user_subscription", move |conn| {
            insert_into(user_subscriptions::table)
                .values(&entity)
                .returning(user_subscriptions::id)
                .get_result::<i64>(conn)
                .map_err(|err| map_write_error("insert user_subscription", err))
        })
        .await
    }

    async fn find_by_id(&self, id: i64) -> UserSubscriptionResult<UserSubscriptionEntity> {
        self.run("find user_subscription", move |conn| {
            user_subscriptions::table
                .find(id)
                .select(UserSubscriptionEntity::as_select())
                .first::<UserSubscriptionEntity>(conn)
                .optional()
                .context("find user_subscription")?
                .ok_or(UserSubscriptionError::NotFound)
        })
        .await
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
    ) -> UserSubscriptionResult<Vec<UserSubscriptionEntity>> {
        self.run("list user_subscriptions", move |conn| {
            let results = list_by_user_query(user_id)
                .select(UserSubscriptionEntity::as_select())
                .load::<UserSubscriptionEntity>(conn)
                .context("list user_subscriptions")?;

            if results.is_empty() {
                return Err(UserSubscriptionError::UserNotFound);
            }

            Ok(results)
        })
        .await
    }

    async fn update(
        &self,
        id: i64,
        entity: InsertUserSubscriptionEntity,
    ) -> UserSubscriptionResult<UserSubscriptionEntity> {
        self.run("update user_subscription", move |conn| {
            update_query(id, &entity, Utc::now())
                .returning(UserSubscriptionEntity::as_returning())
                .get_result::<UserSubscriptionEntity>(conn)
                .optional()
                .map_err(|err| map_write_error("update user_subscription", err))?
                .ok_or(UserSubscriptionError::NotFound)
        })
        .await
    }

    async fn delete_by_id(&self, id: i64) -> UserSubscriptionResult<()> {
        self.run("delete user_subscription", move |conn| {
            let affected = delete(user_subscriptions::table.find(id))
                .execute(conn)
                .context("delete user_subscription")?;

            if affected == 0 {
                return Err(UserSubscriptionError::NotFound);
            }

            Ok(())
        })
        .await
    }

    async fn sum_cost(&self, filter: TotalCostFilter) -> UserSubscriptionResult<i64> {
        self.run("sum user_subscription cost", move |conn| {
            let total = sum_cost_query(filter)
                .get_result::<Option<i64>>(conn)
                .context("sum user_subscription cost")?;

            Ok(total.unwrap_or(0))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::result::DatabaseErrorInformation;

    #[derive(Debug)]
    struct ConstraintInfo(Option<&'static str>);

    impl DatabaseErrorInformation for ConstraintInfo {
        fn message(&self) -> &str {
            "constraint violated"
        }
        fn details(&self) -> Option<&str> {
            None
        }
        fn hint(&self) -> Option<&str> {
            None
        }
        fn table_name(&self) -> Option<&str> {
            Some("user_subscriptions")
        }
        fn column_name(&self) -> Option<&str> {
            None
        }
        fn constraint_name(&self) -> Option<&str> {
            self.0
        }
        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    fn db_error(kind: DatabaseErrorKind, constraint: Option<&'static str>) -> DieselError {
        DieselError::DatabaseError(kind, Box::new(ConstraintInfo(constraint)))
    }

    #[test]
    fn unique_violation_is_already_exists() {
        let err = db_error(
            DatabaseErrorKind::UniqueViolation,
            Some("user_subscriptions_user_id_service_name_start_date_key"),
        );
        assert!(matches!(
            map_write_error("insert", err),
            UserSubscriptionError::AlreadyExists
        ));
    }

    #[test]
    fn overlap_constraint_is_overlap_whatever_the_kind() {
        let err = db_error(DatabaseErrorKind::Unknown, Some(OVERLAP_CONSTRAINT));
        assert!(matches!(
            map_write_error("insert", err),
            UserSubscriptionError::Overlap
        ));
    }

    #[test]
    fn other_database_errors_stay_internal() {
        let err = db_error(DatabaseErrorKind::CheckViolation, Some("price_non_negative"));
        let mapped = map_write_error("update user_subscription", err);
        assert!(matches!(mapped, UserSubscriptionError::Internal(_)));
        assert_eq!(mapped.to_string(), "update user_subscription");
    }

    fn total_cost_filter(end: Option<&str>) -> TotalCostFilter {
        TotalCostFilter {
            user_id: Uuid::nil(),
            service_name: "Netflix".to_string(),
            start: "01-2024".parse().unwrap(),
            end: end.map(|raw| raw.parse().unwrap()),
        }
    }

    #[test]
    fn sum_cost_query_compares_end_date_with_bound() {
        let sql = diesel::debug_query::<Pg, _>(&sum_cost_query(total_cost_filter(Some(
            "12-2024",
        ))))
        .to_string();

        assert!(sql.starts_with(r#"SELECT sum("user_subscriptions"."price") FROM "user_subscriptions""#), "{sql}");
        assert!(sql.contains(r#""user_subscriptions"."user_id" = $1"#), "{sql}");
        assert!(sql.contains(r#""user_subscriptions"."service_name" = $2"#), "{sql}");
        assert!(sql.contains(r#""user_subscriptions"."start_date" >= $3"#), "{sql}");
        assert!(sql.contains(r#""user_subscriptions"."end_date" <= $4"#), "{sql}");
        assert!(sql.contains("2024-01-01"), "{sql}");
        assert!(sql.ends_with("Some(2024-12-01)]"), "{sql}");
    }

    #[test]
    fn sum_cost_query_binds_null_without_upper_bound() {
        let sql = diesel::debug_query::<Pg, _>(&sum_cost_query(total_cost_filter(None))).to_string();

        assert!(sql.contains(r#""user_subscriptions"."end_date" <= $4"#), "{sql}");
        assert!(sql.ends_with("None]"), "{sql}");
    }

    #[test]
    fn list_by_user_query_orders_by_id() {
        let sql = diesel::debug_query::<Pg, _>(&list_by_user_query(Uuid::nil())).to_string();

        assert!(sql.contains(r#"WHERE ("user_subscriptions"."user_id" = $1)"#), "{sql}");
        assert!(sql.contains(r#"ORDER BY "user_subscriptions"."id" ASC"#), "{sql}");
    }

    #[test]
    fn update_query_rewrites_every_column_and_bumps_updated_at() {
        let entity = InsertUserSubscriptionEntity {
            service_name: "Netflix".to_string(),
            price: 999,
            user_id: Uuid::nil(),
            start_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: None,
        };
        let now = Utc::now();

        let sql = diesel::debug_query::<Pg, _>(&update_query(7, &entity, now)).to_string();

        assert!(sql.starts_with(r#"UPDATE "user_subscriptions" SET"#), "{sql}");
        for column in ["service_name", "price", "user_id", "start_date", "end_date"] {
            assert!(sql.contains(&format!(r#""{column}" = $"#)), "{column}: {sql}");
        }
        assert!(sql.contains(r#""updated_at" = $6"#), "{sql}");
        assert!(sql.contains(r#"WHERE ("user_subscriptions"."id" = $7)"#), "{sql}");
    }

    #[test]
    fn not_found_from_diesel_is_not_classified_here() {
        assert!(classify_write_error(&DieselError::NotFound).is_none());
    }
}
