use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::user_subscriptions::UserSubscriptionDraft,
    infra::db::postgres::schema::user_subscriptions,
};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = user_subscriptions)]
pub struct UserSubscriptionEntity {
    pub id: i64,
    pub service_name: String,
    pub price: i32,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

/// Column values written on insert and replaced wholesale on update.
#[derive(Debug, Clone, PartialEq, Insertable, AsChangeset)]
#[diesel(table_name = user_subscriptions)]
#[diesel(treat_none_as_null = true)]
pub struct InsertUserSubscriptionEntity {
    pub service_name: String,
    pub price: i32,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl From<UserSubscriptionDraft> for InsertUserSubscriptionEntity {
    fn from(value: UserSubscriptionDraft) -> Self {
        Self {
            service_name: value.service_name,
            price: value.price,
            user_id: value.user_id,
            start_date: value.start_date.first_day(),
            end_date: value.end_date.map(|period| period.first_day()),
        }
    }
}
