use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    entities::user_subscriptions::UserSubscriptionEntity,
    value_objects::{
        field_rules::{FieldSchema, FieldValue, Rule, Validate, format_field_errors, validate},
        periods::{Period, PeriodError, validate_period},
    },
};

const SERVICE_NAME_RULES: &[Rule] = &[Rule::Min(3), Rule::Max(255)];
const PRICE_RULES: &[Rule] = &[Rule::Min(0)];
const USER_ID_RULES: &[Rule] = &[Rule::Required, Rule::UuidV4];
const START_DATE_RULES: &[Rule] = &[Rule::Required];

const SUBSCRIPTION_SCHEMA: &[FieldSchema] = &[
    FieldSchema {
        name: "service_name",
        wire_name: Some("service_name"),
        rules: SERVICE_NAME_RULES,
    },
    FieldSchema {
        name: "price",
        wire_name: Some("price"),
        rules: PRICE_RULES,
    },
    FieldSchema {
        name: "user_id",
        wire_name: Some("user_id"),
        rules: USER_ID_RULES,
    },
    FieldSchema {
        name: "start_date",
        wire_name: Some("start_date"),
        rules: START_DATE_RULES,
    },
];

const TOTAL_COST_SCHEMA: &[FieldSchema] = &[
    FieldSchema {
        name: "service_name",
        wire_name: Some("service_name"),
        rules: SERVICE_NAME_RULES,
    },
    FieldSchema {
        name: "user_id",
        wire_name: Some("user_id"),
        rules: USER_ID_RULES,
    },
    FieldSchema {
        name: "start_date",
        wire_name: Some("start_date"),
        rules: START_DATE_RULES,
    },
];

/// Why a decoded request body was turned away.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestRejection {
    #[error(transparent)]
    Period(#[from] PeriodError),
    #[error("{0}")]
    Fields(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUserSubscriptionRequest {
    #[serde(default)]
    pub service_name: String,
    #[serde(default)]
    pub price: i32,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// Body of `PUT /subscriptions/:id`. The id always comes from the path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserSubscriptionRequest {
    #[serde(skip_deserializing)]
    pub id: i64,
    #[serde(default)]
    pub service_name: String,
    #[serde(default)]
    pub price: i32,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TotalCostRequest {
    #[serde(default)]
    pub service_name: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
}

impl Validate for CreateUserSubscriptionRequest {
    fn schema() -> &'static [FieldSchema] {
        SUBSCRIPTION_SCHEMA
    }

    fn field_value(&self, field: &str) -> Option<FieldValue<'_>> {
        match field {
            "service_name" => Some(FieldValue::Text(&self.service_name)),
            "price" => Some(FieldValue::Integer(self.price.into())),
            "user_id" => Some(FieldValue::Text(&self.user_id)),
            "start_date" => Some(FieldValue::Text(&self.start_date)),
            _ => None,
        }
    }
}

impl Validate for UpdateUserSubscriptionRequest {
    fn schema() -> &'static [FieldSchema] {
        SUBSCRIPTION_SCHEMA
    }

    fn field_value(&self, field: &str) -> Option<FieldValue<'_>> {
        match field {
            "service_name" => Some(FieldValue::Text(&self.service_name)),
            "price" => Some(FieldValue::Integer(self.price.into())),
            "user_id" => Some(FieldValue::Text(&self.user_id)),
            "start_date" => Some(FieldValue::Text(&self.start_date)),
            _ => None,
        }
    }
}

impl Validate for TotalCostRequest {
    fn schema() -> &'static [FieldSchema] {
        TOTAL_COST_SCHEMA
    }

    fn field_value(&self, field: &str) -> Option<FieldValue<'_>> {
        match field {
            "service_name" => Some(FieldValue::Text(&self.service_name)),
            "user_id" => Some(FieldValue::Text(&self.user_id)),
            "start_date" => Some(FieldValue::Text(&self.start_date)),
            _ => None,
        }
    }
}

/// Date checks first, then the structural schema, then the typed user id.
fn check_request<T: Validate>(
    request: &T,
    start_date: &str,
    end_date: Option<&str>,
    user_id: &str,
) -> Result<(Period, Option<Period>, Uuid), RequestRejection> {
    let (start, end) = validate_period(start_date, end_date)?;

    validate(request)
        .map_err(|violations| RequestRejection::Fields(format_field_errors(&violations, T::schema())))?;

    let user_id = Uuid::parse_str(user_id)
        .map_err(|_| RequestRejection::Fields("field user_id must be a valid UUID".to_string()))?;

    Ok((start, end, user_id))
}

/// A create or update payload that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSubscriptionDraft {
    pub service_name: String,
    pub price: i32,
    pub user_id: Uuid,
    pub start_date: Period,
    pub end_date: Option<Period>,
}

impl CreateUserSubscriptionRequest {
    pub fn into_draft(self) -> Result<UserSubscriptionDraft, RequestRejection> {
        let (start_date, end_date, user_id) = check_request(
            &self,
            &self.start_date,
            self.end_date.as_deref(),
            &self.user_id,
        )?;

        Ok(UserSubscriptionDraft {
            service_name: self.service_name,
            price: self.price,
            user_id,
            start_date,
            end_date,
        })
    }
}

impl UpdateUserSubscriptionRequest {
    pub fn into_draft(self) -> Result<(i64, UserSubscriptionDraft), RequestRejection> {
        let (start_date, end_date, user_id) = check_request(
            &self,
            &self.start_date,
            self.end_date.as_deref(),
            &self.user_id,
        )?;

        Ok((
            self.id,
            UserSubscriptionDraft {
                service_name: self.service_name,
                price: self.price,
                user_id,
                start_date,
                end_date,
            },
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalCostFilter {
    pub user_id: Uuid,
    pub service_name: String,
    pub start: Period,
    /// `None` is passed to the store as-is; see `sum_cost`.
    pub end: Option<Period>,
}

impl TotalCostRequest {
    pub fn into_filter(self) -> Result<TotalCostFilter, RequestRejection> {
        let (start, end, user_id) = check_request(
            &self,
            &self.start_date,
            self.end_date.as_deref(),
            &self.user_id,
        )?;

        Ok(TotalCostFilter {
            user_id,
            service_name: self.service_name,
            start,
            end,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSubscriptionModel {
    pub id: i64,
    pub service_name: String,
    pub price: i32,
    pub user_id: Uuid,
    pub start_date: String,
    /// Empty when the subscription is open-ended.
    pub end_date: String,
}

impl From<UserSubscriptionEntity> for UserSubscriptionModel {
    fn from(value: UserSubscriptionEntity) -> Self {
        Self {
            id: value.id,
            service_name: value.service_name,
            price: value.price,
            user_id: value.user_id,
            start_date: Period::from(value.start_date).to_string(),
            end_date: value
                .end_date
                .map(|date| Period::from(date).to_string())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSubscriptionAck {
    pub id: i64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalCostResponse {
    pub total_cost: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn create_request() -> CreateUserSubscriptionRequest {
        CreateUserSubscriptionRequest {
            service_name: "Netflix".to_string(),
            price: 999,
            user_id: "60601fee-2bf1-4721-ae6f-7636e79a0cba".to_string(),
            start_date: "01-2024".to_string(),
            end_date: None,
        }
    }

    #[test]
    fn valid_create_request_becomes_draft() {
        let draft = create_request().into_draft().unwrap();
        assert_eq!(draft.service_name, "Netflix");
        assert_eq!(draft.price, 999);
        assert_eq!(draft.start_date.to_string(), "01-2024");
        assert_eq!(draft.end_date, None);
    }

    #[test]
    fn empty_end_date_is_open_ended() {
        let request = CreateUserSubscriptionRequest {
            end_date: Some(String::new()),
            ..create_request()
        };
        assert_eq!(request.into_draft().unwrap().end_date, None);
    }

    #[test]
    fn date_errors_are_reported_before_field_errors() {
        let request = CreateUserSubscriptionRequest {
            service_name: "tv".to_string(),
            start_date: "2024-01".to_string(),
            ..create_request()
        };
        let rejection = request.into_draft().unwrap_err();
        assert!(matches!(
            rejection,
            RequestRejection::Period(PeriodError::InvalidStart(_))
        ));
    }

    #[test]
    fn every_failing_field_is_listed() {
        let request = CreateUserSubscriptionRequest {
            service_name: "tv".to_string(),
            price: -5,
            user_id: String::new(),
            ..create_request()
        };
        assert_eq!(
            request.into_draft().unwrap_err(),
            RequestRejection::Fields(
                "field service_name must be at least 3 characters long, \
                 field price must be at least 0, \
                 field user_id is required"
                    .to_string()
            )
        );
    }

    #[test]
    fn service_name_longer_than_255_is_rejected() {
        let request = CreateUserSubscriptionRequest {
            service_name: "x".repeat(256),
            ..create_request()
        };
        assert_eq!(
            request.into_draft().unwrap_err().to_string(),
            "field service_name must be no more than 255 characters long"
        );
    }

    #[test]
    fn non_v4_user_id_is_rejected() {
        let id = "60601fee-2bf1-4721-ae6f-7636e79a0cba";
        let cases = [
            // version 1
            "c232ab00-9414-11ec-b3c8-9e6bdeced846".to_string(),
            // NCS variant
            "60601fee-2bf1-4721-0e6f-7636e79a0cba".to_string(),
            id.replace('-', ""),
            format!("{{{id}}}"),
            format!("urn:uuid:{id}"),
        ];

        for user_id in cases {
            let request = CreateUserSubscriptionRequest {
                user_id: user_id.clone(),
                ..create_request()
            };
            assert_eq!(
                request.into_draft().unwrap_err().to_string(),
                "field user_id must be a valid UUID",
                "{user_id}"
            );
        }
    }

    #[test]
    fn update_keeps_path_id() {
        let request = UpdateUserSubscriptionRequest {
            id: 42,
            service_name: "Spotify".to_string(),
            price: 0,
            user_id: Uuid::new_v4().to_string(),
            start_date: "02-2024".to_string(),
            end_date: Some("03-2024".to_string()),
        };
        let (id, draft) = request.into_draft().unwrap();
        assert_eq!(id, 42);
        assert_eq!(draft.end_date.map(|p| p.to_string()).as_deref(), Some("03-2024"));
    }

    #[test]
    fn update_body_cannot_override_id() {
        let request: UpdateUserSubscriptionRequest = serde_json::from_str(
            r#"{"id": 7, "service_name": "Spotify", "price": 1,
                "user_id": "60601fee-2bf1-4721-ae6f-7636e79a0cba", "start_date": "02-2024"}"#,
        )
        .unwrap();
        assert_eq!(request.id, 0);
    }

    #[test]
    fn total_cost_request_keeps_missing_upper_bound() {
        let request = TotalCostRequest {
            service_name: "Netflix".to_string(),
            user_id: Uuid::new_v4().to_string(),
            start_date: "01-2024".to_string(),
            end_date: None,
        };
        let filter = request.into_filter().unwrap();
        assert_eq!(filter.end, None);
    }

    #[test]
    fn total_cost_request_rejects_inverted_range() {
        let request = TotalCostRequest {
            service_name: "Netflix".to_string(),
            user_id: Uuid::new_v4().to_string(),
            start_date: "12-2024".to_string(),
            end_date: Some("01-2024".to_string()),
        };
        assert_eq!(
            request.into_filter().unwrap_err().to_string(),
            "end_date must be after start_date"
        );
    }

    #[test]
    fn model_renders_dates_as_month_year() {
        let entity = UserSubscriptionEntity {
            id: 1,
            service_name: "Netflix".to_string(),
            price: 999,
            user_id: Uuid::new_v4(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: None,
            updated_at: Utc::now(),
        };
        let model = UserSubscriptionModel::from(entity);
        assert_eq!(model.start_date, "01-2024");
        assert_eq!(model.end_date, "");

        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["end_date"], "");
    }
}
