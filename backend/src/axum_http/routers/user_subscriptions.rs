use crate::{
    axum_http::error_responses::AppError, config::config_model::DotEnvyConfig,
    usecases::user_subscriptions::UserSubscriptionUseCase,
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use crates::{
    domain::{
        repositories::user_subscriptions::UserSubscriptionRepository,
        value_objects::user_subscriptions::{
            CreateUserSubscriptionRequest, RequestRejection, TotalCostRequest, TotalCostResponse,
            UpdateUserSubscriptionRequest, UserSubscriptionAck,
        },
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::user_subscriptions::UserSubscriptionPostgres,
    },
};
use serde::{Deserialize, de::DeserializeOwned};
use std::sync::Arc;
use tracing::{info, info_span, warn};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ListUserSubscriptionsQuery {
    user_id: Option<String>,
}

pub fn routes(db_pool: Arc<PgPoolSquad>, config: Arc<DotEnvyConfig>) -> Router {
    let user_subscription_repository = UserSubscriptionPostgres::new(Arc::clone(&db_pool));
    let user_subscription_usecase = UserSubscriptionUseCase::new(
        Arc::new(user_subscription_repository),
        config.database.query_timeout(),
        info_span!("user_subscriptions"),
    );

    router(Arc::new(user_subscription_usecase))
}

pub fn router<T>(usecase: Arc<UserSubscriptionUseCase<T>>) -> Router
where
    T: UserSubscriptionRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/", post(add::<T>).get(list_by_user::<T>))
        .route("/total_cost", get(total_cost::<T>))
        .route(
            "/:id",
            get(get_by_id::<T>)
                .put(update_by_id::<T>)
                .delete(delete_by_id::<T>),
        )
        .with_state(usecase)
}

pub async fn add<T>(
    State(usecase): State<Arc<UserSubscriptionUseCase<T>>>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError>
where
    T: UserSubscriptionRepository + Send + Sync,
{
    let request: CreateUserSubscriptionRequest = decode_body(&body)?;
    info!(service_name = %request.service_name, "user_subscriptions: add request received");

    let draft = request.into_draft().map_err(reject)?;
    let id = usecase
        .add(draft)
        .await
        .map_err(|err| AppError::use_case(err, "failed to add user subscription"))?;

    Ok((
        StatusCode::CREATED,
        Json(UserSubscriptionAck {
            id,
            message: "User subscription created successfully".to_string(),
        }),
    ))
}

pub async fn get_by_id<T>(
    State(usecase): State<Arc<UserSubscriptionUseCase<T>>>,
    raw_id: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, AppError>
where
    T: UserSubscriptionRepository + Send + Sync,
{
    let id = parse_id(raw_id)?;
    info!(id, "user_subscriptions: get request received");

    let subscription = usecase
        .get_by_id(id)
        .await
        .map_err(|err| AppError::use_case(err, "failed to get user subscription"))?;

    Ok(Json(subscription))
}

pub async fn list_by_user<T>(
    State(usecase): State<Arc<UserSubscriptionUseCase<T>>>,
    query: Result<Query<ListUserSubscriptionsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError>
where
    T: UserSubscriptionRepository + Send + Sync,
{
    let Query(query) = query.map_err(|rejection| {
        warn!(error = %rejection, "user_subscriptions: failed to decode query");
        AppError::BadRequest("invalid query parameters".to_string())
    })?;

    let raw_user_id = match query.user_id.filter(|raw| !raw.is_empty()) {
        Some(raw) => raw,
        None => {
            warn!("user_subscriptions: user_id missing from query");
            return Err(AppError::BadRequest(
                "user_id is required in query parameters".to_string(),
            ));
        }
    };

    let user_id = Uuid::parse_str(&raw_user_id).map_err(|err| {
        warn!(error = %err, "user_subscriptions: user_id is not a UUID");
        AppError::BadRequest("invalid user_id format (must be a valid UUID)".to_string())
    })?;
    info!(%user_id, "user_subscriptions: list request received");

    let subscriptions = usecase
        .list_by_user(user_id)
        .await
        .map_err(|err| AppError::use_case(err, "failed to get user subscriptions list"))?;

    Ok(Json(subscriptions))
}

pub async fn update_by_id<T>(
    State(usecase): State<Arc<UserSubscriptionUseCase<T>>>,
    raw_id: Result<Path<String>, PathRejection>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError>
where
    T: UserSubscriptionRepository + Send + Sync,
{
    let id = parse_id(raw_id)?;
    let mut request: UpdateUserSubscriptionRequest = decode_body(&body)?;
    request.id = id;
    info!(id, "user_subscriptions: update request received");

    let (id, draft) = request.into_draft().map_err(reject)?;
    let subscription = usecase
        .update_by_id(id, draft)
        .await
        .map_err(|err| AppError::use_case(err, "failed to update subscription"))?;

    // 201 rather than 200 is what existing clients expect here.
    Ok((StatusCode::CREATED, Json(subscription)))
}

pub async fn delete_by_id<T>(
    State(usecase): State<Arc<UserSubscriptionUseCase<T>>>,
    raw_id: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, AppError>
where
    T: UserSubscriptionRepository + Send + Sync,
{
    let id = parse_id(raw_id)?;
    info!(id, "user_subscriptions: delete request received");

    usecase
        .delete_by_id(id)
        .await
        .map_err(|err| AppError::use_case(err, "failed to delete user subscription"))?;

    Ok(Json(UserSubscriptionAck {
        id,
        message: "user subscription successfully deleted".to_string(),
    }))
}

/// `GET` with a JSON body; the content type is not enforced.
pub async fn total_cost<T>(
    State(usecase): State<Arc<UserSubscriptionUseCase<T>>>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError>
where
    T: UserSubscriptionRepository + Send + Sync,
{
    let request: TotalCostRequest = decode_body(&body)?;
    info!(service_name = %request.service_name, "user_subscriptions: total cost request received");

    let filter = request.into_filter().map_err(reject)?;
    let total_cost = usecase
        .total_cost(filter)
        .await
        .map_err(|err| AppError::use_case(err, "failed to get total cost"))?;

    Ok(Json(TotalCostResponse { total_cost }))
}

fn decode_body<B: DeserializeOwned>(body: &Bytes) -> Result<B, AppError> {
    serde_json::from_slice(body).map_err(|err| {
        warn!(error = %err, "user_subscriptions: failed to decode request body");
        AppError::BadRequest("invalid request body".to_string())
    })
}

fn parse_id(raw_id: Result<Path<String>, PathRejection>) -> Result<i64, AppError> {
    let invalid = || AppError::BadRequest("invalid user subscription ID".to_string());

    let Path(raw_id) = raw_id.map_err(|rejection| {
        warn!(error = %rejection, "user_subscriptions: failed to extract id");
        invalid()
    })?;

    raw_id.parse::<i64>().map_err(|err| {
        warn!(raw_id = %raw_id, error = %err, "user_subscriptions: failed to parse id");
        invalid()
    })
}

fn reject(rejection: RequestRejection) -> AppError {
    warn!(error = %rejection, "user_subscriptions: invalid request");
    match rejection {
        RequestRejection::Period(err) => AppError::BadRequest(format!("invalid request body: {err}")),
        RequestRejection::Fields(message) => {
            AppError::BadRequest(format!("invalid request: {message}"))
        }
    }
}
