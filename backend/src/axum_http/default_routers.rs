use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tracing::info;

use super::error_responses::error_response;

pub async fn not_found() -> impl IntoResponse {
    info!("backend router: not_found handler invoked");
    error_response(StatusCode::NOT_FOUND, "route not found")
}

pub async fn health_check() -> impl IntoResponse {
    info!("backend router: health_check handler invoked");
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn not_found_answers_with_json_body() {
        let response = not_found().await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "status": 404, "error": "route not found" }));
    }

    #[tokio::test]
    async fn health_check_is_ok() {
        let response = health_check().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
