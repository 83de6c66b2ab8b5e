use crate::{
    axum_http::{default_routers, error_responses::error_response, routers},
    config::config_model::{BackendServer, DotEnvyConfig},
};
use anyhow::{Context, Result};
use axum::{
    Router,
    extract::Request,
    http::{
        HeaderName, Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    response::Response,
    routing::get,
};
use crates::infra::db::postgres::postgres_connection::PgPoolSquad;
use std::{any::Any, net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{self, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, info_span};

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn app(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<Router> {
    let routes = Router::new()
        .nest(
            "/subscriptions",
            routers::user_subscriptions::routes(Arc::clone(&db_pool), Arc::clone(&config)),
        )
        .route("/health-check", get(default_routers::health_check));

    with_layers(routes, &config.backend_server)
}

/// Adds the fallback and the middleware stack shared by every route.
pub fn with_layers(routes: Router, server: &BackendServer) -> Result<Router> {
    let body_limit: usize = server
        .body_limit
        .checked_mul(1024 * 1024)
        .and_then(|bytes| usize::try_from(bytes).ok())
        .context("SERVER_BODY_LIMIT does not fit in memory")?;

    let app = routes
        .fallback(default_routers::not_found)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(server.timeout),
        ))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([
                    AUTHORIZATION,
                    CONTENT_TYPE,
                    HeaderName::from_static(REQUEST_ID_HEADER),
                ])
                .allow_origin(cors::Any),
        )
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or_default();

                info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id,
                )
            }),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    Ok(app)
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("non-string panic payload");
    error!(panic = detail, "request handler panicked");

    error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
}

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<()> {
    let app = app(Arc::clone(&config), db_pool)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Server is running on port {}", config.backend_server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
