//! REST API implementation.
//!
//! # Examples
//!
//! Health check.
//!
//! ```rust
//! # tokio_test::block_on(async {
//! # let url = items_api::server::spawn_app().await;
//! let response = reqwest::get(format!("{}/", url)).await.unwrap();
//! assert_eq!(200, response.status());
//! assert_eq!("Backend is running!", response.text().await.unwrap());
//! # });
//! ```
//!
//! Create an item, then read it.
//!
//! ```rust
//! # use items_api::feature::item::item_api::CreatedItem;
//! # use items_api::feature::item::item_repository::Item;
//! # tokio_test::block_on(async {
//! # let url = items_api::server::spawn_app().await;
//! let client = reqwest::ClientBuilder::default().build().unwrap();
//! let response = client
//!     .post(format!("{}/items", url))
//!     .json(&serde_json::json!({ "name": "Foo" }))
//!     .send()
//!     .await
//!     .unwrap();
//! assert_eq!(201, response.status());
//! let created = response.json::<CreatedItem>().await.unwrap();
//! let item = reqwest::get(format!("{}/items/{}", url, created.id))
//!     .await
//!     .unwrap()
//!     .json::<Item>()
//!     .await
//!     .unwrap();
//! assert_eq!(Some("Foo".to_string()), item.name);
//! # });
//! ```

use crate::feature::health::health_api;
use crate::feature::item::item_api;
use crate::infra::{
    config::{Config, ServerConfig},
    database::DocumentDb,
    error::{InternalError, PanicHandler},
    extract::Json,
    middleware::{log_request_response, MakeRequestIdSpan},
    openapi::ApiDoc,
    state::AppState,
};
use axum::{error_handling::HandleErrorLayer, response::IntoResponse, routing::get, Router};
use http::header::AUTHORIZATION;
use std::iter::once;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    sensitive_headers::SetSensitiveRequestHeadersLayer,
    timeout::TimeoutLayer,
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;
use utoipa_redoc::{Redoc, Servable};

/// Constructs the REST API without middleware.
pub fn rest_api(state: AppState) -> Router {
    Router::new()
        .merge(health_api::routes())
        .merge(item_api::routes())
        .with_state(state)
}

async fn serve_api() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Constructs the full axum application.
pub fn app(state: AppState, config: &ServerConfig) -> Router {
    // Fallible middleware from tower, mapped to infallible response with [`HandleErrorLayer`].
    let tower_middleware = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|e| async move {
            InternalError::Other(format!("Tower middleware failed: {e}")).into_response()
        }))
        .concurrency_limit(config.concurrency_limit);

    Router::new()
        .route("/api/openapi.json", get(serve_api))
        .merge(Redoc::with_url("/api/redoc", ApiDoc::openapi()))
        .merge(RapiDoc::new("/api/openapi.json").path("/api/rapidoc"))
        .merge(rest_api(state))
        // Layers
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(axum::middleware::from_fn(log_request_response))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(MakeRequestIdSpan)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO))
                .on_failure(()),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(SetSensitiveRequestHeadersLayer::new(once(AUTHORIZATION)))
        .layer(CorsLayer::permissive())
        .layer(tower_middleware)
        .layer(CatchPanicLayer::custom(PanicHandler))
}

/// Starts the axum server.
pub async fn run_app(listener: TcpListener, db: DocumentDb, config: Config) -> std::io::Result<()> {
    let state = AppState::new(db, &config);
    let app = app(state, &config.server);

    tracing::info!("Starting axum on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown())
        .await?;
    tracing::info!("Successfully shut down");
    Ok(())
}

/// Completes when ctrl-c is pressed.
pub(crate) async fn shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to fetch ctrl_c: {}", e);
    }
    tracing::info!("Shutting down");
}

/// Spawn a server on a random port with an empty in-memory store.
pub async fn spawn_app() -> String {
    let config = Config::default();
    let db = crate::infra::database::init_db(&config.database);
    spawn_app_with_db(db).await
}

/// Spawn a server on a random port with a custom document store.
pub async fn spawn_app_with_db(db: DocumentDb) -> String {
    let address = "127.0.0.1";
    let listener = TcpListener::bind(format!("{address}:0")).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(run_app(listener, db, Config::default()));
    format!("http://{address}:{port}")
}
