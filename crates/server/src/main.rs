//! Stand-in detection service speaking the client's wire contract.
//!
//! It answers every upload with a configured verdict; no image analysis
//! happens here.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{
        legacy_predict_route, predict_route, stored_text_route, PredictResponse,
        StoredTextResponse, UPLOAD_FIELD,
    },
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod app_state;
mod config;

use api::StubContext;
use app_state::AppState;
use config::load_settings;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings();
    let state = AppState {
        stub: StubContext::from_settings(&settings),
        max_upload_bytes: settings.max_upload_bytes,
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings
        .bind_addr
        .parse()
        .with_context(|| format!("invalid bind address '{}'", settings.bind_addr))?;
    info!(%addr, prediction = %settings.prediction, "stub detection service listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    let max_upload_bytes = state.max_upload_bytes;
    Router::new()
        .route("/healthz", get(healthz))
        .route(predict_route(), post(predict))
        .route(legacy_predict_route(), post(predict))
        .route(stored_text_route(), get(stored_text))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn predict(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<PredictResponse> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        upload = Some((file_name, bytes));
    }

    let Some((file_name, bytes)) = upload else {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            ApiError::new(ErrorCode::Validation, "No file uploaded"),
        ));
    };

    info!(
        file_name = file_name.as_deref().unwrap_or("<unnamed>"),
        size_bytes = bytes.len(),
        "predict: upload received"
    );
    state
        .stub
        .classify(&bytes)
        .await
        .map(Json)
        .map_err(|err| api_error(StatusCode::BAD_REQUEST, err))
}

async fn stored_text(State(state): State<Arc<AppState>>) -> ApiResult<StoredTextResponse> {
    state
        .stub
        .stored_text()
        .await
        .map(Json)
        .map_err(|err| api_error(StatusCode::NOT_FOUND, err))
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> (StatusCode, Json<ApiError>) {
    let status = err.status();
    warn!(%status, "predict: rejected multipart body: {err}");
    let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
        ErrorCode::PayloadTooLarge
    } else {
        ErrorCode::Validation
    };
    api_error(status, ApiError::new(code, err.body_text()))
}

fn api_error(status: StatusCode, error: ApiError) -> (StatusCode, Json<ApiError>) {
    (status, Json(error))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
