use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, put},
};
use serde::Serialize;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};

use quotebook_core::db::Database;
use quotebook_core::error::QuoteError;
use quotebook_core::models::{Quote, validate_quote_input};
use quotebook_core::store::QuoteStore;

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

/// Shared state for the mock remote endpoint.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<Mutex<QuoteStore<Database>>>,
}

impl AppState {
    fn store(&self) -> MutexGuard<'_, QuoteStore<Database>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    BadRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(err) => {
                error!("internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<QuoteError> for ApiError {
    fn from(err: QuoteError) -> Self {
        match err {
            QuoteError::Validation(msg) | QuoteError::MalformedImport(msg) => Self::BadRequest(msg),
            QuoteError::Network(msg) => Self::Internal(anyhow::anyhow!(msg)),
            QuoteError::Storage(err) => Self::Internal(err),
        }
    }
}

// --- Middleware ---

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Handlers ---

async fn list_quotes(State(state): State<AppState>) -> Json<Vec<Quote>> {
    Json(state.store().quotes().to_vec())
}

async fn create_quote(
    State(state): State<AppState>,
    Json(mut quote): Json<Quote>,
) -> Result<(StatusCode, Json<Quote>), ApiError> {
    let (text, category) = validate_quote_input(&quote.text, &quote.category)?;
    let now = chrono::Utc::now().timestamp_millis();
    quote.text = text;
    quote.category = category;
    quote.id = quote.id.or(Some(now));
    quote.updated_at = quote.updated_at.or(Some(now));

    state.store().import_many(vec![quote.clone()])?;
    info!(id = ?quote.id, "stored pushed quote");
    Ok((StatusCode::CREATED, Json(quote)))
}

/// Edit a quote server-side, stamping it newer than any client copy.
async fn update_quote(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(quote): Json<Quote>,
) -> Result<Json<Quote>, ApiError> {
    let (text, category) = validate_quote_input(&quote.text, &quote.category)?;
    let updated = Quote::new(id, text, category, chrono::Utc::now().timestamp_millis());

    let mut store = state.store();
    store.merge_remote(vec![updated])?;
    let stored = store
        .quotes()
        .iter()
        .find(|q| q.id == Some(id))
        .cloned()
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("quote {id} missing after update")))?;
    Ok(Json(stored))
}

// --- Router builder ---

pub(crate) fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/quotes", get(list_quotes).post(create_quote))
        .route("/quotes/{id}", put(update_quote))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(
    store: QuoteStore<Database>,
    port: u16,
    bind: &str,
) -> anyhow::Result<()> {
    let count = store.len();
    let state = AppState {
        store: Arc::new(Mutex::new(store)),
    };
    let app = build_router(state);

    if bind != "127.0.0.1" && bind != "localhost" {
        eprintln!(
            "Warning: Listening on {bind}. Any device on your network can read and write quotes."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    info!(count, "mock remote endpoint ready");
    eprintln!("Listening on http://{bind}:{port}/quotes");
    axum::serve(listener, app).await?;

    Ok(())
}
