// REST API with Axum
// Thin HTTP layer over the store, importer and aggregator

use crate::analytics::{compute_analytics, Analytics};
use crate::config::AppConfig;
use crate::db::{Transaction, TransactionStore};
use crate::error::{LedgerError, Result};
use crate::ingest::Importer;
use crate::query::{ListEnvelope, PageRequest};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<TransactionStore>>,
    config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: TransactionStore, config: AppConfig) -> Self {
        AppState {
            store: Arc::new(Mutex::new(store)),
            config: Arc::new(config),
        }
    }

    fn with_store<T>(&self, f: impl FnOnce(&TransactionStore) -> Result<T>) -> Result<T> {
        let store = self
            .store
            .lock()
            .map_err(|_| LedgerError::Storage("transaction store lock poisoned".to_string()))?;
        f(&store)
    }
}

// ============================================================================
// Error responses
// ============================================================================

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = match &self {
            LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::Validation { .. } => StatusCode::BAD_REQUEST,
            LedgerError::Parse { .. } | LedgerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let mut body = json!({ "error": self.headline() });
        if let Some(details) = self.details() {
            body["details"] = json!(details);
        }
        if let LedgerError::Validation { path: Some(path), .. } = &self {
            body["path"] = json!(path);
        }

        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Request / response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListParams {
    page: Option<String>,
    limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(rename = "searchTerm")]
    search_term: Option<String>,
    page: Option<String>,
    limit: Option<String>,
}

#[derive(Serialize)]
struct AnalyticsResponse {
    message: &'static str,
    #[serde(flatten)]
    analytics: Analytics,
}

#[derive(Serialize)]
struct ImportResponse {
    message: &'static str,
    inserted: usize,
    skipped_duplicates: usize,
    import_id: String,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": crate::VERSION }))
}

/// GET /api/transactions?page=&limit=
async fn list_transactions(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListEnvelope<Transaction>>> {
    let page = PageRequest::from_params(
        params.page.as_deref(),
        params.limit.as_deref(),
        state.config.default_page_size,
    );

    let (rows, total) = state.with_store(|store| store.list(page))?;
    // A page past the end is still a 200 carrying the totals
    if total == 0 {
        return Err(LedgerError::not_found("No transactions found"));
    }

    Ok(Json(ListEnvelope::new(
        "Transactions retrieved successfully",
        rows,
        total,
        page,
    )))
}

/// GET /api/transactions/search?searchTerm=&page=&limit=
async fn search_transactions(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ListEnvelope<Transaction>>> {
    let term = params
        .search_term
        .filter(|t| !t.is_empty())
        .ok_or_else(|| LedgerError::validation("searchTerm is required"))?;

    let page = PageRequest::from_params(
        params.page.as_deref(),
        params.limit.as_deref(),
        state.config.default_page_size,
    );

    let (rows, total) = state.with_store(|store| store.search(&term, page))?;
    if total == 0 {
        return Err(LedgerError::not_found(format!("No transactions found for {}.", term)));
    }

    Ok(Json(ListEnvelope::new(
        format!("Search results for {} retrieved successfully", term),
        rows,
        total,
        page,
    )))
}

/// GET /api/transactions/analytics
async fn get_analytics(State(state): State<AppState>) -> Result<Json<AnalyticsResponse>> {
    let analytics = state.with_store(compute_analytics)?;

    if !analytics.is_consistent() {
        // Only possible if rows were inserted between the count and the grouped query
        warn!(total = analytics.total_count, "analytics snapshot raced with an import");
    }

    Ok(Json(AnalyticsResponse {
        message: "Analytics data retrieved successfully",
        analytics,
    }))
}

/// GET /api/transactions/:id - lookup by storage key
async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Transaction>> {
    let not_found = || LedgerError::not_found("Transaction not found");

    let id: i64 = id.parse().map_err(|_| not_found())?;
    state
        .with_store(|store| store.get(id))?
        .map(Json)
        .ok_or_else(not_found)
}

/// POST /api/transactions/import-xml - import the configured export file
async fn import_xml(State(state): State<AppState>) -> Result<Json<ImportResponse>> {
    let path = state.config.sms_xml_path.clone();
    let dedup = state.config.dedup_policy();

    // File parsing and the batch insert are blocking work
    let summary = tokio::task::spawn_blocking(move || {
        state.with_store(|store| Importer::new(store).with_dedup(dedup).import_file(&path))
    })
    .await
    .map_err(|e| LedgerError::Storage(format!("import task failed: {}", e)))??;

    Ok(Json(ImportResponse {
        message: "XML Data processed",
        inserted: summary.inserted,
        skipped_duplicates: summary.skipped_duplicates,
        import_id: summary.import_id,
    }))
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/transactions", get(list_transactions))
        .route("/transactions/search", get(search_transactions))
        .route("/transactions/analytics", get(get_analytics))
        .route("/transactions/import-xml", post(import_xml))
        .route("/transactions/:id", get(get_transaction))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
