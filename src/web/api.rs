//! Defines the Axum API routes and handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::attributes::{Attribute, AttributeSet};
use crate::document::SimpleDoc;
use crate::management::{ManagementDirectory, PrinterManagement};
use crate::printer::PrinterStatus;
use crate::registry::PrinterRegistry;
use crate::test_page::TestPage;
use crate::web::models::{
    ApiError, DefaultPrinterResponse, PrinterListResponse, PrinterNameRequest, TestPageResponse,
};

/// Registry for reads and membership changes, management handles for
/// everything an operator does to one printer.
#[derive(Clone)]
pub struct AppState {
    pub registry: PrinterRegistry,
    pub management: Arc<ManagementDirectory>,
}

/// Creates the Axum router with all the API endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/printers", get(list_printers).post(add_printer))
        .route("/api/v1/printers/{name}", get(get_printer).delete(remove_printer))
        .route("/api/v1/printers/{name}/suspend", post(suspend_printer))
        .route("/api/v1/printers/{name}/activate", post(activate_printer))
        .route("/api/v1/printers/{name}/reset-statistics", post(reset_statistics))
        .route("/api/v1/printers/{name}/test-page", post(print_test_page))
        .route("/api/v1/default-printer", get(get_default_printer).put(set_default_printer))
        .with_state(state)
}

fn handle(state: &AppState, name: &str) -> Result<Arc<dyn PrinterManagement>, ApiError> {
    state
        .management
        .lookup(name)
        .ok_or_else(|| ApiError::unknown_printer(name))
}

fn status_of(state: &AppState, name: &str) -> Result<PrinterStatus, ApiError> {
    state
        .registry
        .printer(name)
        .map(|printer| printer.status())
        .ok_or_else(|| ApiError::unknown_printer(name))
}

async fn list_printers(State(state): State<AppState>) -> Json<PrinterListResponse> {
    Json(PrinterListResponse {
        default_printer: state.registry.default_printer_name(),
        printers: state.registry.printers().iter().map(|p| p.status()).collect(),
    })
}

async fn add_printer(
    State(state): State<AppState>,
    Json(request): Json<PrinterNameRequest>,
) -> Result<(StatusCode, Json<PrinterStatus>), ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Printer name must not be empty".into()));
    }
    if !state.registry.add_printer(name) {
        return Err(ApiError::Conflict(format!("Printer '{}' already exists", name)));
    }
    Ok((StatusCode::CREATED, Json(status_of(&state, name)?)))
}

async fn get_printer(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<PrinterStatus>, ApiError> {
    Ok(Json(status_of(&state, &name)?))
}

async fn remove_printer(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    handle(&state, &name)?.remove();
    Ok(StatusCode::NO_CONTENT)
}

async fn suspend_printer(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<PrinterStatus>, ApiError> {
    handle(&state, &name)?.suspend();
    Ok(Json(status_of(&state, &name)?))
}

async fn activate_printer(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<PrinterStatus>, ApiError> {
    handle(&state, &name)?.activate();
    Ok(Json(status_of(&state, &name)?))
}

async fn reset_statistics(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<PrinterStatus>, ApiError> {
    handle(&state, &name)?.reset_statistics();
    Ok(Json(status_of(&state, &name)?))
}

/// Printing is synchronous, so the job runs on the blocking pool.
async fn print_test_page(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<TestPageResponse>, ApiError> {
    let printer = state
        .registry
        .printer(&name)
        .ok_or_else(|| ApiError::unknown_printer(&name))?;
    let response = tokio::task::spawn_blocking(move || {
        let job = printer.create_job();
        let document = SimpleDoc::printable(Arc::new(TestPage::new(printer.name())), None);
        let request = AttributeSet::new().with(Attribute::JobName("Test Page".into()));
        job.submit(&document, Some(&request))
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        Ok::<_, ApiError>(TestPageResponse {
            job_id: job.id().clone(),
            state: job.state(),
        })
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;
    Ok(Json(response))
}

async fn get_default_printer(State(state): State<AppState>) -> Json<DefaultPrinterResponse> {
    Json(DefaultPrinterResponse {
        name: state.registry.default_printer_name(),
    })
}

async fn set_default_printer(
    State(state): State<AppState>,
    Json(request): Json<PrinterNameRequest>,
) -> Result<StatusCode, ApiError> {
    if state.registry.set_default_printer_name(&request.name) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::unknown_printer(&request.name))
    }
}
