//! Contains the data models for API requests and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::print_job::{JobId, JobState};
use crate::printer::PrinterStatus;

/// Body of requests that name a printer.
#[derive(Debug, Deserialize, Serialize)]
pub struct PrinterNameRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct PrinterListResponse {
    pub default_printer: Option<String>,
    pub printers: Vec<PrinterStatus>,
}

#[derive(Debug, Serialize)]
pub struct DefaultPrinterResponse {
    pub name: Option<String>,
}

/// Outcome of a submitted test page.
#[derive(Debug, Serialize)]
pub struct TestPageResponse {
    pub job_id: JobId,
    pub state: JobState,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    pub fn unknown_printer(name: &str) -> Self {
        ApiError::NotFound(format!("Unknown printer '{}'", name))
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            ApiError::BadRequest(message)
            | ApiError::NotFound(message)
            | ApiError::Conflict(message) => message,
            ApiError::Internal(message) => {
                tracing::error!("Management request failed: {}", message);
                message
            }
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}
