use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tabkeep_sheet::SheetError;
use thiserror::Error;

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: &'static str,
}

/// Error returned by any handler.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Sheet(#[from] SheetError),
    /// The request body was not a table.
    #[error("Expected a table: {0}")]
    BadBody(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadBody(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Sheet(err) => match err.kind() {
                "file_not_found" | "sheet_not_found" => StatusCode::NOT_FOUND,
                "type_error" | "out_of_bounds" => StatusCode::UNPROCESSABLE_ENTITY,
                "sheet_exists" => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::BadBody(_) => "type_error",
            ApiError::Sheet(err) => err.kind(),
        }
    }

    fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
            kind: self.kind(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, kind = self.kind(), "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}
