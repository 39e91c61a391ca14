use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use oilwatch_core::error::{self, ApiError, CycleError, StoreError, ValidationError};

/// Internal error type that converts to structured API responses
#[derive(Debug)]
pub enum AppError {
    /// Validation error (400)
    Validation {
        message: String,
        field: Option<String>,
        received: Option<serde_json::Value>,
        docs_hint: Option<String>,
    },
    /// Resource not found (404)
    NotFound { resource: String },
    /// The base estimator could not score the sample (502)
    Upstream(String),
    /// History store failure (500)
    Store(StoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::now_v7().to_string();

        let (status, api_error) = match self {
            AppError::Validation {
                message,
                field,
                received,
                docs_hint,
            } => (
                StatusCode::BAD_REQUEST,
                ApiError {
                    error: error::codes::VALIDATION_FAILED.to_string(),
                    message,
                    field,
                    received,
                    request_id,
                    docs_hint,
                },
            ),
            AppError::NotFound { resource } => (
                StatusCode::NOT_FOUND,
                ApiError {
                    error: error::codes::NOT_FOUND.to_string(),
                    message: format!("{resource} not found"),
                    field: None,
                    received: None,
                    request_id,
                    docs_hint: None,
                },
            ),
            AppError::Upstream(msg) => {
                tracing::error!("Base estimator failed: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    ApiError {
                        error: error::codes::UPSTREAM_FAILED.to_string(),
                        message: "The base estimator could not score this sample".to_string(),
                        field: None,
                        received: None,
                        request_id,
                        docs_hint: Some(
                            "Nothing was recorded. Retry once the estimator is available."
                                .to_string(),
                        ),
                    },
                )
            }
            AppError::Store(err) => {
                tracing::error!("History store error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError {
                        error: error::codes::INTERNAL_ERROR.to_string(),
                        message: "An internal error occurred".to_string(),
                        field: None,
                        received: None,
                        request_id,
                        docs_hint: None,
                    },
                )
            }
        };

        (status, Json(api_error)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation {
            message: err.message,
            field: Some(err.field),
            received: err.received,
            docs_hint: Some(
                "A sample needs oil_hrs, total_hrs (>= 0), viscosity_40 (> 0) and boolean \
                 service_performed / topup_performed."
                    .to_string(),
            ),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<CycleError> for AppError {
    fn from(err: CycleError) -> Self {
        match err {
            CycleError::Validation(err) => err.into(),
            CycleError::Estimator(err) => AppError::Upstream(err.to_string()),
            CycleError::Store(err) => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use oilwatch_core::error::{CycleError, EstimatorError, StoreError, ValidationError};

    use super::AppError;

    #[test]
    fn cycle_errors_map_to_status_codes() {
        let cases = [
            (
                CycleError::Validation(ValidationError::new("oil_hrs", "must be >= 0")),
                StatusCode::BAD_REQUEST,
            ),
            (
                CycleError::Estimator(EstimatorError::Unavailable("no model".to_string())),
                StatusCode::BAD_GATEWAY,
            ),
            (
                CycleError::Store(StoreError::Backend("down".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
