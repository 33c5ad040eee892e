//! Types for reporting errors that happened during a request.
//!
//! If your function talks to the document store or validates user input,
//! you likely want to return a [`ApiResult`].

use super::{database::StoreError, extract::Json};
use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::HeaderValue,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tower_http::catch_panic::ResponseForPanic;
use utoipa::ToSchema;

/// A standard error response body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// A description of the error.
    error: String,
    /// When the error happened.
    timestamp: DateTime<Utc>,
}

impl ErrorBody {
    pub(crate) fn new(error: String) -> Self {
        Self {
            error,
            timestamp: Utc::now(),
        }
    }

    /// The error message.
    pub fn error(&self) -> &str {
        self.error.as_ref()
    }

    /// When the error happened.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// An error from our API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// An error caused by the client.
    #[error("{0}")]
    ClientError(#[from] ClientError),
    /// An internal error.
    #[error("{0}")]
    InternalError(#[from] InternalError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::ClientError(e) => e.into_response(),
            ApiError::InternalError(e) => {
                tracing::error!("internal error: {}", e);
                e.into_response()
            }
        }
    }
}

/// The result of calling API-related functions.
pub type ApiResult<T> = Result<T, ApiError>;

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { .. } => ApiError::ClientError(ClientError::NotFound),
            e @ StoreError::VersionMismatch { .. } => {
                ApiError::ClientError(ClientError::Conflict(e.to_string()))
            }
            e => ApiError::InternalError(InternalError::Store(e)),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::InternalError(InternalError::SerdeJsonError(e))
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        let mut invalid_fields = String::new();
        for (k, v) in e.field_errors() {
            let mut codes = String::new();
            for e in v {
                codes += &format!("{},", e.code);
            }
            let codes = codes.trim_end_matches(',');
            invalid_fields += &format!("{k} ({codes}),");
        }
        let invalid_fields = invalid_fields.trim_end_matches(',');
        ApiError::ClientError(ClientError::UnprocessableEntity(format!(
            "invalid field(s): {invalid_fields}"
        )))
    }
}

/// Errors caused by the client.
/// The client can do something to fix these.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Some argument was malformed or out of range.
    #[error("{0}")]
    BadRequest(String),
    /// The item was not found.
    #[error("Item not found")]
    NotFound,
    /// The item changed while we were working on it.
    #[error("{0}")]
    Conflict(String),
    /// Validation errors.
    #[error("{0}")]
    UnprocessableEntity(String),
    /// Custom error.
    #[error("{1}")]
    Custom(StatusCode, String),
}

impl Default for ClientError {
    fn default() -> Self {
        Self::BadRequest("Bad Request".to_string())
    }
}

impl From<JsonRejection> for ClientError {
    fn from(value: JsonRejection) -> Self {
        ClientError::Custom(value.status(), value.body_text())
    }
}

impl From<PathRejection> for ClientError {
    fn from(value: PathRejection) -> Self {
        ClientError::Custom(value.status(), value.body_text())
    }
}

impl IntoResponse for ClientError {
    fn into_response(self) -> axum::response::Response {
        let msg = self.to_string();
        let status = match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Custom(status, _) => status,
        };
        (status, Json(ErrorBody::new(msg))).into_response()
    }
}

/// An internal error.
/// The client cannot do anything about this.
#[derive(Debug, thiserror::Error)]
pub enum InternalError {
    /// The document store failed or timed out.
    #[error("{0}")]
    Store(#[from] StoreError),
    /// Serde json error.
    #[error("serde json error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
    /// Other miscellaneous errors.
    #[error("{0}")]
    Other(String),
}

impl IntoResponse for InternalError {
    fn into_response(self) -> axum::response::Response {
        let message = match self {
            Self::Store(StoreError::Timeout(_)) => "document store timed out",
            Self::Store(_) => "document store error",
            _ => "internal error",
        };
        let mut response = (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody::new(message.to_string())),
        )
            .into_response();
        response
            .headers_mut()
            .insert("Retry-After", HeaderValue::from_static("5"));
        response
    }
}

/// A handler for converting panics into proper responses for the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PanicHandler;

impl ResponseForPanic for PanicHandler {
    type ResponseBody = axum::body::Body;

    fn response_for_panic(
        &mut self,
        _: Box<dyn std::any::Any + Send + 'static>,
    ) -> http::Response<Self::ResponseBody> {
        ApiError::InternalError(InternalError::Other("Panic".to_string())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::time::Duration;

    async fn body_of(response: axum::response::Response) -> ErrorBody {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn store_errors_map_to_the_right_kind() {
        let not_found = StoreError::NotFound {
            collection: "items".to_string(),
            id: "x".to_string(),
        };
        assert!(matches!(
            ApiError::from(not_found),
            ApiError::ClientError(ClientError::NotFound)
        ));
        let conflict = StoreError::VersionMismatch {
            expected: 1,
            actual: 2,
        };
        assert!(matches!(
            ApiError::from(conflict),
            ApiError::ClientError(ClientError::Conflict(_))
        ));
        let timeout = StoreError::Timeout(Duration::from_secs(1));
        assert!(matches!(
            ApiError::from(timeout),
            ApiError::InternalError(InternalError::Store(StoreError::Timeout(_)))
        ));
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let error = ApiError::from(StoreError::Unavailable("secret-host:443 refused".to_string()));
        let response = error.into_response();
        assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, response.status());
        assert_eq!("5", response.headers()["Retry-After"]);
        let body = body_of(response).await;
        assert_eq!("document store error", body.error());
    }

    #[tokio::test]
    async fn not_found_is_404() {
        let response = ApiError::from(ClientError::NotFound).into_response();
        assert_eq!(StatusCode::NOT_FOUND, response.status());
        assert_eq!("Item not found", body_of(response).await.error());
    }

    #[test]
    fn panics_become_500() {
        let response = PanicHandler.response_for_panic(Box::new("boom"));
        assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, response.status());
    }
}
