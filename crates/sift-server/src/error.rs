use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use sift_store::StoreError;
use thiserror::Error;
use tracing::{debug, error};

/// Errors from building or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// Failure of a single request.
///
/// Each variant maps to its own status code, so clients can tell a bad
/// payload, a bad key, a missing document, and a server fault apart.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The create payload was not valid JSON. The store was not called.
    #[error("request body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("document not found: {namespace}/{id}")]
    NotFound { namespace: String, id: String },

    #[error("no route for {0}")]
    NoRoute(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound { .. } | Self::NoRoute(_) => StatusCode::NOT_FOUND,
            Self::Store(StoreError::InvalidKey(_)) => StatusCode::BAD_REQUEST,
            Self::Store(StoreError::StorageFailure(_)) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            debug!(error = %self, %status, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_types::KeyError;

    #[test]
    fn status_mapping_is_disjoint() {
        let decode = ApiError::from(serde_json::from_slice::<serde_json::Value>(b"{").unwrap_err());
        assert_eq!(decode.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let missing = ApiError::NotFound {
            namespace: "products".into(),
            id: "999".into(),
        };
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::NoRoute("/a/b/c".into()).status(), StatusCode::NOT_FOUND);

        let invalid = ApiError::from(StoreError::InvalidKey(KeyError::EmptyId));
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let failure = ApiError::from(StoreError::storage("disk gone"));
        assert_eq!(failure.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let internal = ApiError::Internal("task panicked".into());
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn messages() {
        let missing = ApiError::NotFound {
            namespace: "products".into(),
            id: "999".into(),
        };
        assert_eq!(missing.to_string(), "document not found: products/999");
        let failure = ApiError::from(StoreError::storage("disk gone"));
        assert_eq!(failure.to_string(), "storage failure: disk gone");
    }
}
