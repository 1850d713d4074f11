// HTTP error mapping
use crate::application::error::ViewError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    View(#[from] ViewError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::View(ViewError::ViewNotFound(_))
            | Self::View(ViewError::UnknownChart(_))
            | Self::View(ViewError::UnknownSensor(_))
            | Self::View(ViewError::Closed) => StatusCode::NOT_FOUND,
            Self::View(ViewError::AlreadyMounted(_)) | Self::View(ViewError::StreamTaken) => {
                StatusCode::CONFLICT
            }
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::debug!("Request rejected with {}: {}", status, self);

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
