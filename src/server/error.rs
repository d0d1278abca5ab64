use crate::media::MediaError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Error response. `/info` reports under `"error"`, the download routes
/// under `"detail"`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    key: &'static str,
    message: String,
}

impl ApiError {
    pub fn info(err: MediaError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            key: "error",
            message: err.message().to_string(),
        }
    }

    pub fn detail(err: MediaError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            key: "detail",
            message: err.message().to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = serde_json::Map::new();
        body.insert(self.key.to_string(), self.message.into());
        (self.status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
