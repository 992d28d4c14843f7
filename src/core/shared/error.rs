use axum::{http::StatusCode, response::IntoResponse, Json};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Missing rows: {0:?}")]
    MissingIds(Vec<Uuid>),
    #[error("Not configured: {0}")]
    NotConfigured(String),
    #[error("Upstream error: {0}")]
    Upstream(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) | Self::MissingIds(_) => StatusCode::NOT_FOUND,
            Self::NotConfigured(_)
            | Self::Upstream(_)
            | Self::Database(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client. Internal details stay in the log.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(msg) | Self::Forbidden(msg) | Self::NotFound(msg) => msg.clone(),
            Self::Unauthorized(_) => "인증이 필요합니다.".to_string(),
            Self::MissingIds(ids) => format!("{}건의 항목을 찾을 수 없습니다.", ids.len()),
            Self::NotConfigured(service) => format!("{service} 서비스가 설정되지 않았습니다."),
            Self::Upstream(_) => "외부 서비스 호출에 실패했습니다.".to_string(),
            Self::Database(_) => "데이터베이스 처리 중 오류가 발생했습니다.".to_string(),
            Self::Internal(_) => "서버 내부 오류가 발생했습니다.".to_string(),
        }
    }
}

impl From<diesel::result::Error> for ApiError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::NotFound => Self::NotFound("데이터를 찾을 수 없습니다.".to_string()),
            other => Self::Database(other.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for ApiError {
    fn from(e: diesel::r2d2::PoolError) -> Self {
        Self::Database(e.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("{self}");
        } else {
            log::warn!("{self}");
        }

        let body = match &self {
            Self::MissingIds(ids) => serde_json::json!({
                "error": self.public_message(),
                "missing_ids": ids,
            }),
            _ => serde_json::json!({ "error": self.public_message() }),
        };
        (status, Json(body)).into_response()
    }
}
