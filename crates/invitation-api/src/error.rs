use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use invitation_types::api::ErrorResponse;
use invitation_types::models::GuestbookError;

use crate::google::GoogleError;

/// Handler failures. Each maps to a fixed status and a message safe to show
/// to guests.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("파일이 필요합니다")]
    MissingFile,

    #[error("파일 크기는 {max_mb}MB를 초과할 수 없습니다")]
    FileTooLarge { max_mb: usize },

    #[error("{accepted} 파일만 업로드 가능합니다")]
    UnsupportedType { accepted: &'static str },

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Guestbook(#[from] GuestbookError),

    #[error("{0}")]
    NotFound(String),

    #[error("먼저 Google 계정으로 로그인해주세요")]
    NotAuthenticated,

    #[error("Google 로그인이 만료되었습니다. 다시 로그인해주세요")]
    GoogleSessionExpired,

    #[error("{0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFile
            | ApiError::FileTooLarge { .. }
            | ApiError::UnsupportedType { .. }
            | ApiError::BadRequest(_)
            | ApiError::Guestbook(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::NotAuthenticated | ApiError::GoogleSessionExpired => StatusCode::UNAUTHORIZED,
            ApiError::Upstream(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn user_message(&self) -> String {
        match self {
            ApiError::Internal(_) => "서버 오류가 발생했습니다. 다시 시도해주세요".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<GoogleError> for ApiError {
    fn from(e: GoogleError) -> Self {
        match e.status() {
            Some(401) | Some(403) => {
                warn!("Google rejected credentials: {}", e);
                ApiError::GoogleSessionExpired
            }
            Some(413) => ApiError::Upstream("파일이 너무 커서 Google에 업로드할 수 없습니다".into()),
            _ => {
                error!("Google request failed: {}", e);
                ApiError::Upstream("업로드 중 오류가 발생했습니다".into())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("잘못된 요청입니다: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(format!("잘못된 요청입니다: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Internal(e) = &self {
            error!("Internal error: {:#}", e);
        }

        (
            status,
            Json(ErrorResponse {
                error: self.user_message(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(ApiError::FileTooLarge { max_mb: 10 }.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(GuestbookError::EmptyName).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotAuthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("disk on fire")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_details_stay_private() {
        let e = ApiError::Internal(anyhow::anyhow!("disk on fire"));
        assert!(!e.user_message().contains("disk"));
        assert_eq!(
            ApiError::FileTooLarge { max_mb: 10 }.user_message(),
            "파일 크기는 10MB를 초과할 수 없습니다"
        );
    }

    #[test]
    fn google_statuses_map_to_guest_messages() {
        let expired = ApiError::from(GoogleError::Status { status: 401, body: String::new() });
        assert!(matches!(expired, ApiError::GoogleSessionExpired));

        let other = ApiError::from(GoogleError::Status { status: 502, body: String::new() });
        assert_eq!(other.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
