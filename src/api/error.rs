use crate::application::LibraryError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーをラップし、HTTPレスポンスへのマッピングを提供する。
#[derive(Debug)]
pub struct ApiError(LibraryError);

impl From<LibraryError> for ApiError {
    fn from(err: LibraryError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match &self.0 {
            // 404 Not Found - 識別子が解決できない
            e @ LibraryError::BookNotFound(_) => {
                (StatusCode::NOT_FOUND, "BOOK_NOT_FOUND", e.to_string())
            }
            e @ LibraryError::BorrowerNotFound(_) => {
                (StatusCode::NOT_FOUND, "BORROWER_NOT_FOUND", e.to_string())
            }

            // 422 Unprocessable Entity - ビジネスルール違反
            e @ LibraryError::NoCopiesAvailable => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "NO_COPIES_AVAILABLE",
                e.to_string(),
            ),
            e @ LibraryError::LoanLimitReached => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "LOAN_LIMIT_REACHED",
                e.to_string(),
            ),
            e @ LibraryError::DuplicateLoan => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "DUPLICATE_LOAN",
                e.to_string(),
            ),
            e @ LibraryError::LoanNotFound => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "LOAN_NOT_FOUND",
                e.to_string(),
            ),

            // 400 Bad Request - 入力値の不正
            LibraryError::Validation(e) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
            }

            // 500 Internal Server Error - システム障害
            // 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
            LibraryError::Storage(e) => {
                tracing::error!(error.cause_chain = ?e, "Storage error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "An unexpected error occurred".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = self.parts();
        let body = Json(ErrorResponse::new(error_type, message));
        (status, body).into_response()
    }
}
