use thiserror::Error;

use crate::domain::{BookId, BorrowerId, IssueBookError, ReturnBookError, ValidationError};

/// アプリケーション層のエラー
///
/// ドメイン上の失敗（想定内の結果）と、永続化層の失敗（`Storage`）を区別する。
/// 永続化層の失敗をドメインのエラーに読み替えてはならない。
#[derive(Debug, Error)]
pub enum LibraryError {
    /// 書籍が存在しない
    #[error("Book {} not found", .0.value())]
    BookNotFound(BookId),

    /// 利用者が存在しない
    #[error("Borrower {} not found", .0.value())]
    BorrowerNotFound(BorrowerId),

    /// 貸出可能な冊数がない
    #[error("No copies available")]
    NoCopiesAvailable,

    /// 貸出上限（2冊）に達している
    #[error("Loan limit reached (max 2 books)")]
    LoanLimitReached,

    /// 同じ書籍を既に借りている
    #[error("Borrower has already issued this book")]
    DuplicateLoan,

    /// 返却対象の貸出がない
    #[error("Borrower has not issued this book")]
    LoanNotFound,

    /// 入力値が不正
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// 永続化層のエラー
    #[error("Storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<IssueBookError> for LibraryError {
    fn from(err: IssueBookError) -> Self {
        match err {
            IssueBookError::NoCopiesAvailable => LibraryError::NoCopiesAvailable,
            IssueBookError::LoanLimitReached => LibraryError::LoanLimitReached,
            IssueBookError::DuplicateLoan => LibraryError::DuplicateLoan,
        }
    }
}

impl From<ReturnBookError> for LibraryError {
    fn from(err: ReturnBookError) -> Self {
        match err {
            ReturnBookError::LoanNotFound => LibraryError::LoanNotFound,
        }
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, LibraryError>;
