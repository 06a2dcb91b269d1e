use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::lending::{Holder, LendingOutcome};
use crate::domain::{ActiveLoan, Book, BookChanges, Borrower, CopyCount, NewBook, ValidationError};

/// 書籍登録リクエスト（POST /api/books）
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateBookRequest {
    pub title: String,
    pub edition: String,
    pub publisher: String,
    pub publication_year: i32,
    pub total_quantity: i64,
    /// 省略時は`total_quantity`と同じ
    #[serde(default)]
    pub quantity_available: Option<i64>,
}

impl CreateBookRequest {
    pub fn to_new_book(self) -> Result<NewBook, ValidationError> {
        Ok(NewBook {
            title: self.title,
            edition: self.edition,
            publisher: self.publisher,
            publication_year: self.publication_year,
            total_quantity: CopyCount::try_from(self.total_quantity)?,
            quantity_available: self
                .quantity_available
                .map(CopyCount::try_from)
                .transpose()?,
        })
    }
}

/// 書籍更新リクエスト（PUT /api/books/:id）
///
/// 指定された項目のみ更新する。
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub edition: Option<String>,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub total_quantity: Option<i64>,
    pub quantity_available: Option<i64>,
}

impl UpdateBookRequest {
    pub fn to_changes(self) -> Result<BookChanges, ValidationError> {
        Ok(BookChanges {
            title: self.title,
            edition: self.edition,
            publisher: self.publisher,
            publication_year: self.publication_year,
            total_quantity: self.total_quantity.map(CopyCount::try_from).transpose()?,
            quantity_available: self
                .quantity_available
                .map(CopyCount::try_from)
                .transpose()?,
        })
    }
}

/// 利用者の連絡先（POST /api/users、PUT /api/books/issue/:book_id）
///
/// 欠けている項目は空文字として受け取り、アプリケーション層で検証エラーにする。
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BorrowerContactRequest {
    pub name: String,
    pub email: String,
}

/// 書籍レスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct BookResponse {
    pub book_id: Uuid,
    pub title: String,
    pub edition: String,
    pub publisher: String,
    pub publication_year: i32,
    pub total_quantity: u32,
    pub quantity_available: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            book_id: book.book_id.value(),
            title: book.title,
            edition: book.edition,
            publisher: book.publisher,
            publication_year: book.publication_year,
            total_quantity: book.total_quantity.value(),
            quantity_available: book.quantity_available.value(),
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

/// 貸出中の1冊
#[derive(Debug, Serialize, Deserialize)]
pub struct ActiveLoanResponse {
    pub book_id: Uuid,
    pub issue_date: DateTime<Utc>,
}

impl From<ActiveLoan> for ActiveLoanResponse {
    fn from(loan: ActiveLoan) -> Self {
        Self {
            book_id: loan.book_id.value(),
            issue_date: loan.issue_date,
        }
    }
}

/// 利用者レスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct BorrowerResponse {
    pub borrower_id: Uuid,
    pub name: String,
    pub email: String,
    pub active_loans: Vec<ActiveLoanResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Borrower> for BorrowerResponse {
    fn from(borrower: Borrower) -> Self {
        Self {
            borrower_id: borrower.borrower_id.value(),
            name: borrower.name.into(),
            email: borrower.email.into(),
            active_loans: borrower
                .active_loans
                .into_iter()
                .map(ActiveLoanResponse::from)
                .collect(),
            created_at: borrower.created_at,
            updated_at: borrower.updated_at,
        }
    }
}

/// 貸出・返却レスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct LendingResponse {
    pub message: String,
    pub book: BookResponse,
    pub borrower: BorrowerResponse,
}

impl LendingResponse {
    pub fn new(message: impl Into<String>, outcome: LendingOutcome) -> Self {
        Self {
            message: message.into(),
            book: outcome.book.into(),
            borrower: outcome.borrower.into(),
        }
    }
}

/// 書籍を借りている利用者（GET /api/books/:id/issuedBy）
#[derive(Debug, Serialize, Deserialize)]
pub struct HolderResponse {
    pub borrower_id: Uuid,
    pub name: String,
    pub email: String,
    pub issue_date: DateTime<Utc>,
}

impl From<Holder> for HolderResponse {
    fn from(holder: Holder) -> Self {
        Self {
            borrower_id: holder.borrower_id.value(),
            name: holder.name.into(),
            email: holder.email.into(),
            issue_date: holder.issue_date,
        }
    }
}

/// エラーレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
