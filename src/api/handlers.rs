use crate::application::catalogue;
use crate::application::lending::{self, ServiceDependencies};
use crate::application::LibraryError;
use crate::domain::commands::{BorrowerRef, IssueBook, ReturnBook};
use crate::domain::value_objects::{BookId, BorrowerId};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use uuid::Uuid;

use super::{
    error::ApiError,
    types::{
        BookResponse, BorrowerContactRequest, BorrowerResponse, CreateBookRequest,
        HolderResponse, LendingResponse, UpdateBookRequest,
    },
};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub service_deps: ServiceDependencies,
}

// ============================================================================
// Books
// ============================================================================

/// POST /api/books - 書籍を登録
pub async fn create_book(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBookRequest>,
) -> Result<(StatusCode, Json<BookResponse>), ApiError> {
    let new_book = req.to_new_book().map_err(LibraryError::from)?;
    let book = catalogue::create_book(&state.service_deps, new_book, chrono::Utc::now()).await?;

    Ok((StatusCode::CREATED, Json(book.into())))
}

/// GET /api/books - 書籍一覧
pub async fn list_books(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<BookResponse>>, ApiError> {
    let books = catalogue::list_books(&state.service_deps).await?;
    Ok(Json(books.into_iter().map(BookResponse::from).collect()))
}

/// GET /api/books/:id - 書籍詳細
pub async fn get_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = catalogue::get_book(&state.service_deps, BookId::from_uuid(book_id)).await?;
    Ok(Json(book.into()))
}

/// PUT /api/books/:id - 書籍情報を更新
///
/// 更新後に貸出可能冊数が所蔵冊数を超える場合は400を返す。
pub async fn update_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
    Json(req): Json<UpdateBookRequest>,
) -> Result<Json<BookResponse>, ApiError> {
    let changes = req.to_changes().map_err(LibraryError::from)?;
    let book = catalogue::update_book(
        &state.service_deps,
        BookId::from_uuid(book_id),
        changes,
        chrono::Utc::now(),
    )
    .await?;

    Ok(Json(book.into()))
}

/// DELETE /api/books/:id - 書籍を削除
pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = catalogue::delete_book(&state.service_deps, BookId::from_uuid(book_id)).await?;
    Ok(Json(book.into()))
}

// ============================================================================
// Lending
// ============================================================================

/// PUT /api/books/issue/:book_id - 連絡先を指定して書籍を貸し出す
///
/// メールアドレスが未登録の場合は利用者を登録してから貸し出す。
///
/// 強制されるビジネスルール:
/// - 貸出可能な冊数が残っていること
/// - 利用者の貸出数が上限（2冊）未満であること
/// - 同じ書籍を重複して借りないこと
pub async fn issue_book_to_contact(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
    Json(req): Json<BorrowerContactRequest>,
) -> Result<Json<LendingResponse>, ApiError> {
    let cmd = IssueBook {
        book_id: BookId::from_uuid(book_id),
        borrower: BorrowerRef::Contact {
            name: req.name,
            email: req.email,
        },
        issued_at: chrono::Utc::now(),
    };

    let outcome = lending::issue_book(&state.service_deps, cmd).await?;
    Ok(Json(LendingResponse::new("Book issued successfully", outcome)))
}

/// PUT /api/books/issue/:book_id/:borrower_id - 登録済みの利用者に書籍を貸し出す
pub async fn issue_book_to_borrower(
    State(state): State<Arc<AppState>>,
    Path((book_id, borrower_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<LendingResponse>, ApiError> {
    let cmd = IssueBook {
        book_id: BookId::from_uuid(book_id),
        borrower: BorrowerRef::Existing(BorrowerId::from_uuid(borrower_id)),
        issued_at: chrono::Utc::now(),
    };

    let outcome = lending::issue_book(&state.service_deps, cmd).await?;
    Ok(Json(LendingResponse::new("Book issued successfully", outcome)))
}

/// PUT /api/books/return/:book_id/:borrower_id - 書籍を返却
pub async fn return_book(
    State(state): State<Arc<AppState>>,
    Path((book_id, borrower_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<LendingResponse>, ApiError> {
    let cmd = ReturnBook {
        book_id: BookId::from_uuid(book_id),
        borrower_id: BorrowerId::from_uuid(borrower_id),
        returned_at: chrono::Utc::now(),
    };

    let outcome = lending::return_book(&state.service_deps, cmd).await?;
    Ok(Json(LendingResponse::new("Book returned successfully", outcome)))
}

/// GET /api/books/:id/issuedBy - 書籍を借りている利用者の一覧
pub async fn list_holders(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<Vec<HolderResponse>>, ApiError> {
    let holders = lending::list_holders(&state.service_deps, BookId::from_uuid(book_id)).await?;
    Ok(Json(holders.into_iter().map(HolderResponse::from).collect()))
}

// ============================================================================
// Users
// ============================================================================

/// POST /api/users - 利用者を登録
pub async fn create_borrower(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BorrowerContactRequest>,
) -> Result<(StatusCode, Json<BorrowerResponse>), ApiError> {
    let borrower = catalogue::register_borrower(
        &state.service_deps,
        &req.name,
        &req.email,
        chrono::Utc::now(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(borrower.into())))
}

/// GET /api/users - 利用者一覧
pub async fn list_borrowers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<BorrowerResponse>>, ApiError> {
    let borrowers = catalogue::list_borrowers(&state.service_deps).await?;
    Ok(Json(
        borrowers.into_iter().map(BorrowerResponse::from).collect(),
    ))
}

/// GET /api/users/:id - 利用者詳細
pub async fn get_borrower(
    State(state): State<Arc<AppState>>,
    Path(borrower_id): Path<Uuid>,
) -> Result<Json<BorrowerResponse>, ApiError> {
    let borrower =
        catalogue::get_borrower(&state.service_deps, BorrowerId::from_uuid(borrower_id)).await?;
    Ok(Json(borrower.into()))
}

/// DELETE /api/users/:id - 利用者を削除
pub async fn delete_borrower(
    State(state): State<Arc<AppState>>,
    Path(borrower_id): Path<Uuid>,
) -> Result<Json<BorrowerResponse>, ApiError> {
    let borrower =
        catalogue::delete_borrower(&state.service_deps, BorrowerId::from_uuid(borrower_id))
            .await?;
    Ok(Json(borrower.into()))
}
