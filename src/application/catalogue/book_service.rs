use crate::application::lending::ServiceDependencies;
use crate::application::{LibraryError, Result};
use crate::domain::{Book, BookChanges, BookId, NewBook, ValidationError};
use chrono::{DateTime, Utc};

/// 書籍を登録する
///
/// 貸出可能冊数が省略された場合は所蔵冊数と同じにする。
pub async fn create_book(
    deps: &ServiceDependencies,
    new_book: NewBook,
    now: DateTime<Utc>,
) -> Result<Book> {
    let book = Book::register(new_book, now)?;

    let mut unit = deps
        .lending_store
        .begin()
        .await
        .map_err(LibraryError::Storage)?;
    unit.insert_book(&book).await.map_err(LibraryError::Storage)?;
    unit.commit().await.map_err(LibraryError::Storage)?;

    tracing::info!(book_id = %book.book_id.value(), title = %book.title, "book created");
    Ok(book)
}

/// 全書籍を取得する
pub async fn list_books(deps: &ServiceDependencies) -> Result<Vec<Book>> {
    deps.book_repository
        .list()
        .await
        .map_err(LibraryError::Storage)
}

/// IDで書籍を取得する
pub async fn get_book(deps: &ServiceDependencies, book_id: BookId) -> Result<Book> {
    deps.book_repository
        .find_by_id(book_id)
        .await
        .map_err(LibraryError::Storage)?
        .ok_or(LibraryError::BookNotFound(book_id))
}

/// 書籍情報を更新する
///
/// 貸出と同じ作業単位の仕組みで読み書きするため、
/// 同時に行われた貸出・返却による冊数の変更を上書きしない。
/// 更新後に`quantity_available > total_quantity`となる場合は拒否する。
pub async fn update_book(
    deps: &ServiceDependencies,
    book_id: BookId,
    changes: BookChanges,
    now: DateTime<Utc>,
) -> Result<Book> {
    let mut unit = deps
        .lending_store
        .begin()
        .await
        .map_err(LibraryError::Storage)?;

    let book = unit
        .find_book(book_id)
        .await
        .map_err(LibraryError::Storage)?
        .ok_or(LibraryError::BookNotFound(book_id))?;

    let updated = book.apply_changes(changes, now)?;

    unit.save_book(&updated)
        .await
        .map_err(LibraryError::Storage)?;
    unit.commit().await.map_err(LibraryError::Storage)?;

    tracing::info!(book_id = %book_id.value(), "book updated");
    Ok(updated)
}

/// 書籍を削除する
///
/// 貸出中の書籍は削除できない。
///
/// # 戻り値
/// 削除した書籍
pub async fn delete_book(deps: &ServiceDependencies, book_id: BookId) -> Result<Book> {
    let mut unit = deps
        .lending_store
        .begin()
        .await
        .map_err(LibraryError::Storage)?;

    let book = unit
        .find_book(book_id)
        .await
        .map_err(LibraryError::Storage)?
        .ok_or(LibraryError::BookNotFound(book_id))?;

    let holders = unit
        .find_borrowers_holding(book_id)
        .await
        .map_err(LibraryError::Storage)?;
    if !holders.is_empty() {
        return Err(ValidationError::BookOnLoan.into());
    }

    if !unit
        .delete_book(book_id)
        .await
        .map_err(LibraryError::Storage)?
    {
        return Err(LibraryError::BookNotFound(book_id));
    }
    unit.commit().await.map_err(LibraryError::Storage)?;

    tracing::info!(book_id = %book_id.value(), "book deleted");
    Ok(book)
}
