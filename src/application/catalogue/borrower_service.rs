use crate::application::lending::ServiceDependencies;
use crate::application::{LibraryError, Result};
use crate::domain::{Borrower, BorrowerId, BorrowerName, Email, ValidationError};
use chrono::{DateTime, Utc};

/// 利用者を登録する
///
/// メールアドレスは大文字小文字を区別せず一意。既に登録済みなら拒否する。
pub async fn register_borrower(
    deps: &ServiceDependencies,
    name: &str,
    email: &str,
    now: DateTime<Utc>,
) -> Result<Borrower> {
    let name = BorrowerName::parse(name)?;
    let email = Email::parse(email)?;

    let mut unit = deps
        .lending_store
        .begin()
        .await
        .map_err(LibraryError::Storage)?;

    let existing = unit
        .find_borrower_by_email(&email)
        .await
        .map_err(LibraryError::Storage)?;
    if existing.is_some() {
        return Err(ValidationError::EmailAlreadyRegistered(email.to_string()).into());
    }

    let borrower = Borrower::register(name, email, now);
    unit.insert_borrower(&borrower)
        .await
        .map_err(LibraryError::Storage)?;
    unit.commit().await.map_err(LibraryError::Storage)?;

    tracing::info!(borrower_id = %borrower.borrower_id.value(), "borrower registered");
    Ok(borrower)
}

/// 全利用者を取得する
pub async fn list_borrowers(deps: &ServiceDependencies) -> Result<Vec<Borrower>> {
    deps.borrower_repository
        .list()
        .await
        .map_err(LibraryError::Storage)
}

/// IDで利用者を取得する
pub async fn get_borrower(deps: &ServiceDependencies, borrower_id: BorrowerId) -> Result<Borrower> {
    deps.borrower_repository
        .find_by_id(borrower_id)
        .await
        .map_err(LibraryError::Storage)?
        .ok_or(LibraryError::BorrowerNotFound(borrower_id))
}

/// 利用者を削除する
///
/// 貸出中の書籍がある利用者は削除できない。
pub async fn delete_borrower(
    deps: &ServiceDependencies,
    borrower_id: BorrowerId,
) -> Result<Borrower> {
    let mut unit = deps
        .lending_store
        .begin()
        .await
        .map_err(LibraryError::Storage)?;

    let borrower = unit
        .find_borrower_by_id(borrower_id)
        .await
        .map_err(LibraryError::Storage)?
        .ok_or(LibraryError::BorrowerNotFound(borrower_id))?;

    if !borrower.active_loans.is_empty() {
        return Err(ValidationError::BorrowerHasActiveLoans.into());
    }

    if !unit
        .delete_borrower(borrower_id)
        .await
        .map_err(LibraryError::Storage)?
    {
        return Err(LibraryError::BorrowerNotFound(borrower_id));
    }
    unit.commit().await.map_err(LibraryError::Storage)?;

    tracing::info!(borrower_id = %borrower_id.value(), "borrower deleted");
    Ok(borrower)
}
