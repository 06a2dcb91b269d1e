use crate::domain::{self, commands::*, value_objects::*, Book, Borrower};
use crate::ports::*;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::application::{LibraryError, Result};

/// サービスの依存関係
///
/// 振る舞い（メソッド）は持たず、純粋な関数に依存関係を渡す。
/// 書き込みはすべて`lending_store`の作業単位を経由し、
/// 2つのリポジトリはロックを取らない参照専用として使う。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub lending_store: Arc<dyn LendingStore>,
    pub book_repository: Arc<dyn BookRepository>,
    pub borrower_repository: Arc<dyn BorrowerRepository>,
}

impl ServiceDependencies {
    /// 3つのポートをすべて実装するストアから依存関係を組み立てる
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: LendingStore + BookRepository + BorrowerRepository + 'static,
    {
        Self {
            lending_store: store.clone(),
            book_repository: store.clone(),
            borrower_repository: store,
        }
    }
}

/// 貸出・返却の結果（更新後の書籍と利用者）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LendingOutcome {
    pub book: Book,
    pub borrower: Borrower,
}

/// 書籍を借りている利用者（「誰が借りているか」の表示用）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Holder {
    pub borrower_id: BorrowerId,
    pub name: BorrowerName,
    pub email: Email,
    pub issue_date: DateTime<Utc>,
}

/// 貸出先を解決する
///
/// 連絡先で指定された場合はメールアドレスで検索し、未登録なら同じ作業単位の中で登録する。
/// 利用者名は登録する場合にだけ検証する。
/// 登録は利用者から見える副作用だが、作業単位が確定しなければ取り消される。
async fn resolve_borrower(
    unit: &mut dyn LendingUnit,
    borrower_ref: BorrowerRef,
    now: DateTime<Utc>,
) -> Result<Borrower> {
    match borrower_ref {
        BorrowerRef::Existing(borrower_id) => unit
            .find_borrower_by_id(borrower_id)
            .await
            .map_err(LibraryError::Storage)?
            .ok_or(LibraryError::BorrowerNotFound(borrower_id)),
        BorrowerRef::Contact { name, email } => {
            let email = Email::parse(&email)?;
            let existing = unit
                .find_borrower_by_email(&email)
                .await
                .map_err(LibraryError::Storage)?;
            if let Some(borrower) = existing {
                return Ok(borrower);
            }

            // 同時に同じメールアドレスで登録された場合は、その利用者が返る
            let candidate = Borrower::register(BorrowerName::parse(&name)?, email, now);
            let borrower = unit
                .insert_borrower_if_absent(&candidate)
                .await
                .map_err(LibraryError::Storage)?;
            if borrower.borrower_id == candidate.borrower_id {
                tracing::info!(
                    borrower_id = %borrower.borrower_id.value(),
                    email = %borrower.email,
                    "borrower registered during issuance"
                );
            }
            Ok(borrower)
        }
    }
}

/// 書籍を貸し出す
///
/// ビジネスルール（この順で判定し、最初の違反で中断する）：
/// 1. 書籍が存在すること
/// 2. 貸出可能な冊数が残っていること
/// 3. 貸出先を解決する（連絡先の検証、未登録なら登録）
/// 4. 利用者の貸出中の冊数が上限（2冊）未満であること
/// 5. 利用者が同じ書籍をまだ借りていないこと
///
/// 書籍と利用者の読み取り・書き込みは1つの作業単位で行う。
/// 判定に失敗した場合は何も確定しない。
///
/// # 戻り値
/// 更新後の書籍と利用者
pub async fn issue_book(deps: &ServiceDependencies, cmd: IssueBook) -> Result<LendingOutcome> {
    let mut unit = deps
        .lending_store
        .begin()
        .await
        .map_err(LibraryError::Storage)?;

    // 1. 書籍の存在確認
    let book = unit
        .find_book(cmd.book_id)
        .await
        .map_err(LibraryError::Storage)?
        .ok_or(LibraryError::BookNotFound(cmd.book_id))?;

    // 2. 在庫確認
    if let Err(e) = domain::ledger::ensure_copies_available(&book) {
        tracing::debug!(book_id = %cmd.book_id.value(), "issue rejected: {}", e);
        return Err(e.into());
    }

    // 3. 貸出先の解決
    let borrower = resolve_borrower(unit.as_mut(), cmd.borrower, cmd.issued_at).await?;

    // 4, 5. ドメイン層の純粋関数を呼び出し
    let (book, borrower) = domain::ledger::issue_book(&book, &borrower, cmd.issued_at)
        .inspect_err(|e| {
            tracing::debug!(
                book_id = %cmd.book_id.value(),
                borrower_id = %borrower.borrower_id.value(),
                "issue rejected: {}",
                e
            )
        })?;

    // 6. 両方を保存して確定
    unit.save_book(&book).await.map_err(LibraryError::Storage)?;
    unit.save_borrower(&borrower)
        .await
        .map_err(LibraryError::Storage)?;
    unit.commit().await.map_err(LibraryError::Storage)?;

    tracing::info!(
        book_id = %book.book_id.value(),
        borrower_id = %borrower.borrower_id.value(),
        quantity_available = book.quantity_available.value(),
        "book issued"
    );

    Ok(LendingOutcome { book, borrower })
}

/// 書籍を返却する
///
/// ビジネスルール：
/// - 書籍と利用者が両方存在すること
/// - 利用者がその書籍を借りていること
/// - 貸出可能冊数は所蔵冊数を超えない
///
/// # 戻り値
/// 更新後の書籍と利用者
pub async fn return_book(deps: &ServiceDependencies, cmd: ReturnBook) -> Result<LendingOutcome> {
    let mut unit = deps
        .lending_store
        .begin()
        .await
        .map_err(LibraryError::Storage)?;

    // 1. 書籍・利用者の存在確認
    let book = unit
        .find_book(cmd.book_id)
        .await
        .map_err(LibraryError::Storage)?
        .ok_or(LibraryError::BookNotFound(cmd.book_id))?;

    let borrower = unit
        .find_borrower_by_id(cmd.borrower_id)
        .await
        .map_err(LibraryError::Storage)?
        .ok_or(LibraryError::BorrowerNotFound(cmd.borrower_id))?;

    // 2. ドメイン層の純粋関数を呼び出し
    let (book, borrower) = domain::ledger::return_book(&book, &borrower, cmd.returned_at)
        .inspect_err(|e| {
            tracing::debug!(
                book_id = %cmd.book_id.value(),
                borrower_id = %cmd.borrower_id.value(),
                "return rejected: {}",
                e
            )
        })?;

    // 3. 両方を保存して確定
    unit.save_book(&book).await.map_err(LibraryError::Storage)?;
    unit.save_borrower(&borrower)
        .await
        .map_err(LibraryError::Storage)?;
    unit.commit().await.map_err(LibraryError::Storage)?;

    tracing::info!(
        book_id = %book.book_id.value(),
        borrower_id = %borrower.borrower_id.value(),
        quantity_available = book.quantity_available.value(),
        "book returned"
    );

    Ok(LendingOutcome { book, borrower })
}

/// 書籍を借りている利用者の一覧を取得する
///
/// 貸出日の古い順に並ぶ。書籍が存在しない場合は`BookNotFound`。
pub async fn list_holders(deps: &ServiceDependencies, book_id: BookId) -> Result<Vec<Holder>> {
    deps.book_repository
        .find_by_id(book_id)
        .await
        .map_err(LibraryError::Storage)?
        .ok_or(LibraryError::BookNotFound(book_id))?;

    let borrowers = deps
        .borrower_repository
        .find_holding(book_id)
        .await
        .map_err(LibraryError::Storage)?;

    let mut holders: Vec<Holder> = borrowers
        .into_iter()
        .filter_map(|borrower| {
            let issue_date = borrower.loan_of(book_id)?.issue_date;
            Some(Holder {
                borrower_id: borrower.borrower_id,
                name: borrower.name,
                email: borrower.email,
                issue_date,
            })
        })
        .collect();
    holders.sort_by_key(|holder| holder.issue_date);

    Ok(holders)
}
