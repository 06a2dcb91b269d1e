use async_trait::async_trait;
use chrono::Utc;
use rusty_library_lending::adapters::memory::InMemoryLibraryStore;
use rusty_library_lending::application::LibraryError;
use rusty_library_lending::application::catalogue;
use rusty_library_lending::application::lending::{
    ServiceDependencies, issue_book, list_holders, return_book,
};
use rusty_library_lending::domain::commands::{BorrowerRef, IssueBook, ReturnBook};
use rusty_library_lending::domain::{
    Book, BookChanges, BookId, Borrower, BorrowerId, CopyCount, Email, ValidationError,
};
use rusty_library_lending::ports::lending_store::{self, LendingStore, LendingUnit};
use std::sync::Arc;

mod common;

use common::{in_memory_deps, seed_book, seed_borrower};

// ============================================================================
// テスト用のヘルパー関数
// ============================================================================

fn issue_to_contact(book_id: BookId, name: &str, email: &str) -> IssueBook {
    IssueBook {
        book_id,
        borrower: BorrowerRef::Contact {
            name: name.to_string(),
            email: email.to_string(),
        },
        issued_at: Utc::now(),
    }
}

fn issue_to(book_id: BookId, borrower_id: BorrowerId) -> IssueBook {
    IssueBook {
        book_id,
        borrower: BorrowerRef::Existing(borrower_id),
        issued_at: Utc::now(),
    }
}

fn return_from(book_id: BookId, borrower_id: BorrowerId) -> ReturnBook {
    ReturnBook {
        book_id,
        borrower_id,
        returned_at: Utc::now(),
    }
}

async fn current_book(deps: &ServiceDependencies, book_id: BookId) -> Book {
    catalogue::get_book(deps, book_id).await.unwrap()
}

async fn current_borrower(deps: &ServiceDependencies, borrower_id: BorrowerId) -> Borrower {
    catalogue::get_borrower(deps, borrower_id).await.unwrap()
}

// ============================================================================
// 貸出
// ============================================================================

#[tokio::test]
async fn test_issue_to_new_contact_registers_borrower() {
    // Arrange
    let deps = in_memory_deps();
    let book = seed_book(&deps, 3, 3).await;

    // Act
    let outcome = issue_book(&deps, issue_to_contact(book.book_id, "A", "a@x.com"))
        .await
        .unwrap();

    // Assert
    assert_eq!(outcome.book.quantity_available, CopyCount::new(2));
    assert_eq!(outcome.borrower.active_loans.len(), 1);
    assert_eq!(outcome.borrower.active_loans[0].book_id, book.book_id);

    // 永続化されていることを確認
    assert_eq!(
        current_book(&deps, book.book_id).await.quantity_available,
        CopyCount::new(2)
    );
    let stored = current_borrower(&deps, outcome.borrower.borrower_id).await;
    assert_eq!(stored.email.as_str(), "a@x.com");
    assert_eq!(stored.active_loans, outcome.borrower.active_loans);
}

#[tokio::test]
async fn test_issue_fails_at_loan_limit_without_touching_counter() {
    // Arrange: 既に2冊借りている利用者
    let deps = in_memory_deps();
    let borrower = seed_borrower(&deps, "A", "a@x.com").await;
    for _ in 0..2 {
        let book = seed_book(&deps, 1, 1).await;
        issue_book(&deps, issue_to(book.book_id, borrower.borrower_id))
            .await
            .unwrap();
    }
    let third = seed_book(&deps, 3, 3).await;

    // Act
    let result = issue_book(&deps, issue_to(third.book_id, borrower.borrower_id)).await;

    // Assert
    assert!(matches!(result, Err(LibraryError::LoanLimitReached)));
    assert_eq!(
        current_book(&deps, third.book_id).await.quantity_available,
        CopyCount::new(3)
    );
    assert_eq!(
        current_borrower(&deps, borrower.borrower_id)
            .await
            .active_loans
            .len(),
        2
    );
}

#[tokio::test]
async fn test_issue_fails_without_copies() {
    let deps = in_memory_deps();
    let book = seed_book(&deps, 2, 0).await;

    let result = issue_book(&deps, issue_to_contact(book.book_id, "A", "a@x.com")).await;

    assert!(matches!(result, Err(LibraryError::NoCopiesAvailable)));
    assert_eq!(
        current_book(&deps, book.book_id).await.quantity_available,
        CopyCount::zero()
    );
}

#[tokio::test]
async fn test_issue_without_copies_does_not_register_contact() {
    let deps = in_memory_deps();
    let book = seed_book(&deps, 1, 0).await;

    let result = issue_book(&deps, issue_to_contact(book.book_id, "A", "a@x.com")).await;

    assert!(matches!(result, Err(LibraryError::NoCopiesAvailable)));
    assert!(catalogue::list_borrowers(&deps).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_issue_same_book_twice_is_duplicate() {
    // Arrange
    let deps = in_memory_deps();
    let book = seed_book(&deps, 3, 3).await;
    issue_book(&deps, issue_to_contact(book.book_id, "A", "a@x.com"))
        .await
        .unwrap();

    // Act: 同じ連絡先で同じ書籍をもう一度借りる
    let result = issue_book(&deps, issue_to_contact(book.book_id, "A", "a@x.com")).await;

    // Assert
    assert!(matches!(result, Err(LibraryError::DuplicateLoan)));
    assert_eq!(
        current_book(&deps, book.book_id).await.quantity_available,
        CopyCount::new(2)
    );
}

#[tokio::test]
async fn test_issue_matches_contact_email_case_insensitively() {
    let deps = in_memory_deps();
    let first = seed_book(&deps, 1, 1).await;
    let second = seed_book(&deps, 1, 1).await;

    let a = issue_book(&deps, issue_to_contact(first.book_id, "A", "a@x.com"))
        .await
        .unwrap();
    let b = issue_book(&deps, issue_to_contact(second.book_id, "A", "  A@X.COM "))
        .await
        .unwrap();

    assert_eq!(a.borrower.borrower_id, b.borrower.borrower_id);
    assert_eq!(b.borrower.active_loans.len(), 2);
    assert_eq!(catalogue::list_borrowers(&deps).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_issue_to_unknown_book_is_not_found() {
    let deps = in_memory_deps();
    let book_id = BookId::new();

    let result = issue_book(&deps, issue_to_contact(book_id, "A", "a@x.com")).await;

    assert!(matches!(result, Err(LibraryError::BookNotFound(id)) if id == book_id));
}

#[tokio::test]
async fn test_issue_to_unknown_borrower_is_not_found() {
    let deps = in_memory_deps();
    let book = seed_book(&deps, 1, 1).await;
    let borrower_id = BorrowerId::new();

    let result = issue_book(&deps, issue_to(book.book_id, borrower_id)).await;

    assert!(matches!(result, Err(LibraryError::BorrowerNotFound(id)) if id == borrower_id));
    assert_eq!(
        current_book(&deps, book.book_id).await.quantity_available,
        CopyCount::new(1)
    );
}

#[tokio::test]
async fn test_issue_with_missing_email_is_validation_error() {
    let deps = in_memory_deps();
    let book = seed_book(&deps, 1, 1).await;

    let result = issue_book(&deps, issue_to_contact(book.book_id, "A", "")).await;

    assert!(matches!(
        result,
        Err(LibraryError::Validation(ValidationError::MissingField("email")))
    ));
}

#[tokio::test]
async fn test_issue_with_malformed_email_is_validation_error() {
    let deps = in_memory_deps();
    let book = seed_book(&deps, 1, 1).await;

    let result = issue_book(&deps, issue_to_contact(book.book_id, "A", "not-an-email")).await;

    assert!(matches!(
        result,
        Err(LibraryError::Validation(ValidationError::MalformedEmail(_)))
    ));
}

#[tokio::test]
async fn test_issue_to_unknown_book_checks_book_before_contact() {
    let deps = in_memory_deps();
    let book_id = BookId::new();

    let result = issue_book(&deps, issue_to_contact(book_id, "", "bad")).await;

    assert!(matches!(result, Err(LibraryError::BookNotFound(id)) if id == book_id));
}

#[tokio::test]
async fn test_issue_to_known_email_does_not_require_name() {
    // Arrange: 登録済みの利用者
    let deps = in_memory_deps();
    let borrower = seed_borrower(&deps, "A", "a@x.com").await;
    let book = seed_book(&deps, 1, 1).await;

    // Act: 名前を省略し、メールアドレスだけで指定する
    let outcome = issue_book(&deps, issue_to_contact(book.book_id, "", "A@x.com"))
        .await
        .unwrap();

    // Assert
    assert_eq!(outcome.borrower.borrower_id, borrower.borrower_id);
    assert_eq!(outcome.borrower.name.as_str(), "A");
}

#[tokio::test]
async fn test_issue_to_new_contact_without_name_is_validation_error() {
    let deps = in_memory_deps();
    let book = seed_book(&deps, 1, 1).await;

    let result = issue_book(&deps, issue_to_contact(book.book_id, " ", "n@x.com")).await;

    assert!(matches!(
        result,
        Err(LibraryError::Validation(ValidationError::MissingField("name")))
    ));
    assert!(catalogue::list_borrowers(&deps).await.unwrap().is_empty());
}

// ============================================================================
// 返却
// ============================================================================

#[tokio::test]
async fn test_return_restores_copy_and_removes_loan() {
    // Arrange: 所蔵3冊、貸出可能1冊、利用者が1冊借りている
    let deps = in_memory_deps();
    let book = seed_book(&deps, 3, 2).await;
    let issued = issue_book(&deps, issue_to_contact(book.book_id, "A", "a@x.com"))
        .await
        .unwrap();
    assert_eq!(issued.book.quantity_available, CopyCount::new(1));

    // Act
    let outcome = return_book(
        &deps,
        return_from(book.book_id, issued.borrower.borrower_id),
    )
    .await
    .unwrap();

    // Assert
    assert_eq!(outcome.book.quantity_available, CopyCount::new(2));
    assert!(!outcome.borrower.holds(book.book_id));
    let stored = current_borrower(&deps, issued.borrower.borrower_id).await;
    assert!(stored.active_loans.is_empty());
}

#[tokio::test]
async fn test_issue_then_return_restores_initial_state() {
    let deps = in_memory_deps();
    let book = seed_book(&deps, 2, 2).await;
    let borrower = seed_borrower(&deps, "A", "a@x.com").await;

    issue_book(&deps, issue_to(book.book_id, borrower.borrower_id))
        .await
        .unwrap();
    return_book(&deps, return_from(book.book_id, borrower.borrower_id))
        .await
        .unwrap();

    let book_after = current_book(&deps, book.book_id).await;
    let borrower_after = current_borrower(&deps, borrower.borrower_id).await;
    assert_eq!(book_after.quantity_available, book.quantity_available);
    assert_eq!(borrower_after.active_loans, borrower.active_loans);
}

#[tokio::test]
async fn test_double_return_is_loan_not_found() {
    let deps = in_memory_deps();
    let book = seed_book(&deps, 2, 2).await;
    let borrower = seed_borrower(&deps, "A", "a@x.com").await;
    issue_book(&deps, issue_to(book.book_id, borrower.borrower_id))
        .await
        .unwrap();
    return_book(&deps, return_from(book.book_id, borrower.borrower_id))
        .await
        .unwrap();

    let result = return_book(&deps, return_from(book.book_id, borrower.borrower_id)).await;

    assert!(matches!(result, Err(LibraryError::LoanNotFound)));
    assert_eq!(
        current_book(&deps, book.book_id).await.quantity_available,
        CopyCount::new(2)
    );
}

#[tokio::test]
async fn test_return_by_unknown_borrower_is_not_found() {
    let deps = in_memory_deps();
    let book = seed_book(&deps, 1, 1).await;

    let result = return_book(&deps, return_from(book.book_id, BorrowerId::new())).await;

    assert!(matches!(result, Err(LibraryError::BorrowerNotFound(_))));
}

// ============================================================================
// 貸出中の利用者一覧
// ============================================================================

#[tokio::test]
async fn test_list_holders_returns_current_borrowers() {
    let deps = in_memory_deps();
    let book = seed_book(&deps, 3, 3).await;
    let a = issue_book(&deps, issue_to_contact(book.book_id, "A", "a@x.com"))
        .await
        .unwrap();
    let b = issue_book(&deps, issue_to_contact(book.book_id, "B", "b@x.com"))
        .await
        .unwrap();
    return_book(&deps, return_from(book.book_id, a.borrower.borrower_id))
        .await
        .unwrap();

    let holders = list_holders(&deps, book.book_id).await.unwrap();

    assert_eq!(holders.len(), 1);
    assert_eq!(holders[0].borrower_id, b.borrower.borrower_id);
    assert_eq!(holders[0].email, Email::parse("b@x.com").unwrap());
}

#[tokio::test]
async fn test_list_holders_of_unknown_book_is_not_found() {
    let deps = in_memory_deps();

    let result = list_holders(&deps, BookId::new()).await;

    assert!(matches!(result, Err(LibraryError::BookNotFound(_))));
}

// ============================================================================
// 同時実行
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_issues_never_oversell() {
    // Arrange: 5冊の書籍に対して20人が同時に貸出を要求する
    let deps = in_memory_deps();
    let book = seed_book(&deps, 5, 5).await;

    // Act
    let handles: Vec<_> = (0..20)
        .map(|i| {
            let deps = deps.clone();
            let cmd = issue_to_contact(book.book_id, "Reader", &format!("reader{i}@x.com"));
            tokio::spawn(async move { issue_book(&deps, cmd).await })
        })
        .collect();

    let mut issued = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => issued += 1,
            Err(LibraryError::NoCopiesAvailable) => rejected += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    // Assert
    assert_eq!(issued, 5);
    assert_eq!(rejected, 15);
    assert_eq!(
        current_book(&deps, book.book_id).await.quantity_available,
        CopyCount::zero()
    );
    assert_eq!(list_holders(&deps, book.book_id).await.unwrap().len(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_issues_by_one_borrower_respect_limit() {
    let deps = in_memory_deps();
    let borrower = seed_borrower(&deps, "A", "a@x.com").await;
    let mut books = Vec::new();
    for _ in 0..6 {
        books.push(seed_book(&deps, 1, 1).await);
    }

    let handles: Vec<_> = books
        .iter()
        .map(|book| {
            let deps = deps.clone();
            let cmd = issue_to(book.book_id, borrower.borrower_id);
            tokio::spawn(async move { issue_book(&deps, cmd).await })
        })
        .collect();

    let mut issued = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => issued += 1,
            Err(LibraryError::LoanLimitReached) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(issued, 2);
    let stored = current_borrower(&deps, borrower.borrower_id).await;
    assert_eq!(stored.active_loans.len(), 2);

    let remaining: u32 = catalogue::list_books(&deps)
        .await
        .unwrap()
        .iter()
        .map(|b| b.quantity_available.value())
        .sum();
    assert_eq!(remaining, 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_issues_by_new_contact_share_one_borrower() {
    // Arrange: 未登録のメールアドレスで2冊を同時に借りる
    let deps = in_memory_deps();
    let first = seed_book(&deps, 1, 1).await;
    let second = seed_book(&deps, 1, 1).await;

    // Act
    let handles: Vec<_> = [first.book_id, second.book_id]
        .into_iter()
        .map(|book_id| {
            let deps = deps.clone();
            let cmd = issue_to_contact(book_id, "N", "n@x.com");
            tokio::spawn(async move { issue_book(&deps, cmd).await })
        })
        .collect();

    let mut borrower_ids = Vec::new();
    for handle in handles {
        borrower_ids.push(handle.await.unwrap().unwrap().borrower.borrower_id);
    }

    // Assert
    assert_eq!(borrower_ids[0], borrower_ids[1]);
    let borrowers = catalogue::list_borrowers(&deps).await.unwrap();
    assert_eq!(borrowers.len(), 1);
    assert_eq!(borrowers[0].active_loans.len(), 2);
}

// ============================================================================
// 永続化層の障害
// ============================================================================

/// 利用者の保存で失敗する作業単位を返すストア
///
/// 書籍の保存は成功した後に失敗するため、途中までの書き込みが
/// 確定されないことを確認できる。
struct FailingStore {
    inner: InMemoryLibraryStore,
}

struct FailingUnit {
    inner: Box<dyn LendingUnit>,
}

#[async_trait]
impl LendingStore for FailingStore {
    async fn begin(&self) -> lending_store::Result<Box<dyn LendingUnit>> {
        let inner = self.inner.begin().await?;
        Ok(Box::new(FailingUnit { inner }))
    }
}

#[async_trait]
impl LendingUnit for FailingUnit {
    async fn find_book(&mut self, book_id: BookId) -> lending_store::Result<Option<Book>> {
        self.inner.find_book(book_id).await
    }

    async fn find_borrower_by_id(
        &mut self,
        borrower_id: BorrowerId,
    ) -> lending_store::Result<Option<Borrower>> {
        self.inner.find_borrower_by_id(borrower_id).await
    }

    async fn find_borrower_by_email(
        &mut self,
        email: &Email,
    ) -> lending_store::Result<Option<Borrower>> {
        self.inner.find_borrower_by_email(email).await
    }

    async fn find_borrowers_holding(
        &mut self,
        book_id: BookId,
    ) -> lending_store::Result<Vec<Borrower>> {
        self.inner.find_borrowers_holding(book_id).await
    }

    async fn insert_book(&mut self, book: &Book) -> lending_store::Result<()> {
        self.inner.insert_book(book).await
    }

    async fn insert_borrower(&mut self, borrower: &Borrower) -> lending_store::Result<()> {
        self.inner.insert_borrower(borrower).await
    }

    async fn insert_borrower_if_absent(
        &mut self,
        borrower: &Borrower,
    ) -> lending_store::Result<Borrower> {
        self.inner.insert_borrower_if_absent(borrower).await
    }

    async fn save_book(&mut self, book: &Book) -> lending_store::Result<()> {
        self.inner.save_book(book).await
    }

    async fn save_borrower(&mut self, _borrower: &Borrower) -> lending_store::Result<()> {
        Err("connection reset by peer".into())
    }

    async fn delete_book(&mut self, book_id: BookId) -> lending_store::Result<bool> {
        self.inner.delete_book(book_id).await
    }

    async fn delete_borrower(&mut self, borrower_id: BorrowerId) -> lending_store::Result<bool> {
        self.inner.delete_borrower(borrower_id).await
    }

    async fn commit(self: Box<Self>) -> lending_store::Result<()> {
        self.inner.commit().await
    }
}

#[tokio::test]
async fn test_storage_failure_is_reported_and_rolled_back() {
    // Arrange: 正常なストアで書籍と利用者を用意し、同じデータを障害ストア越しに使う
    let store = Arc::new(InMemoryLibraryStore::new());
    let healthy = ServiceDependencies::from_store(store.clone());
    let book = seed_book(&healthy, 2, 2).await;
    let borrower = seed_borrower(&healthy, "A", "a@x.com").await;

    let failing = ServiceDependencies {
        lending_store: Arc::new(FailingStore {
            inner: (*store).clone(),
        }),
        book_repository: store.clone(),
        borrower_repository: store.clone(),
    };

    // Act
    let result = issue_book(&failing, issue_to(book.book_id, borrower.borrower_id)).await;

    // Assert: ドメインのエラーではなく永続化層のエラーとして報告される
    assert!(matches!(result, Err(LibraryError::Storage(_))));
    assert_eq!(
        current_book(&healthy, book.book_id).await.quantity_available,
        CopyCount::new(2)
    );
    assert!(
        current_borrower(&healthy, borrower.borrower_id)
            .await
            .active_loans
            .is_empty()
    );
}

// ============================================================================
// カタログ
// ============================================================================

#[tokio::test]
async fn test_create_book_defaults_available_to_total() {
    let deps = in_memory_deps();
    let mut input = common::new_book("Dune", 4, 0);
    input.quantity_available = None;

    let book = catalogue::create_book(&deps, input, Utc::now()).await.unwrap();

    assert_eq!(book.quantity_available, CopyCount::new(4));
    assert_eq!(catalogue::list_books(&deps).await.unwrap(), vec![book]);
}

#[tokio::test]
async fn test_create_book_rejects_available_above_total() {
    let deps = in_memory_deps();

    let result =
        catalogue::create_book(&deps, common::new_book("Dune", 1, 2), Utc::now()).await;

    assert!(matches!(
        result,
        Err(LibraryError::Validation(
            ValidationError::AvailableExceedsTotal { .. }
        ))
    ));
}

#[tokio::test]
async fn test_update_book_keeps_counter_of_issued_copies() {
    let deps = in_memory_deps();
    let book = seed_book(&deps, 3, 3).await;
    issue_book(&deps, issue_to_contact(book.book_id, "A", "a@x.com"))
        .await
        .unwrap();

    let updated = catalogue::update_book(
        &deps,
        book.book_id,
        BookChanges {
            title: Some("Renamed".to_string()),
            ..Default::default()
        },
        Utc::now(),
    )
    .await
    .unwrap();

    assert_eq!(updated.title, "Renamed");
    assert_eq!(updated.quantity_available, CopyCount::new(2));
}

#[tokio::test]
async fn test_update_book_rejects_total_below_available() {
    let deps = in_memory_deps();
    let book = seed_book(&deps, 3, 3).await;

    let result = catalogue::update_book(
        &deps,
        book.book_id,
        BookChanges {
            total_quantity: Some(CopyCount::new(1)),
            ..Default::default()
        },
        Utc::now(),
    )
    .await;

    assert!(matches!(
        result,
        Err(LibraryError::Validation(
            ValidationError::AvailableExceedsTotal { .. }
        ))
    ));
    assert_eq!(
        current_book(&deps, book.book_id).await.total_quantity,
        CopyCount::new(3)
    );
}

#[tokio::test]
async fn test_delete_book_on_loan_is_rejected() {
    let deps = in_memory_deps();
    let book = seed_book(&deps, 1, 1).await;
    let issued = issue_book(&deps, issue_to_contact(book.book_id, "A", "a@x.com"))
        .await
        .unwrap();

    let result = catalogue::delete_book(&deps, book.book_id).await;
    assert!(matches!(
        result,
        Err(LibraryError::Validation(ValidationError::BookOnLoan))
    ));

    return_book(&deps, return_from(book.book_id, issued.borrower.borrower_id))
        .await
        .unwrap();
    catalogue::delete_book(&deps, book.book_id).await.unwrap();
    assert!(matches!(
        catalogue::get_book(&deps, book.book_id).await,
        Err(LibraryError::BookNotFound(_))
    ));
}

#[tokio::test]
async fn test_register_borrower_rejects_existing_email() {
    let deps = in_memory_deps();
    seed_borrower(&deps, "A", "a@x.com").await;

    let result = catalogue::register_borrower(&deps, "Other", "A@x.com", Utc::now()).await;

    assert!(matches!(
        result,
        Err(LibraryError::Validation(
            ValidationError::EmailAlreadyRegistered(_)
        ))
    ));
}

#[tokio::test]
async fn test_delete_borrower_with_loans_is_rejected() {
    let deps = in_memory_deps();
    let book = seed_book(&deps, 1, 1).await;
    let borrower = seed_borrower(&deps, "A", "a@x.com").await;
    issue_book(&deps, issue_to(book.book_id, borrower.borrower_id))
        .await
        .unwrap();

    let result = catalogue::delete_borrower(&deps, borrower.borrower_id).await;

    assert!(matches!(
        result,
        Err(LibraryError::Validation(
            ValidationError::BorrowerHasActiveLoans
        ))
    ));
}
