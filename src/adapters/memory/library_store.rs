use crate::domain::{Book, BookId, Borrower, BorrowerId, Email};
use crate::ports::book_repository::{self, BookRepository};
use crate::ports::borrower_repository::{self, BorrowerRepository};
use crate::ports::lending_store::{self, LendingStore, LendingUnit};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct LibraryState {
    books: HashMap<BookId, Book>,
    borrowers: HashMap<BorrowerId, Borrower>,
}

impl LibraryState {
    fn books_in_order(&self) -> Vec<Book> {
        let mut books: Vec<Book> = self.books.values().cloned().collect();
        books.sort_by_key(|b| (b.created_at, b.book_id.value()));
        books
    }

    fn borrowers_in_order(&self) -> Vec<Borrower> {
        let mut borrowers: Vec<Borrower> = self.borrowers.values().cloned().collect();
        borrowers.sort_by_key(|b| (b.created_at, b.borrower_id.value()));
        borrowers
    }

    fn borrowers_holding(&self, book_id: BookId) -> Vec<Borrower> {
        self.borrowers_in_order()
            .into_iter()
            .filter(|b| b.holds(book_id))
            .collect()
    }
}

/// In-memory implementation of the library storage ports
///
/// Every work unit holds the single state lock from `begin` until it is
/// committed or dropped, so units are fully serialised. Writes go to a staged
/// copy that replaces the shared state on commit.
#[derive(Clone, Default)]
pub struct LibraryStore {
    state: Arc<Mutex<LibraryState>>,
}

impl LibraryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Work unit over the in-memory state
pub struct LibraryUnit {
    guard: OwnedMutexGuard<LibraryState>,
    staged: LibraryState,
}

#[async_trait]
impl LendingStore for LibraryStore {
    async fn begin(&self) -> lending_store::Result<Box<dyn LendingUnit>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(LibraryUnit { guard, staged }))
    }
}

#[async_trait]
impl LendingUnit for LibraryUnit {
    async fn find_book(&mut self, book_id: BookId) -> lending_store::Result<Option<Book>> {
        Ok(self.staged.books.get(&book_id).cloned())
    }

    async fn find_borrower_by_id(
        &mut self,
        borrower_id: BorrowerId,
    ) -> lending_store::Result<Option<Borrower>> {
        Ok(self.staged.borrowers.get(&borrower_id).cloned())
    }

    async fn find_borrower_by_email(
        &mut self,
        email: &Email,
    ) -> lending_store::Result<Option<Borrower>> {
        Ok(self
            .staged
            .borrowers
            .values()
            .find(|b| &b.email == email)
            .cloned())
    }

    async fn find_borrowers_holding(
        &mut self,
        book_id: BookId,
    ) -> lending_store::Result<Vec<Borrower>> {
        Ok(self.staged.borrowers_holding(book_id))
    }

    async fn insert_book(&mut self, book: &Book) -> lending_store::Result<()> {
        if self.staged.books.contains_key(&book.book_id) {
            return Err(format!("duplicate book id: {}", book.book_id.value()).into());
        }
        self.staged.books.insert(book.book_id, book.clone());
        Ok(())
    }

    async fn insert_borrower(&mut self, borrower: &Borrower) -> lending_store::Result<()> {
        if self.staged.borrowers.contains_key(&borrower.borrower_id) {
            return Err(format!("duplicate borrower id: {}", borrower.borrower_id.value()).into());
        }
        // Mirrors the unique index on lower(email)
        if self
            .staged
            .borrowers
            .values()
            .any(|b| b.email == borrower.email)
        {
            return Err(format!("duplicate borrower email: {}", borrower.email).into());
        }
        self.staged
            .borrowers
            .insert(borrower.borrower_id, borrower.clone());
        Ok(())
    }

    async fn insert_borrower_if_absent(
        &mut self,
        borrower: &Borrower,
    ) -> lending_store::Result<Borrower> {
        if let Some(existing) = self
            .staged
            .borrowers
            .values()
            .find(|b| b.email == borrower.email)
        {
            return Ok(existing.clone());
        }
        self.insert_borrower(borrower).await?;
        Ok(borrower.clone())
    }

    async fn save_book(&mut self, book: &Book) -> lending_store::Result<()> {
        match self.staged.books.get_mut(&book.book_id) {
            Some(stored) => {
                *stored = book.clone();
                Ok(())
            }
            None => Err(format!("book {} does not exist", book.book_id.value()).into()),
        }
    }

    async fn save_borrower(&mut self, borrower: &Borrower) -> lending_store::Result<()> {
        match self.staged.borrowers.get_mut(&borrower.borrower_id) {
            Some(stored) => {
                *stored = borrower.clone();
                Ok(())
            }
            None => {
                Err(format!("borrower {} does not exist", borrower.borrower_id.value()).into())
            }
        }
    }

    async fn delete_book(&mut self, book_id: BookId) -> lending_store::Result<bool> {
        Ok(self.staged.books.remove(&book_id).is_some())
    }

    async fn delete_borrower(&mut self, borrower_id: BorrowerId) -> lending_store::Result<bool> {
        Ok(self.staged.borrowers.remove(&borrower_id).is_some())
    }

    async fn commit(self: Box<Self>) -> lending_store::Result<()> {
        let LibraryUnit { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

#[async_trait]
impl BookRepository for LibraryStore {
    async fn find_by_id(&self, book_id: BookId) -> book_repository::Result<Option<Book>> {
        Ok(self.state.lock().await.books.get(&book_id).cloned())
    }

    async fn list(&self) -> book_repository::Result<Vec<Book>> {
        Ok(self.state.lock().await.books_in_order())
    }
}

#[async_trait]
impl BorrowerRepository for LibraryStore {
    async fn find_by_id(
        &self,
        borrower_id: BorrowerId,
    ) -> borrower_repository::Result<Option<Borrower>> {
        Ok(self.state.lock().await.borrowers.get(&borrower_id).cloned())
    }

    async fn list(&self) -> borrower_repository::Result<Vec<Borrower>> {
        Ok(self.state.lock().await.borrowers_in_order())
    }

    async fn find_holding(&self, book_id: BookId) -> borrower_repository::Result<Vec<Borrower>> {
        Ok(self.state.lock().await.borrowers_holding(book_id))
    }
}
