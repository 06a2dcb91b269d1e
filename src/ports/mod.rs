pub mod book_repository;
pub mod borrower_repository;
pub mod lending_store;

pub use book_repository::BookRepository;
pub use borrower_repository::BorrowerRepository;
pub use lending_store::{LendingStore, LendingUnit};
