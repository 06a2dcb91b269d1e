mod book_service;
mod borrower_service;

pub use book_service::{create_book, delete_book, get_book, list_books, update_book};
pub use borrower_service::{delete_borrower, get_borrower, list_borrowers, register_borrower};
