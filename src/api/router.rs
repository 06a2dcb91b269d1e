use axum::{
    Router,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{
    AppState, create_book, create_borrower, delete_book, delete_borrower, get_book,
    get_borrower, issue_book_to_borrower, issue_book_to_contact, list_books, list_borrowers,
    list_holders, return_book, update_book,
};

/// Creates the API router with all library endpoints
///
/// Books:
/// - POST /api/books, GET /api/books
/// - GET /api/books/:id, PUT /api/books/:id, DELETE /api/books/:id
///
/// Lending:
/// - PUT /api/books/issue/:book_id - Issue by contact (name, email)
/// - PUT /api/books/issue/:book_id/:borrower_id - Issue to a registered borrower
/// - PUT /api/books/return/:book_id/:borrower_id - Return a book
/// - GET /api/books/:id/issuedBy - Borrowers currently holding a book
///
/// Users:
/// - POST /api/users, GET /api/users
/// - GET /api/users/:id, DELETE /api/users/:id
pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/books", post(create_book).get(list_books))
        .route(
            "/books/:id",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route("/books/:id/issuedBy", get(list_holders))
        .route("/books/issue/:book_id", put(issue_book_to_contact))
        .route(
            "/books/issue/:book_id/:borrower_id",
            put(issue_book_to_borrower),
        )
        .route("/books/return/:book_id/:borrower_id", put(return_book))
        .route("/users", post(create_borrower).get(list_borrowers))
        .route("/users/:id", get(get_borrower).delete(delete_borrower));

    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        .nest("/api", api)
        // Add tracing middleware
        .layer(TraceLayer::new_for_http())
        // Add application state
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
