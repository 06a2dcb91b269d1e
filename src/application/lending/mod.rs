mod lending_service;

pub use lending_service::{
    Holder, LendingOutcome, ServiceDependencies, issue_book, list_holders, return_book,
};
