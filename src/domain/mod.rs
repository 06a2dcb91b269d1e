pub mod book;
pub mod borrower;
pub mod commands;
pub mod errors;
pub mod ledger;
pub mod value_objects;

pub use book::*;
pub use borrower::*;
pub use errors::*;
pub use value_objects::*;
