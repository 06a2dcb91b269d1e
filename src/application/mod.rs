pub mod catalogue;
mod errors;
pub mod lending;

pub use errors::{LibraryError, Result};
