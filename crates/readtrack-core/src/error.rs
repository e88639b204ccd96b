//! Error types for `readtrack-core`.

use thiserror::Error;

use crate::BookId;

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed or missing input. Raised before any write is kept.
  #[error("{0}")]
  InvalidInput(String),

  /// The book is absent, belongs to another owner, or is in the wrong state
  /// for a guarded transition.
  #[error("book not found: {0}")]
  BookNotFound(BookId),

  #[error("an account already exists for {0}")]
  EmailTaken(String),

  #[error("unknown book status: {0:?}")]
  UnknownStatus(String),
}

impl Error {
  pub fn invalid(message: impl Into<String>) -> Self {
    Self::InvalidInput(message.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
