//! Input to the progress-update transaction.
//!
//! The book id and the last page are validated before the transaction
//! starts. The initial page is carried unparsed and checked inside the
//! transaction, after the book row has been rewritten; a bad value there
//! rolls that write back.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{BookId, Error, Result};

/// A page number exactly as the client sent it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawPage(pub Value);

impl RawPage {
  pub fn parse(&self) -> Option<i64> { parse_page(&self.0) }
}

impl From<i64> for RawPage {
  fn from(page: i64) -> Self { Self(Value::from(page)) }
}

impl From<&str> for RawPage {
  fn from(page: &str) -> Self { Self(Value::from(page)) }
}

/// Accepts a non-negative JSON integer, or a string holding one.
pub fn parse_page(value: &Value) -> Option<i64> {
  let page = match value {
    Value::Number(n) => n.as_i64()?,
    Value::String(s) => s.trim().parse().ok()?,
    _ => return None,
  };
  (page >= 0).then_some(page)
}

/// Parse an identifier taken from a URL path segment.
pub fn parse_id(raw: &str) -> Option<i64> { raw.trim().parse().ok() }

/// One reading session to record against a book.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
  pub book_id:      BookId,
  /// The page the session started at. Trusted as the session start even
  /// when it differs from the book's stored `page_read`.
  pub initial_page: RawPage,
  /// The page reached.
  pub last_page:    i64,
}

impl ProgressUpdate {
  pub const INVALID_PARAMETERS: &'static str = "Invalid parameters.";
  pub const INVALID_INITIAL_PAGE: &'static str =
    "Invalid initialPage, it must be an integer.";

  /// Validate the book id and last page. The initial page is not inspected
  /// here.
  pub fn new(book_id: &str, initial_page: RawPage, last_page: &RawPage) -> Result<Self> {
    let book_id = parse_id(book_id);
    let last_page = last_page.parse();
    match (book_id, last_page) {
      (Some(book_id), Some(last_page)) => Ok(Self { book_id, initial_page, last_page }),
      _ => Err(Error::invalid(Self::INVALID_PARAMETERS)),
    }
  }

  /// The session start page, or a validation error.
  pub fn initial_page(&self) -> Result<i64> {
    self
      .initial_page
      .parse()
      .ok_or_else(|| Error::invalid(Self::INVALID_INITIAL_PAGE))
  }
}
