//! Book: a tracked reading item with a page count and a status.

use serde::{Deserialize, Serialize};

use crate::{BookId, Error, Result, UserId};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Where a book sits in the reading lifecycle.
///
/// The string forms are shared by the JSON API and the `status` column.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
pub enum BookStatus {
  #[serde(rename = "To Be Read")]
  #[strum(serialize = "To Be Read")]
  ToBeRead,
  #[serde(rename = "Current Read")]
  #[strum(serialize = "Current Read")]
  CurrentRead,
  #[serde(rename = "Finish")]
  #[strum(serialize = "Finish")]
  Finished,
}

impl BookStatus {
  pub fn as_str(self) -> &'static str { self.into() }

  /// Parse the stored/wire form, e.g. `"Current Read"`.
  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::UnknownStatus(s.to_owned()))
  }
}

/// A guarded status change: applied only when the book is currently in
/// `from`. Zero rows affected means "not found or wrong state".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
  pub from: BookStatus,
  pub to:   BookStatus,
}

impl Transition {
  /// `ToBeRead → CurrentRead`
  pub const START_READING: Self = Self {
    from: BookStatus::ToBeRead,
    to:   BookStatus::CurrentRead,
  };

  /// `CurrentRead → ToBeRead` (close without finishing)
  pub const CLOSE_BOOK: Self = Self {
    from: BookStatus::CurrentRead,
    to:   BookStatus::ToBeRead,
  };
}

// ─── Derivations ─────────────────────────────────────────────────────────────

/// `round(page_read / total_page * 100, 2)`, or `None` when `total_page` is
/// zero.
pub fn percentage_completed(page_read: i64, total_page: i64) -> Option<f64> {
  if total_page == 0 {
    return None;
  }
  let raw = page_read as f64 / total_page as f64 * 100.0;
  Some((raw * 100.0).round() / 100.0)
}

/// Whether recording `last_page` should move the book to
/// [`BookStatus::Finished`].
pub fn reaches_end(last_page: i64, total_page: i64) -> bool {
  last_page >= total_page
}

// ─── Book ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
  pub id:                   BookId,
  pub title:                String,
  pub author:               String,
  pub total_page:           i64,
  pub status:               BookStatus,
  pub page_read:            i64,
  /// Derived from `page_read` and `total_page`; `None` when the total is 0.
  pub percentage_completed: Option<f64>,
  pub notes:                Option<String>,
  pub user_id:              UserId,
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`crate::store::ReadingStore::add_book`]. The identifier and the
/// percentage are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewBook {
  pub title:      String,
  pub author:     String,
  pub total_page: i64,
  pub status:     BookStatus,
  pub page_read:  i64,
  pub notes:      Option<String>,
}

impl NewBook {
  pub fn validate(&self) -> Result<()> {
    BookDetails::check(&self.title, &self.author, self.total_page)?;
    if self.page_read < 0 {
      return Err(Error::invalid("page_read must not be negative"));
    }
    Ok(())
  }
}

/// Editable descriptive fields of a book.
#[derive(Debug, Clone)]
pub struct BookDetails {
  pub title:      String,
  pub author:     String,
  pub total_page: i64,
}

impl BookDetails {
  pub fn validate(&self) -> Result<()> {
    Self::check(&self.title, &self.author, self.total_page)
  }

  fn check(title: &str, author: &str, total_page: i64) -> Result<()> {
    if title.trim().is_empty() {
      return Err(Error::invalid("title must not be empty"));
    }
    if author.trim().is_empty() {
      return Err(Error::invalid("author must not be empty"));
    }
    if total_page <= 0 {
      return Err(Error::invalid("total_page must be a positive integer"));
    }
    Ok(())
  }
}
