//! Reading history: one row per book per calendar day.
//!
//! Entries are only ever written as a side effect of a progress update. The
//! title and author are snapshotted when the entry is written, so history
//! survives later edits to (or deletion of) the book.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{BookId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingHistoryEntry {
  pub id:         i64,
  pub book_id:    BookId,
  /// The owner's local calendar day; serialised as `YYYY-MM-DD`.
  pub date:       NaiveDate,
  pub book_title: String,
  pub author:     String,
  pub start_page: i64,
  pub end_page:   i64,
  pub user_id:    UserId,
}
