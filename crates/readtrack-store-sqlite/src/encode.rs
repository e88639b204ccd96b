//! Encoding and decoding helpers between domain types and the plain values
//! stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`
//! suffix) so they compare correctly as text. Calendar days are stored as
//! `YYYY-MM-DD`. Book statuses use their display form.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use readtrack_core::{
  book::{Book, BookStatus},
  history::ReadingHistoryEntry,
  learning::LearningNote,
  user::User,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const BOOK_COLUMNS: &str = "id, title, author, total_page, status, page_read, \
                                percentage_completed, notes, user_id";

/// Raw values read directly from a `book` row.
pub struct RawBook {
  pub id:                   i64,
  pub title:                String,
  pub author:               String,
  pub total_page:           i64,
  pub status:               String,
  pub page_read:            i64,
  pub percentage_completed: Option<f64>,
  pub notes:                Option<String>,
  pub user_id:              i64,
}

/// Row mapper for queries selecting [`BOOK_COLUMNS`].
pub fn raw_book(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawBook> {
  Ok(RawBook {
    id:                   row.get(0)?,
    title:                row.get(1)?,
    author:               row.get(2)?,
    total_page:           row.get(3)?,
    status:               row.get(4)?,
    page_read:            row.get(5)?,
    percentage_completed: row.get(6)?,
    notes:                row.get(7)?,
    user_id:              row.get(8)?,
  })
}

impl RawBook {
  pub fn into_book(self) -> Result<Book> {
    Ok(Book {
      id:                   self.id,
      title:                self.title,
      author:               self.author,
      total_page:           self.total_page,
      status:               BookStatus::parse(&self.status)?,
      page_read:            self.page_read,
      percentage_completed: self.percentage_completed,
      notes:                self.notes,
      user_id:              self.user_id,
    })
  }
}

pub const HISTORY_COLUMNS: &str =
  "id, book_id, date, book_title, author, start_page, end_page, user_id";

/// Raw values read directly from a `reading_history` row.
pub struct RawHistoryEntry {
  pub id:         i64,
  pub book_id:    i64,
  pub date:       String,
  pub book_title: String,
  pub author:     String,
  pub start_page: i64,
  pub end_page:   i64,
  pub user_id:    i64,
}

pub fn raw_history_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawHistoryEntry> {
  Ok(RawHistoryEntry {
    id:         row.get(0)?,
    book_id:    row.get(1)?,
    date:       row.get(2)?,
    book_title: row.get(3)?,
    author:     row.get(4)?,
    start_page: row.get(5)?,
    end_page:   row.get(6)?,
    user_id:    row.get(7)?,
  })
}

impl RawHistoryEntry {
  pub fn into_entry(self) -> Result<ReadingHistoryEntry> {
    Ok(ReadingHistoryEntry {
      id:         self.id,
      book_id:    self.book_id,
      date:       decode_date(&self.date)?,
      book_title: self.book_title,
      author:     self.author,
      start_page: self.start_page,
      end_page:   self.end_page,
      user_id:    self.user_id,
    })
  }
}

pub fn learning_note(row: &rusqlite::Row<'_>) -> rusqlite::Result<LearningNote> {
  Ok(LearningNote {
    id:            row.get(0)?,
    user_id:       row.get(1)?,
    learning_list: row.get(2)?,
  })
}

pub const USER_COLUMNS: &str = "user_id, email, utc_offset_minutes, created_at";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:            i64,
  pub email:              String,
  pub utc_offset_minutes: i32,
  pub created_at:         String,
}

pub fn raw_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawUser> {
  Ok(RawUser {
    user_id:            row.get(0)?,
    email:              row.get(1)?,
    utc_offset_minutes: row.get(2)?,
    created_at:         row.get(3)?,
  })
}

impl RawUser {
  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:            self.user_id,
      email:              self.email,
      utc_offset_minutes: self.utc_offset_minutes,
      created_at:         decode_dt(&self.created_at)?,
    })
  }
}
