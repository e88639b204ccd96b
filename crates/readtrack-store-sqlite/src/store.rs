//! [`SqliteStore`]: the SQLite implementation of [`ReadingStore`].

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{OptionalExtension as _, params_from_iter, types::Value};

use readtrack_core::{
  BookId, UserId,
  book::{Book, BookDetails, BookStatus, NewBook, Transition, percentage_completed, reaches_end},
  history::ReadingHistoryEntry,
  learning::{LearningNote, LearningUpsert},
  progress::ProgressUpdate,
  store::ReadingStore,
  user::{NewSession, NewUser, User},
};

use crate::{
  Error, Result,
  encode::{
    BOOK_COLUMNS, HISTORY_COLUMNS, RawBook, RawHistoryEntry, RawUser, USER_COLUMNS, encode_date,
    encode_dt, learning_note, raw_book, raw_history_entry, raw_user,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A reading-tracker store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Every
/// operation runs as one closure on the connection thread, so a
/// transaction opened inside it is always finished (committed or rolled
/// back on drop) before the closure returns.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::from_connection(tokio_rusqlite::Connection::open(path).await?).await
  }

  /// Open an in-memory store for testing.
  pub async fn open_in_memory() -> Result<Self> {
    Self::from_connection(tokio_rusqlite::Connection::open_in_memory().await?).await
  }

  /// Wrap an already-open connection and run schema initialisation. The
  /// caller may keep a clone of `conn`.
  pub async fn from_connection(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  #[cfg(test)]
  pub(crate) fn connection(&self) -> &tokio_rusqlite::Connection { &self.conn }

  /// Run a statement that yields at most one book row (a `SELECT`, or a
  /// write with `RETURNING`).
  async fn query_book(&self, sql: String, params: Vec<Value>) -> Result<Option<Book>> {
    let raw: Option<RawBook> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, params_from_iter(params), raw_book)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawBook::into_book).transpose()
  }
}

fn text(s: impl Into<String>) -> Value { Value::Text(s.into()) }

fn opt_text(s: Option<String>) -> Value { s.map_or(Value::Null, Value::Text) }

fn opt_real(f: Option<f64>) -> Value { f.map_or(Value::Null, Value::Real) }

// ─── ReadingStore impl ───────────────────────────────────────────────────────

impl ReadingStore for SqliteStore {
  type Error = Error;

  // ── Books ─────────────────────────────────────────────────────────────────

  async fn add_book(&self, owner: UserId, input: NewBook) -> Result<Book> {
    input.validate()?;

    let percentage = percentage_completed(input.page_read, input.total_page);
    let sql = format!(
      "INSERT INTO book (title, author, total_page, status, page_read,
                         percentage_completed, notes, user_id)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
       RETURNING {BOOK_COLUMNS}"
    );
    let params = vec![
      text(input.title.trim()),
      text(input.author.trim()),
      Value::Integer(input.total_page),
      text(input.status.as_str()),
      Value::Integer(input.page_read),
      opt_real(percentage),
      opt_text(input.notes),
      Value::Integer(owner),
    ];

    let raw: RawBook = self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql, params_from_iter(params), raw_book)?))
      .await?;

    raw.into_book()
  }

  async fn list_books(&self, owner: UserId) -> Result<Vec<Book>> {
    let raws: Vec<RawBook> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {BOOK_COLUMNS} FROM book WHERE user_id = ?1 ORDER BY id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![owner], raw_book)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawBook::into_book).collect()
  }

  async fn get_book(&self, owner: UserId, id: BookId) -> Result<Option<Book>> {
    self
      .query_book(
        format!("SELECT {BOOK_COLUMNS} FROM book WHERE id = ?1 AND user_id = ?2"),
        vec![Value::Integer(id), Value::Integer(owner)],
      )
      .await
  }

  async fn update_book_details(
    &self,
    owner:   UserId,
    id:      BookId,
    details: BookDetails,
  ) -> Result<Option<Book>> {
    details.validate()?;

    let raw: Option<RawBook> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let page_read: Option<i64> = tx
          .query_row(
            "SELECT page_read FROM book WHERE id = ?1 AND user_id = ?2",
            rusqlite::params![id, owner],
            |r| r.get(0),
          )
          .optional()?;
        let Some(page_read) = page_read else {
          return Ok(None);
        };

        let raw = tx.query_row(
          &format!(
            "UPDATE book
             SET title = ?1, author = ?2, total_page = ?3, percentage_completed = ?4
             WHERE id = ?5
             RETURNING {BOOK_COLUMNS}"
          ),
          rusqlite::params![
            details.title.trim(),
            details.author.trim(),
            details.total_page,
            percentage_completed(page_read, details.total_page),
            id,
          ],
          raw_book,
        )?;

        tx.commit()?;
        Ok(Some(raw))
      })
      .await?;

    raw.map(RawBook::into_book).transpose()
  }

  async fn update_notes(
    &self,
    owner: UserId,
    id:    BookId,
    notes: Option<String>,
  ) -> Result<Option<Book>> {
    self
      .query_book(
        format!(
          "UPDATE book SET notes = ?1 WHERE id = ?2 AND user_id = ?3 RETURNING {BOOK_COLUMNS}"
        ),
        vec![opt_text(notes), Value::Integer(id), Value::Integer(owner)],
      )
      .await
  }

  async fn delete_book(&self, owner: UserId, id: BookId) -> Result<Option<Book>> {
    self
      .query_book(
        format!("DELETE FROM book WHERE id = ?1 AND user_id = ?2 RETURNING {BOOK_COLUMNS}"),
        vec![Value::Integer(id), Value::Integer(owner)],
      )
      .await
  }

  async fn transition_status(
    &self,
    owner:      UserId,
    id:         BookId,
    transition: Transition,
  ) -> Result<Option<Book>> {
    self
      .query_book(
        format!(
          "UPDATE book SET status = ?1
           WHERE id = ?2 AND user_id = ?3 AND status = ?4
           RETURNING {BOOK_COLUMNS}"
        ),
        vec![
          text(transition.to.as_str()),
          Value::Integer(id),
          Value::Integer(owner),
          text(transition.from.as_str()),
        ],
      )
      .await
  }

  // ── Progress ──────────────────────────────────────────────────────────────

  async fn update_progress(
    &self,
    owner:  UserId,
    update: ProgressUpdate,
    today:  NaiveDate,
  ) -> Result<Book> {
    let today_str = encode_date(today);

    // The closure yields a domain rejection as an inner `Err`; returning
    // before `commit` drops the transaction, which rolls it back.
    let outcome: Result<RawBook, readtrack_core::Error> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let book_id = update.book_id;
        let last_page = update.last_page;

        let found: Option<(String, String, i64)> = tx
          .query_row(
            "SELECT title, author, total_page FROM book WHERE id = ?1 AND user_id = ?2",
            rusqlite::params![book_id, owner],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
          )
          .optional()?;
        let Some((title, author, total_page)) = found else {
          return Ok(Err(readtrack_core::Error::BookNotFound(book_id)));
        };

        tx.execute(
          "UPDATE book SET page_read = ?1, percentage_completed = ?2 WHERE id = ?3",
          rusqlite::params![last_page, percentage_completed(last_page, total_page), book_id],
        )?;

        let initial_page = match update.initial_page() {
          Ok(page) => page,
          Err(e) => return Ok(Err(e)),
        };

        if reaches_end(last_page, total_page) {
          tx.execute(
            "UPDATE book SET status = ?1 WHERE id = ?2",
            rusqlite::params![BookStatus::Finished.as_str(), book_id],
          )?;
        }

        let existing: Option<i64> = tx
          .query_row(
            "SELECT id FROM reading_history
             WHERE book_id = ?1 AND date = ?2 AND user_id = ?3",
            rusqlite::params![book_id, today_str, owner],
            |r| r.get(0),
          )
          .optional()?;

        match existing {
          Some(entry_id) => {
            tx.execute(
              "UPDATE reading_history SET end_page = ?1, book_title = ?2, author = ?3
               WHERE id = ?4",
              rusqlite::params![last_page, title, author, entry_id],
            )?;
          }
          None => {
            tx.execute(
              "INSERT INTO reading_history
                 (book_id, date, book_title, author, start_page, end_page, user_id)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
              rusqlite::params![
                book_id,
                today_str,
                title,
                author,
                initial_page,
                last_page,
                owner,
              ],
            )?;
          }
        }

        let raw = tx.query_row(
          &format!("SELECT {BOOK_COLUMNS} FROM book WHERE id = ?1"),
          rusqlite::params![book_id],
          raw_book,
        )?;

        tx.commit()?;
        Ok(Ok(raw))
      })
      .await?;

    outcome?.into_book()
  }

  // ── History ───────────────────────────────────────────────────────────────

  async fn reading_history(&self, owner: UserId) -> Result<Vec<ReadingHistoryEntry>> {
    let raws: Vec<RawHistoryEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {HISTORY_COLUMNS} FROM reading_history
           WHERE user_id = ?1
           ORDER BY date DESC, id DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![owner], raw_history_entry)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawHistoryEntry::into_entry).collect()
  }

  // ── Learning list ─────────────────────────────────────────────────────────

  async fn get_learning(&self, owner: UserId) -> Result<Option<LearningNote>> {
    let note = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, user_id, learning_list FROM learning WHERE user_id = ?1",
              rusqlite::params![owner],
              learning_note,
            )
            .optional()?,
        )
      })
      .await?;
    Ok(note)
  }

  async fn upsert_learning(&self, owner: UserId, learning_list: String) -> Result<LearningUpsert> {
    if learning_list.trim().is_empty() {
      return Err(readtrack_core::Error::invalid("Missing required field: learning_list").into());
    }

    let upsert = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let updated = tx
          .query_row(
            "UPDATE learning SET learning_list = ?1 WHERE user_id = ?2
             RETURNING id, user_id, learning_list",
            rusqlite::params![learning_list, owner],
            learning_note,
          )
          .optional()?;

        let upsert = match updated {
          Some(note) => LearningUpsert::Updated(note),
          None => LearningUpsert::Created(tx.query_row(
            "INSERT INTO learning (user_id, learning_list) VALUES (?1, ?2)
             RETURNING id, user_id, learning_list",
            rusqlite::params![owner, learning_list],
            learning_note,
          )?),
        };

        tx.commit()?;
        Ok(upsert)
      })
      .await?;

    Ok(upsert)
  }

  // ── Accounts ──────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    let email = input.email.trim().to_lowercase();
    let created_at = encode_dt(Utc::now());

    let outcome: Result<RawUser, readtrack_core::Error> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let taken = tx
          .query_row(
            "SELECT 1 FROM users WHERE email = ?1",
            rusqlite::params![email],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if taken {
          return Ok(Err(readtrack_core::Error::EmailTaken(email)));
        }

        let raw = tx.query_row(
          &format!(
            "INSERT INTO users (email, password_hash, utc_offset_minutes, created_at)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING {USER_COLUMNS}"
          ),
          rusqlite::params![email, input.password_hash, input.utc_offset_minutes, created_at],
          raw_user,
        )?;

        tx.commit()?;
        Ok(Ok(raw))
      })
      .await?;

    outcome?.into_user()
  }

  async fn find_credentials(&self, email: &str) -> Result<Option<(User, String)>> {
    let email = email.trim().to_lowercase();

    let found: Option<(RawUser, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = ?1"),
              rusqlite::params![email],
              |r| Ok((raw_user(r)?, r.get(4)?)),
            )
            .optional()?,
        )
      })
      .await?;

    found
      .map(|(raw, hash)| Ok((raw.into_user()?, hash)))
      .transpose()
  }

  async fn create_session(&self, session: NewSession) -> Result<()> {
    let created_at = encode_dt(Utc::now());
    let expires_at = encode_dt(session.expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![session.token_hash, session.user_id, created_at, expires_at],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn find_session(&self, token_hash: &str, now: DateTime<Utc>) -> Result<Option<User>> {
    let token_hash = token_hash.to_owned();
    let now_str = encode_dt(now);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT u.user_id, u.email, u.utc_offset_minutes, u.created_at
               FROM sessions s
               JOIN users u ON u.user_id = s.user_id
               WHERE s.token_hash = ?1 AND s.expires_at > ?2",
              rusqlite::params![token_hash, now_str],
              raw_user,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn delete_session(&self, token_hash: &str) -> Result<()> {
    let token_hash = token_hash.to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM sessions WHERE token_hash = ?1",
          rusqlite::params![token_hash],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
    let now_str = encode_dt(now);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM sessions WHERE expires_at <= ?1",
          rusqlite::params![now_str],
        )?)
      })
      .await?;
    Ok(removed)
  }
}
