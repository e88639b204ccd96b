//! The `ReadingStore` trait.
//!
//! Implemented by storage backends (e.g. `readtrack-store-sqlite`). The API
//! layer depends on this abstraction, not on any concrete backend.
//!
//! Every book, history and learning operation is scoped to an owner: a row
//! belonging to another owner behaves exactly as if it did not exist.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};

use crate::{
  BookId, UserId,
  book::{Book, BookDetails, NewBook, Transition},
  history::ReadingHistoryEntry,
  learning::{LearningNote, LearningUpsert},
  progress::ProgressUpdate,
  user::{NewSession, NewUser, User},
};

/// Lets the API layer see the domain error (if any) behind a backend error,
/// so that validation and not-found failures are not reported as storage
/// failures.
pub trait AsCoreError {
  fn as_core(&self) -> Option<&crate::Error>;
}

impl AsCoreError for crate::Error {
  fn as_core(&self) -> Option<&crate::Error> { Some(self) }
}

/// Abstraction over a reading-tracker storage backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ReadingStore: Send + Sync {
  type Error: std::error::Error + AsCoreError + Send + Sync + 'static;

  // ── Books ─────────────────────────────────────────────────────────────

  /// Validate and insert a book. The identifier is assigned by the store.
  fn add_book(
    &self,
    owner: UserId,
    input: NewBook,
  ) -> impl Future<Output = Result<Book, Self::Error>> + Send + '_;

  fn list_books(
    &self,
    owner: UserId,
  ) -> impl Future<Output = Result<Vec<Book>, Self::Error>> + Send + '_;

  fn get_book(
    &self,
    owner: UserId,
    id: BookId,
  ) -> impl Future<Output = Result<Option<Book>, Self::Error>> + Send + '_;

  /// Replace title, author and total page count, recomputing the
  /// percentage. Returns `None` if the book does not exist.
  fn update_book_details(
    &self,
    owner: UserId,
    id: BookId,
    details: BookDetails,
  ) -> impl Future<Output = Result<Option<Book>, Self::Error>> + Send + '_;

  fn update_notes(
    &self,
    owner: UserId,
    id: BookId,
    notes: Option<String>,
  ) -> impl Future<Output = Result<Option<Book>, Self::Error>> + Send + '_;

  /// Delete a book and return the removed row. Reading history is kept.
  fn delete_book(
    &self,
    owner: UserId,
    id: BookId,
  ) -> impl Future<Output = Result<Option<Book>, Self::Error>> + Send + '_;

  /// Apply a guarded status change as a single conditional write.
  ///
  /// Returns `None` when the book is absent or not in `transition.from`.
  fn transition_status(
    &self,
    owner: UserId,
    id: BookId,
    transition: Transition,
  ) -> impl Future<Output = Result<Option<Book>, Self::Error>> + Send + '_;

  // ── Progress ──────────────────────────────────────────────────────────

  /// Record one reading session atomically.
  ///
  /// Rewrites the book's `page_read` and percentage, finishes the book when
  /// `last_page` reaches `total_page`, and creates or extends the history
  /// entry for (`book_id`, `today`). Either every write lands or none does.
  ///
  /// Fails with [`crate::Error::BookNotFound`] for a missing book and with
  /// [`crate::Error::InvalidInput`] for an unparseable initial page.
  fn update_progress(
    &self,
    owner: UserId,
    update: ProgressUpdate,
    today: NaiveDate,
  ) -> impl Future<Output = Result<Book, Self::Error>> + Send + '_;

  // ── History ───────────────────────────────────────────────────────────

  /// The owner's history, most recent day first.
  fn reading_history(
    &self,
    owner: UserId,
  ) -> impl Future<Output = Result<Vec<ReadingHistoryEntry>, Self::Error>> + Send + '_;

  // ── Learning list ─────────────────────────────────────────────────────

  fn get_learning(
    &self,
    owner: UserId,
  ) -> impl Future<Output = Result<Option<LearningNote>, Self::Error>> + Send + '_;

  /// Update the owner's note, inserting it if none exists yet.
  fn upsert_learning(
    &self,
    owner: UserId,
    learning_list: String,
  ) -> impl Future<Output = Result<LearningUpsert, Self::Error>> + Send + '_;

  // ── Accounts ──────────────────────────────────────────────────────────

  /// Fails with [`crate::Error::EmailTaken`] if the email is registered.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Look up an account and its password hash by email.
  fn find_credentials<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<(User, String)>, Self::Error>> + Send + 'a;

  fn create_session(
    &self,
    session: NewSession,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Resolve a session digest to its owner, ignoring sessions that expired
  /// before `now`.
  fn find_session<'a>(
    &'a self,
    token_hash: &'a str,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  fn delete_session<'a>(
    &'a self,
    token_hash: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove every session that expired before `now`; returns how many.
  fn purge_expired_sessions(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}
