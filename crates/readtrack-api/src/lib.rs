//! JSON REST API for the reading tracker.
//!
//! Exposes an axum [`Router`] backed by any [`ReadingStore`]. Every route
//! except registration and login requires a session token; TLS and other
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = readtrack_api::api_router(AppState::new(store, AuthSettings::default()));
//! ```

pub mod auth;
pub mod books;
pub mod error;
pub mod extract;
pub mod history;
pub mod learning;
pub mod users;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post, put},
};
use readtrack_core::store::ReadingStore;

pub use auth::AuthSettings;
pub use error::ApiError;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState<S: ReadingStore> {
  pub store: Arc<S>,
  pub auth:  Arc<AuthSettings>,
}

impl<S: ReadingStore> AppState<S> {
  pub fn new(store: S, auth: AuthSettings) -> Self {
    Self {
      store: Arc::new(store),
      auth:  Arc::new(auth),
    }
  }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested or layered by the caller
/// regardless of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: ReadingStore + Clone + 'static,
{
  Router::new()
    // Accounts
    .route("/book/registerUser", post(users::register::<S>))
    .route("/book/loginUser", post(users::login::<S>))
    .route("/book/logout", post(users::logout::<S>))
    // Books
    .route("/book/addBook", post(books::add_book::<S>))
    .route("/book/viewBooks", get(books::view_books::<S>))
    .route("/book/viewBook/{bookId}", get(books::view_book::<S>))
    .route("/book/startReading/{bookId}", put(books::start_reading::<S>))
    .route("/book/closeBook/{bookId}", put(books::close_book::<S>))
    .route("/book/updateProgress/{bookId}", put(books::update_progress::<S>))
    .route("/book/updateBook/{bookId}", put(books::update_book::<S>))
    .route("/book/updateNotes/{bookId}", put(books::update_notes::<S>))
    .route("/book/deleteBook/{bookId}", delete(books::delete_book::<S>))
    // History
    .route("/book/readingHistory", get(history::reading_history::<S>))
    // Learning list
    .route("/book/learning", get(learning::view::<S>))
    .route("/book/learning/{userId}", put(learning::upsert::<S>))
    .with_state(state)
}
