//! Handlers for the book endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/book/addBook` | Body: [`AddBookBody`]; 201 + stored book |
//! | `GET`    | `/book/viewBooks` | The owner's books |
//! | `GET`    | `/book/viewBook/{bookId}` | 404 if not found |
//! | `PUT`    | `/book/startReading/{bookId}` | `To Be Read → Current Read` |
//! | `PUT`    | `/book/closeBook/{bookId}` | `Current Read → To Be Read` |
//! | `PUT`    | `/book/updateProgress/{bookId}` | Body: [`ProgressBody`] |
//! | `PUT`    | `/book/updateBook/{bookId}` | Body: [`UpdateBookBody`] |
//! | `PUT`    | `/book/updateNotes/{bookId}` | Body: `{"notes":"..."}` |
//! | `DELETE` | `/book/deleteBook/{bookId}` | 200 + deleted row |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use readtrack_core::{
  BookId,
  book::{BookDetails, BookStatus, NewBook, Transition},
  progress::{ProgressUpdate, RawPage, parse_id, parse_page},
  store::ReadingStore,
};
use serde::Deserialize;
use serde_json::json;

use crate::{AppState, auth::CurrentUser, error::ApiError, extract::JsonBody};

fn book_id(raw: &str) -> Result<BookId, ApiError> {
  parse_id(raw).ok_or_else(|| ApiError::BadRequest("Invalid book id.".to_string()))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /book/addBook`. Page counts may be sent as
/// numbers or numeric strings.
#[derive(Debug, Deserialize)]
pub struct AddBookBody {
  pub title:      Option<String>,
  pub author:     Option<String>,
  pub total_page: Option<RawPage>,
  pub status:     Option<String>,
  pub page_read:  Option<RawPage>,
  pub notes:      Option<String>,
  pub user_id:    Option<i64>,
}

impl AddBookBody {
  fn into_new_book(self) -> Result<NewBook, ApiError> {
    let missing = || ApiError::BadRequest("Missing required fields".to_string());

    let title = self.title.filter(|t| !t.trim().is_empty()).ok_or_else(missing)?;
    let author = self.author.filter(|a| !a.trim().is_empty()).ok_or_else(missing)?;
    let status = self.status.ok_or_else(missing)?;
    let total_page = self.total_page.ok_or_else(missing)?;
    let page_read = self.page_read.ok_or_else(missing)?;

    let total_page = parse_page(&total_page.0)
      .ok_or_else(|| ApiError::BadRequest("total_page must be an integer".to_string()))?;
    let page_read = parse_page(&page_read.0)
      .ok_or_else(|| ApiError::BadRequest("page_read must be an integer".to_string()))?;
    let status = BookStatus::parse(&status).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok(NewBook {
      title,
      author,
      total_page,
      status,
      page_read,
      notes: self.notes,
    })
  }
}

/// `POST /book/addBook`: returns 201 + the stored book.
pub async fn add_book<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  JsonBody(body): JsonBody<AddBookBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReadingStore + Clone + 'static,
{
  user.ensure_owner(body.user_id)?;
  let input = body.into_new_book()?;

  let book = state
    .store
    .add_book(user.0.user_id, input)
    .await
    .map_err(ApiError::store("Failed to add new book"))?;

  tracing::info!(book_id = book.id, user_id = book.user_id, "book added");
  Ok((
    StatusCode::CREATED,
    Json(json!({ "message": "New book added successfully", "book": book })),
  ))
}

// ─── Read ─────────────────────────────────────────────────────────────────────

/// `GET /book/viewBooks`
pub async fn view_books<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReadingStore + Clone + 'static,
{
  let books = state
    .store
    .list_books(user.user_id)
    .await
    .map_err(ApiError::store("Failed to retrieve books"))?;
  Ok(Json(json!({ "message": "Books retrieved successfully", "books": books })))
}

/// `GET /book/viewBook/{bookId}`
pub async fn view_book<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReadingStore + Clone + 'static,
{
  let id = book_id(&raw_id)?;
  let book = state
    .store
    .get_book(user.user_id, id)
    .await
    .map_err(ApiError::store("Failed to retrieve book"))?
    .ok_or_else(|| ApiError::NotFound("Book not found".to_string()))?;
  Ok(Json(json!({ "book": book })))
}

// ─── Status transitions ──────────────────────────────────────────────────────

async fn transition<S>(
  state: &AppState<S>,
  user: &CurrentUser,
  raw_id: &str,
  transition: Transition,
  not_found: &str,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: ReadingStore + Clone + 'static,
{
  let id = book_id(raw_id)?;
  let book = state
    .store
    .transition_status(user.0.user_id, id, transition)
    .await
    .map_err(ApiError::store("Failed to update book status"))?
    .ok_or_else(|| ApiError::NotFound(not_found.to_string()))?;

  Ok(Json(json!({
    "message": format!("Book status updated to {}", transition.to),
    "book": book,
  })))
}

/// `PUT /book/startReading/{bookId}`
pub async fn start_reading<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(raw_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: ReadingStore + Clone + 'static,
{
  transition(
    &state,
    &user,
    &raw_id,
    Transition::START_READING,
    "Book not found or already in progress",
  )
  .await
}

/// `PUT /book/closeBook/{bookId}`
pub async fn close_book<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(raw_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: ReadingStore + Clone + 'static,
{
  transition(
    &state,
    &user,
    &raw_id,
    Transition::CLOSE_BOOK,
    "Book not found or not currently being read",
  )
  .await
}

// ─── Progress ─────────────────────────────────────────────────────────────────

/// JSON body accepted by `PUT /book/updateProgress/{bookId}`.
#[derive(Debug, Deserialize)]
pub struct ProgressBody {
  #[serde(rename = "initialPage", default)]
  pub initial_page: RawPage,
  #[serde(rename = "lastPage", default)]
  pub last_page:    RawPage,
  #[serde(rename = "userId")]
  pub user_id:      Option<i64>,
}

/// `PUT /book/updateProgress/{bookId}`: records one reading session for the
/// owner's current local day.
pub async fn update_progress<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(raw_id): Path<String>,
  JsonBody(body): JsonBody<ProgressBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReadingStore + Clone + 'static,
{
  user.ensure_owner(body.user_id)?;
  let update = ProgressUpdate::new(&raw_id, body.initial_page, &body.last_page)
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

  let today = user.0.local_today(Utc::now());
  let (book_id, last_page) = (update.book_id, update.last_page);

  let book = state
    .store
    .update_progress(user.0.user_id, update, today)
    .await
    .map_err(ApiError::store("Failed to update progress"))?;

  tracing::info!(book_id, last_page, %today, status = %book.status, "progress recorded");
  Ok(Json(json!({ "message": "Progress updated successfully", "book": book })))
}

// ─── Edit ─────────────────────────────────────────────────────────────────────

/// JSON body accepted by `PUT /book/updateBook/{bookId}`.
#[derive(Debug, Deserialize)]
pub struct UpdateBookBody {
  pub title:       Option<String>,
  pub author:      Option<String>,
  pub total_pages: Option<RawPage>,
}

/// `PUT /book/updateBook/{bookId}`
pub async fn update_book<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Path(raw_id): Path<String>,
  JsonBody(body): JsonBody<UpdateBookBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReadingStore + Clone + 'static,
{
  let id = book_id(&raw_id)?;
  let (Some(title), Some(author), Some(total_pages)) = (body.title, body.author, body.total_pages)
  else {
    return Err(ApiError::BadRequest("Missing required book details.".to_string()));
  };
  let total_page = parse_page(&total_pages.0)
    .ok_or_else(|| ApiError::BadRequest("total_pages must be an integer".to_string()))?;

  let book = state
    .store
    .update_book_details(user.user_id, id, BookDetails { title, author, total_page })
    .await
    .map_err(ApiError::store("Failed to update the book."))?
    .ok_or_else(|| ApiError::NotFound("Book not found.".to_string()))?;

  Ok(Json(json!({ "message": "Book updated successfully.", "book": book })))
}

#[derive(Debug, Deserialize)]
pub struct NotesBody {
  pub notes: Option<String>,
}

/// `PUT /book/updateNotes/{bookId}`
pub async fn update_notes<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Path(raw_id): Path<String>,
  JsonBody(body): JsonBody<NotesBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReadingStore + Clone + 'static,
{
  let id = book_id(&raw_id)?;
  let book = state
    .store
    .update_notes(user.user_id, id, body.notes)
    .await
    .map_err(ApiError::store("Failed to update notes."))?
    .ok_or_else(|| ApiError::NotFound("Book not found.".to_string()))?;

  Ok(Json(json!({ "message": "Notes updated successfully.", "book": book })))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /book/deleteBook/{bookId}`: reading history for the book is kept.
pub async fn delete_book<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReadingStore + Clone + 'static,
{
  let id = book_id(&raw_id)?;
  let book = state
    .store
    .delete_book(user.user_id, id)
    .await
    .map_err(ApiError::store("Failed to delete book"))?
    .ok_or_else(|| ApiError::NotFound("Book not found".to_string()))?;

  tracing::info!(book_id = book.id, "book deleted");
  Ok(Json(json!({ "message": "Book deleted successfully", "deletedBook": book })))
}
