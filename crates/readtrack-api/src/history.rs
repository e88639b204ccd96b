//! Handler for `GET /book/readingHistory`.

use axum::{Json, extract::State};
use readtrack_core::store::ReadingStore;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{AppState, auth::CurrentUser, error::ApiError, extract::QueryParams};

#[derive(Debug, Deserialize, Default)]
pub struct HistoryParams {
  /// Optional; must name the authenticated user when present.
  #[serde(rename = "userId")]
  pub user_id: Option<i64>,
}

/// `GET /book/readingHistory[?userId=<id>]`: most recent day first, dates as
/// `YYYY-MM-DD`. 404 when the owner has no history yet.
pub async fn reading_history<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  QueryParams(params): QueryParams<HistoryParams>,
) -> Result<Json<Value>, ApiError>
where
  S: ReadingStore + Clone + 'static,
{
  user.ensure_owner(params.user_id)?;

  let records = state
    .store
    .reading_history(user.0.user_id)
    .await
    .map_err(ApiError::store("Failed to retrieve reading history"))?;

  if records.is_empty() {
    return Err(ApiError::NotFound("No reading records found".to_string()));
  }

  Ok(Json(json!({
    "message": "Reading records retrieved successfully",
    "readingRecords": records,
  })))
}
