//! Handlers for the learning list.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/book/learning` | 404 until the first save |
//! | `PUT`  | `/book/learning/{userId}` | Body: `{"learning_list":"..."}`; 201 on create, 200 on update |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use readtrack_core::{learning::LearningUpsert, progress::parse_id, store::ReadingStore};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{AppState, auth::CurrentUser, error::ApiError, extract::JsonBody};

/// `GET /book/learning`
pub async fn view<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
) -> Result<Json<Value>, ApiError>
where
  S: ReadingStore + Clone + 'static,
{
  let note = state
    .store
    .get_learning(user.user_id)
    .await
    .map_err(ApiError::store("Failed to retrieve learning item"))?
    .ok_or_else(|| ApiError::NotFound("Learning item not found".to_string()))?;

  Ok(Json(json!({
    "message": "Learning item retrieved successfully",
    "learningItem": note,
  })))
}

#[derive(Debug, Deserialize)]
pub struct LearningBody {
  pub learning_list: Option<String>,
}

/// `PUT /book/learning/{userId}`
pub async fn upsert<S>(
  State(state): State<AppState<S>>,
  user: CurrentUser,
  Path(raw_user_id): Path<String>,
  JsonBody(body): JsonBody<LearningBody>,
) -> Result<(StatusCode, Json<Value>), ApiError>
where
  S: ReadingStore + Clone + 'static,
{
  let user_id = parse_id(&raw_user_id)
    .ok_or_else(|| ApiError::BadRequest("Invalid user id.".to_string()))?;
  user.ensure_owner(Some(user_id))?;

  let learning_list = body
    .learning_list
    .filter(|l| !l.trim().is_empty())
    .ok_or_else(|| ApiError::BadRequest("Missing required field: learning_list".to_string()))?;

  let upsert = state
    .store
    .upsert_learning(user_id, learning_list)
    .await
    .map_err(ApiError::store("Failed to update/insert learning item"))?;

  let (status, message) = match &upsert {
    LearningUpsert::Created(_) => (StatusCode::CREATED, "Learning item created successfully"),
    LearningUpsert::Updated(_) => (StatusCode::OK, "Learning item updated successfully"),
  };

  Ok((
    status,
    Json(json!({ "message": message, "learningItem": upsert.into_note() })),
  ))
}
