//! Account handlers: registration, login and logout.

use axum::{
  Json,
  extract::State,
  http::{HeaderMap, StatusCode, header},
  response::IntoResponse,
};
use chrono::Utc;
use readtrack_core::{
  store::ReadingStore,
  user::{NewSession, NewUser, validate_registration},
};
use serde::Deserialize;
use serde_json::json;

use crate::{
  AppState,
  auth::{
    CurrentUser, cleared_cookie, generate_token, hash_password, hash_token, session_cookie,
    token_from_headers, verify_password,
  },
  error::ApiError,
  extract::JsonBody,
};

const BAD_CREDENTIALS: &str = "Invalid email or password.";

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub email:              Option<String>,
  pub password:           Option<String>,
  /// The owner's calendar convention; defaults to UTC.
  pub utc_offset_minutes: Option<i32>,
}

/// `POST /book/registerUser`: returns 201 + `{user:{user_id, email}}`.
pub async fn register<S>(
  State(state): State<AppState<S>>,
  JsonBody(body): JsonBody<RegisterBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReadingStore + Clone + 'static,
{
  let (Some(email), Some(password)) = (body.email, body.password) else {
    return Err(ApiError::BadRequest("Email and password are required".to_string()));
  };
  let utc_offset_minutes = body.utc_offset_minutes.unwrap_or(0);
  validate_registration(&email, &password, utc_offset_minutes)
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

  let password_hash = hash_password(&password).map_err(|e| ApiError::Store {
    message: "Failed to register",
    source:  e.to_string().into(),
  })?;

  let user = state
    .store
    .create_user(NewUser { email, password_hash, utc_offset_minutes })
    .await
    .map_err(ApiError::store("Failed to register"))?;

  tracing::info!(user_id = user.user_id, "user registered");
  Ok((
    StatusCode::CREATED,
    Json(json!({
      "message": "User registered successfully",
      "user": { "user_id": user.user_id, "email": user.email },
    })),
  ))
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    Option<String>,
  pub password: Option<String>,
}

/// `POST /book/loginUser`: opens a session and sets the `token` cookie.
pub async fn login<S>(
  State(state): State<AppState<S>>,
  JsonBody(body): JsonBody<LoginBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReadingStore + Clone + 'static,
{
  let (Some(email), Some(password)) = (body.email, body.password) else {
    return Err(ApiError::BadRequest("Email and password are required".to_string()));
  };

  let (user, phc) = state
    .store
    .find_credentials(&email)
    .await
    .map_err(ApiError::store("Failed to login"))?
    .ok_or_else(|| ApiError::Unauthorized(BAD_CREDENTIALS.to_string()))?;

  if !verify_password(&password, &phc) {
    tracing::warn!(user_id = user.user_id, "login failed");
    return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
  }

  let now = Utc::now();
  match state.store.purge_expired_sessions(now).await {
    Ok(0) => {}
    Ok(removed) => tracing::debug!(removed, "purged expired sessions"),
    Err(e) => tracing::warn!(error = %e, "failed to purge expired sessions"),
  }

  let token = generate_token();
  state
    .store
    .create_session(NewSession {
      token_hash: hash_token(&token),
      user_id:    user.user_id,
      expires_at: now + state.auth.session_ttl,
    })
    .await
    .map_err(ApiError::store("Failed to login"))?;

  tracing::info!(user_id = user.user_id, "user logged in");
  Ok((
    [(header::SET_COOKIE, session_cookie(&token, &state.auth))],
    Json(json!({
      "message": "Login successful",
      "user": { "user_id": user.user_id, "email": user.email, "token": token },
    })),
  ))
}

/// `POST /book/logout`: ends the presenting session.
pub async fn logout<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReadingStore + Clone + 'static,
{
  if let Some(token) = token_from_headers(&headers) {
    state
      .store
      .delete_session(&hash_token(&token))
      .await
      .map_err(ApiError::store("Failed to logout"))?;
  }

  tracing::info!(user_id = user.user_id, "user logged out");
  Ok((
    [(header::SET_COOKIE, cleared_cookie())],
    Json(json!({ "message": "Logged out" })),
  ))
}
