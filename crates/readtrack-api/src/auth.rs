//! Session-token authentication.
//!
//! A successful login hands out an opaque random token, both in the JSON body
//! and as an `HttpOnly` cookie named [`SESSION_COOKIE`]. Only the token's
//! SHA-256 digest is stored. Requests present the token either as that
//! cookie or as an `Authorization: Bearer` header.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{TimeDelta, Utc};
use rand_core::{OsRng, RngCore as _};
use readtrack_core::{UserId, store::ReadingStore, user::User};
use sha2::{Digest as _, Sha256};

use crate::{AppState, error::ApiError};

pub const SESSION_COOKIE: &str = "token";

const NO_TOKEN: &str = "Access denied. No token provided.";
const INVALID_TOKEN: &str = "Invalid token. Please log in again.";

/// Session settings shared by the login handler and the extractor.
#[derive(Debug, Clone)]
pub struct AuthSettings {
  pub session_ttl:    TimeDelta,
  /// Adds the `Secure` attribute to the session cookie.
  pub secure_cookies: bool,
}

impl Default for AuthSettings {
  fn default() -> Self {
    Self {
      session_ttl:    TimeDelta::hours(24),
      secure_cookies: false,
    }
  }
}

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Hash `password` into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)?
      .to_string(),
  )
}

/// `false` for a wrong password and for an unparseable stored hash.
pub fn verify_password(password: &str, phc: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(phc) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

/// 32 random bytes, URL-safe base64 without padding.
pub fn generate_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  URL_SAFE_NO_PAD.encode(bytes)
}

/// Hex SHA-256 digest under which a token is stored.
pub fn hash_token(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

/// The presented session token, from the cookie or a bearer header.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
  let from_cookie = headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(name, _)| *name == SESSION_COOKIE)
    .map(|(_, value)| value.to_string());

  from_cookie
    .or_else(|| {
      headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
    })
    .filter(|t| !t.is_empty())
}

/// `Set-Cookie` value carrying a fresh session token.
pub fn session_cookie(token: &str, settings: &AuthSettings) -> String {
  let mut cookie = format!(
    "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
    settings.session_ttl.num_seconds()
  );
  if settings.secure_cookies {
    cookie.push_str("; Secure");
  }
  cookie
}

/// `Set-Cookie` value that clears the session cookie.
pub fn cleared_cookie() -> String {
  format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The authenticated owner. Present in a handler means the request carried a
/// live session.
pub struct CurrentUser(pub User);

impl CurrentUser {
  /// Reject a request that names a different owner than the session's.
  pub fn ensure_owner(&self, claimed: Option<UserId>) -> Result<(), ApiError> {
    match claimed {
      Some(id) if id != self.0.user_id => {
        tracing::warn!(
          session_user = self.0.user_id,
          claimed_user = id,
          "request names another user"
        );
        Err(ApiError::Forbidden(
          "User id does not match the authenticated user".to_string(),
        ))
      }
      _ => Ok(()),
    }
  }
}

impl<S> FromRequestParts<AppState<S>> for CurrentUser
where
  S: ReadingStore + Clone + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = token_from_headers(&parts.headers).ok_or_else(|| {
      tracing::debug!("request without session token");
      ApiError::Unauthorized(NO_TOKEN.to_string())
    })?;

    let user = state
      .store
      .find_session(&hash_token(&token), Utc::now())
      .await
      .map_err(ApiError::store("Failed to verify session"))?
      .ok_or_else(|| {
        tracing::debug!("session token did not verify");
        ApiError::Forbidden(INVALID_TOKEN.to_string())
      })?;

    Ok(CurrentUser(user))
  }
}
