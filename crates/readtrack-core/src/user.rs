//! Accounts and login sessions.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, UserId};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Accepted range for [`User::utc_offset_minutes`] (UTC−12:00 … UTC+14:00).
pub const UTC_OFFSET_RANGE: std::ops::RangeInclusive<i32> = -720..=840;

/// An account. The password hash is never part of this type; it is only
/// handed out by [`crate::store::ReadingStore::find_credentials`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:            UserId,
  pub email:              String,
  /// The owner's calendar convention, used to decide what "today" is when
  /// recording a reading session.
  pub utc_offset_minutes: i32,
  pub created_at:         DateTime<Utc>,
}

impl User {
  /// The owner's local calendar day at `now`.
  pub fn local_today(&self, now: DateTime<Utc>) -> NaiveDate {
    match FixedOffset::east_opt(self.utc_offset_minutes * 60) {
      Some(offset) => now.with_timezone(&offset).date_naive(),
      None => now.date_naive(),
    }
  }
}

/// Input to [`crate::store::ReadingStore::create_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub email:              String,
  /// PHC string, e.g. `$argon2id$v=19$…`
  pub password_hash:      String,
  pub utc_offset_minutes: i32,
}

/// Check registration input before the password is hashed.
pub fn validate_registration(
  email: &str,
  password: &str,
  utc_offset_minutes: i32,
) -> Result<()> {
  let email = email.trim();
  if email.is_empty() || !email.contains('@') {
    return Err(Error::invalid("a valid email address is required"));
  }
  if password.chars().count() < MIN_PASSWORD_LEN {
    return Err(Error::invalid(format!(
      "password must be at least {MIN_PASSWORD_LEN} characters"
    )));
  }
  if !UTC_OFFSET_RANGE.contains(&utc_offset_minutes) {
    return Err(Error::invalid("utc_offset_minutes is out of range"));
  }
  Ok(())
}

/// A login session. Only the SHA-256 digest of the bearer token is stored.
#[derive(Debug, Clone)]
pub struct NewSession {
  pub token_hash: String,
  pub user_id:    UserId,
  pub expires_at: DateTime<Utc>,
}
