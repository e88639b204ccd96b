//! The learning list: a single free-text note per owner.

use serde::{Deserialize, Serialize};

use crate::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningNote {
  pub id:            i64,
  pub user_id:       UserId,
  pub learning_list: String,
}

/// Result of [`crate::store::ReadingStore::upsert_learning`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LearningUpsert {
  /// No note existed for the owner; a new row was inserted.
  Created(LearningNote),
  Updated(LearningNote),
}

impl LearningUpsert {
  pub fn note(&self) -> &LearningNote {
    match self {
      Self::Created(n) | Self::Updated(n) => n,
    }
  }

  pub fn into_note(self) -> LearningNote {
    match self {
      Self::Created(n) | Self::Updated(n) => n,
    }
  }
}
