//! Core types and trait definitions for the reading tracker.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! The storage backend and the API layer both depend on it.

#![allow(async_fn_in_trait)]

pub mod book;
pub mod error;
pub mod history;
pub mod learning;
pub mod progress;
pub mod store;
pub mod user;

pub use error::{Error, Result};

/// Identifier of a row in the book store.
pub type BookId = i64;

/// Identifier of an account; every book, history entry and learning note
/// belongs to exactly one owner.
pub type UserId = i64;
