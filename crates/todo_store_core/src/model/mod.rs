//! Domain records persisted by the store.
//!
//! # Responsibility
//! - Define the `Todo` and `User` shapes exchanged with callers.
//! - Keep records free of storage concerns; SQL mapping lives in `repo`.
//!
//! # Invariants
//! - Ids are store-assigned surrogate keys; `None` (or `0`) means "not yet
//!   persisted".
//! - An assigned id never changes and is never reused after deletion.

pub mod todo;
pub mod user;

/// Numeric surrogate key shared by every entity.
pub type EntityId = i64;
