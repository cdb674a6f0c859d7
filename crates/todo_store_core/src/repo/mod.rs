//! Repository layer contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define the CRUD contract every entity shares plus entity-specific
//!   queries (`UserRepository::find_by_email`).
//! - Isolate SQL details from callers.
//!
//! # Invariants
//! - Write paths run `EntityMapping::prepare_for_write` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Repositories perform no retries and no logging; errors propagate as-is.

pub mod crud;
pub mod error;
pub mod todo_repo;
pub mod user_repo;
