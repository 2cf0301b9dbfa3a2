//! # sundial-store
//!
//! Storage layer for the Sundial scheduling service, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed repository methods for the two
//! domain entities, clients and appointments, plus the atomic
//! "create appointment with new client" transaction.  All request
//! validation lives in [`validate`] as pure functions so it can run before
//! any write is attempted.

pub mod appointments;
pub mod clients;
pub mod database;
pub mod migrations;
pub mod models;
pub mod validate;

mod error;
mod external_id;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
