//! Database Backend Abstractions
//!
//! The executor and row traits shared by the compiler and the loader, the
//! sqlx-backed MySQL implementation, and an in-memory scripted executor.

pub mod core;
pub mod memory;
pub mod mysql;

pub use core::*;
pub use memory::{MemoryRow, RecordedQuery, ScriptedExecutor};
pub use mysql::{MySqlConnection, MySqlDatabaseRow, MySqlTransaction};
