//! # Roleforge Store
//!
//! Storage abstraction for the roleforge catalog. Provides a trait-based
//! interface for role/permission persistence with SQLite and in-memory
//! implementations.
//!
//! ## Overview
//!
//! The store module abstracts catalog storage behind the [`RoleStore`]
//! trait, keeping the synthesis engine storage-agnostic. The primary
//! implementation is [`SqliteStore`], with [`MemoryStore`] for tests.
//!
//! ## Key Types
//!
//! - [`RoleStore`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`UpsertResult`] - Outcome of an idempotent upsert
//!
//! ## Design Notes
//!
//! - **Idempotent upserts**: `(name, guard_name)` identifies roles and
//!   permissions; repeating an upsert returns `Existing`
//! - **Full-replace sync**: role membership is rewritten, never patched
//! - **Create-then-assign**: assigning an uncreated permission errors
//! - **Explicit reset only**: reconciliation never deletes permissions;
//!   `clear_catalog` is the one deletion hook and it spares roles

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{RoleStore, UpsertResult};
