//! Content lock engine: domain types, settings, storage seam, and the
//! acquire / write-check / sweep protocols.
//!
//! This crate has no database dependency. Persistence is abstracted behind
//! [`content_lock::store::LockStore`]; `lockedit-db` provides the PostgreSQL
//! implementation and [`content_lock::memory::MemoryLockStore`] an in-process
//! one.

pub mod content_lock;
pub mod error;
pub mod maintenance;
pub mod notice;
pub mod roles;
pub mod settings;
pub mod types;
