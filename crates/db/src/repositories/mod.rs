//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async queries that
//! accept `&PgPool` as the first argument.

pub mod content_lock_repo;
pub mod user_repo;

pub use content_lock_repo::ContentLockRepo;
pub use user_repo::UserRepo;
