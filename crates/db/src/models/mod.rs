//! Row structs and DTOs.

pub mod content_lock;
pub mod user;
