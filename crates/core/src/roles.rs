//! Well-known role name constants.
//!
//! These must match the `ck_users_role` check in
//! `20260301000001_create_users_table.sql`.

pub const ROLE_ADMIN: &str = "admin";
