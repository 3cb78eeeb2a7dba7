//! Core domain types
//!
//! These types represent the entities the session, token and cart layer works
//! with. They are persisted by the server (PostgreSQL) and also serialized into
//! Redis (session hash, user cache).

pub mod cart;
pub mod user;
