//! Repository Module
//!
//! Data access layer for the server.
//! `user` and `cart` talk to PostgreSQL, `token` owns the Redis keys of the
//! refresh token store and the blacklist.

pub mod cart;
pub mod token;
pub mod user;

// Re-export for convenience
pub use cart as cart_repository;
pub use token as token_repository;
pub use user as user_repository;
