//! Service Module
//!
//! Business logic layer of the server.
//! Services orchestrate between repositories and contain domain logic.

pub mod auth;
pub mod cart;
pub mod token;
pub mod user;

// Re-export for convenience
pub use auth as auth_service;
pub use cart as cart_service;
pub use user as user_service;
