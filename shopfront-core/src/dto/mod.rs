//! Data Transfer Objects
//!
//! Request and response bodies of the HTTP API. Request DTOs derive
//! `validator::Validate`; the server rejects invalid bodies before they reach
//! a service.

pub mod auth;
pub mod cart;
