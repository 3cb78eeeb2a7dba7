//! Middleware Module
//!
//! Cross-cutting request handling layered in front of the handlers:
//! request id + logging context, then the Redis session.

pub mod request_context;
pub mod session;

pub use request_context::request_context_middleware;
pub use session::{Session, session_middleware};
