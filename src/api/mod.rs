//! Worker control API.
//!
//! A small HTTP surface for liveness checks and for feeding job events to
//! the engine from outside the process.

mod error;
pub mod handlers;
pub mod routes;

pub use error::ErrorResponse;
pub use routes::create_router;
