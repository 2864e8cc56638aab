//! HTTP request handlers, one module per resource.

pub mod events;
pub mod health;
