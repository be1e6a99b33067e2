//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for the add-on endpoints
//! - **[`models`]**: Request/response data structures

pub mod handlers;
pub mod models;
