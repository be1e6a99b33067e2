//! HTTP request handlers for the add-on endpoints.
//!
//! - [`diagram`]: the authenticated macro route — renders a diagram and
//!   persists it as a page attachment, falling back to an inline preview
//! - [`preview`]: the unauthenticated, cacheable inline render route
//!
//! Handlers return [`crate::errors::Error`], which converts to an
//! appropriate HTTP status code and a user-safe message.

pub mod diagram;
pub mod preview;
