//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`exports`] - Export submission, status and listing
//! - [`download`] - Authenticated archive download
//! - [`system`] - Health and OpenAPI

mod download;
mod exports;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use download::*;
pub use exports::*;
pub use system::*;
