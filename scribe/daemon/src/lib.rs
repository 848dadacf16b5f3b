//! Scribe Daemon - HTTP surface for the scribe writing backend
//!
//! Exposes [`scribe_core::WritingService`] over axum. Streaming endpoints
//! write one JSON object per segment as it is produced; buffered endpoints
//! answer once the provider has finished.
//!
//! # Module Overview
//!
//! - [`server`]: router assembly, middleware, serve loop
//! - [`handlers`]: one handler per endpoint
//! - [`error`]: HTTP error responses

#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, serve, AppState, API_PREFIX};
