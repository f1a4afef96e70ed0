//! API Module
//!
//! HTTP handlers and routing over the adaptive cache engine.
//!
//! # Endpoints
//! - `PUT /set` - Store a key-value pair
//! - `GET /get/:key` - Retrieve a value by key
//! - `GET /has/:key` - Check for a live entry
//! - `GET /inspect/:key` - Entry metadata
//! - `DELETE /del/:key` - Delete a key
//! - `POST /clear` - Reset the cache
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
