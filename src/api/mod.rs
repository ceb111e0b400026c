//! API Module
//!
//! HTTP handlers and routing for the request cache admin API.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Cache statistics
//! - `GET /keys` - List stored keys
//! - `PUT /entries`, `DELETE /entries` - Write an entry, clear the cache
//! - `GET /entries/:key`, `DELETE /entries/:key` - Inspect or delete an entry
//! - `POST /invalidate` - Pattern invalidation
//! - `POST /warmup` - Seed entries

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
