//! HTTP/REST API layer for KB-Atlas.
//!
//! Axum-based REST API at `/api/v1/` with owner scoping via the
//! `X-Owner-Id` header, envelope response format, and CORS support.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
