//! Shared domain types for KB-Atlas.
//!
//! Builder sessions, agent templates, provider request types, global
//! configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod builder;
pub mod config;
pub mod error;
pub mod provider;
pub mod template;
