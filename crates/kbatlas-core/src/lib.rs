//! Business logic and port trait definitions for KB-Atlas.
//!
//! This crate defines the "ports" (repository and provider traits) that the
//! infrastructure layer implements, plus the agent builder itself: the
//! session store, step controller, validation, and deployment publisher.
//! It depends only on `kbatlas-types` -- never on `kbatlas-infra` or any
//! database/IO crate.

pub mod builder;
pub mod provider;
pub mod repository;
