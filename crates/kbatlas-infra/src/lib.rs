//! Infrastructure layer for KB-Atlas.
//!
//! Contains implementations of the ports defined in `kbatlas-core`: SQLite
//! storage for builder sessions and templates, the OpenAI Assistants
//! provider adapter, and the `config.toml` loader.

pub mod config;
pub mod provider;
pub mod sqlite;
