//! OpenAI Assistants API provider implementation.
//!
//! This module provides the [`OpenAiAssistantsProvider`] which implements
//! the [`AgentProvider`](kbatlas_core::provider::AgentProvider) trait.

pub mod client;
pub mod types;

pub use client::OpenAiAssistantsProvider;
