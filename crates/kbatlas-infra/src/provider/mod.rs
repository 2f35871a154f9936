//! Agent provider adapters.

pub mod openai;
