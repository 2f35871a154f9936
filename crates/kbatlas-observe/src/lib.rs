//! Structured logging and optional OpenTelemetry trace export for KB-Atlas.

pub mod tracing_setup;
