//! Agent builder: a step-by-step wizard that assembles an agent
//! configuration, validates it, and publishes it to an external provider.
//!
//! - [`store`]: durable per-session state, owner-scoped and versioned
//! - [`controller`]: step navigation and whole-section edits
//! - [`publisher`]: deployment to the agent provider
//! - [`validation`]: whole-config checks run after every mutation
//! - [`templates`]: built-in starting points for new sessions

pub mod controller;
pub mod publisher;
pub mod store;
pub mod templates;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;
