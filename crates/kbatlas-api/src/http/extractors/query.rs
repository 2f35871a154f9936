//! Query parameter extractors for list endpoints.

use serde::Deserialize;

/// Query parameters for the template list endpoint.
#[derive(Debug, Deserialize)]
pub struct TemplateListQuery {
    /// Only templates marked public (default true).
    #[serde(default = "default_public_only")]
    pub public_only: bool,
}

fn default_public_only() -> bool {
    true
}
