//! Agent templates: named, reusable starting configurations.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::builder::{AgentCategory, BuilderConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateDifficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for TemplateDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TemplateDifficulty::Beginner => "beginner",
            TemplateDifficulty::Intermediate => "intermediate",
            TemplateDifficulty::Advanced => "advanced",
        };
        f.write_str(s)
    }
}

/// A stored template. Cloning one into a builder session copies `config`
/// under a fresh session id, positioned on the first step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTemplate {
    /// URL-safe template identifier (e.g. "customer-support").
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: AgentCategory,
    pub config: BuilderConfig,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub difficulty: TemplateDifficulty,
    #[serde(default)]
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}
