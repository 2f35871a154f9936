//! Built-in agent templates.
//!
//! Starting points offered in the template gallery. Each one carries a
//! complete, valid configuration so a cloned session can be deployed
//! after only renaming it.

use std::collections::BTreeSet;

use chrono::Utc;

use kbatlas_types::builder::{
    AdvancedSection, AgentCategory, BasicSection, BuilderConfig, BuilderId, InstructionExample,
    InstructionsSection, ToolsSection,
};
use kbatlas_types::template::{AgentTemplate, TemplateDifficulty};

fn tags(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// The templates shipped with KB-Atlas.
///
/// | Id                 | Category | Temp | Tools                 |
/// |--------------------|----------|------|-----------------------|
/// | customer-support   | support  | 0.4  | file search           |
/// | research-assistant | research | 0.5  | file search, code     |
/// | code-reviewer      | coding   | 0.2  | code interpreter      |
pub fn builtin_templates() -> Vec<AgentTemplate> {
    vec![customer_support(), research_assistant(), code_reviewer()]
}

fn template(
    id: &str,
    difficulty: TemplateDifficulty,
    basic: BasicSection,
    instructions: InstructionsSection,
    tools: ToolsSection,
    advanced: AdvancedSection,
) -> AgentTemplate {
    let mut config = BuilderConfig::new(BuilderId::new());
    let name = basic.name.clone();
    let description = basic.description.clone();
    let category = basic.category;
    let template_tags = basic.tags.clone();
    config.basic = basic;
    config.instructions = instructions;
    config.tools = tools;
    config.advanced = advanced;

    AgentTemplate {
        id: id.to_string(),
        name,
        description,
        category,
        config,
        tags: template_tags,
        difficulty,
        is_public: true,
        created_at: Utc::now(),
    }
}

fn customer_support() -> AgentTemplate {
    template(
        "customer-support",
        TemplateDifficulty::Beginner,
        BasicSection {
            name: "Customer Support Agent".to_string(),
            description: "Answers customer questions from your help-center articles".to_string(),
            model: "gpt-4o".to_string(),
            category: AgentCategory::Support,
            tags: tags(&["support", "helpdesk"]),
        },
        InstructionsSection {
            system_prompt: "You are a friendly customer support agent. Answer questions using \
                            the attached knowledge base. If the answer is not there, say so and \
                            offer to escalate to a human."
                .to_string(),
            personality: "empathetic".to_string(),
            goals: strings(&["Resolve the customer's issue", "Keep answers short"]),
            constraints: strings(&["Never invent order details", "Never share internal notes"]),
            examples: vec![InstructionExample {
                input: "Where is my order?".to_string(),
                output: "I can help with that. Could you share your order number?".to_string(),
                explanation: "Ask for identifying details before answering.".to_string(),
            }],
        },
        ToolsSection {
            file_search: true,
            ..Default::default()
        },
        AdvancedSection {
            temperature: 0.4,
            max_tokens: 2048,
            ..Default::default()
        },
    )
}

fn research_assistant() -> AgentTemplate {
    template(
        "research-assistant",
        TemplateDifficulty::Intermediate,
        BasicSection {
            name: "Research Assistant".to_string(),
            description: "Summarizes documents and runs quick data analysis".to_string(),
            model: "gpt-4o".to_string(),
            category: AgentCategory::Research,
            tags: tags(&["research", "analysis"]),
        },
        InstructionsSection {
            system_prompt: "You are a careful research assistant. Cite the source document for \
                            every claim and use code to verify any numbers you report."
                .to_string(),
            personality: "scholarly".to_string(),
            goals: strings(&["Produce accurate, sourced summaries"]),
            constraints: strings(&["Flag uncertainty explicitly"]),
            examples: Vec::new(),
        },
        ToolsSection {
            code_interpreter: true,
            file_search: true,
            ..Default::default()
        },
        AdvancedSection {
            temperature: 0.5,
            max_tokens: 4096,
            ..Default::default()
        },
    )
}

fn code_reviewer() -> AgentTemplate {
    template(
        "code-reviewer",
        TemplateDifficulty::Advanced,
        BasicSection {
            name: "Code Reviewer".to_string(),
            description: "Reviews diffs for bugs, style issues, and missing tests".to_string(),
            model: "gpt-4o".to_string(),
            category: AgentCategory::Coding,
            tags: tags(&["coding", "review"]),
        },
        InstructionsSection {
            system_prompt: "You review code changes. Point out bugs first, then risky patterns, \
                            then style. Suggest concrete fixes."
                .to_string(),
            personality: "technical".to_string(),
            goals: strings(&["Catch correctness bugs", "Keep feedback actionable"]),
            constraints: strings(&["Do not rewrite unrelated code"]),
            examples: Vec::new(),
        },
        ToolsSection {
            code_interpreter: true,
            ..Default::default()
        },
        AdvancedSection {
            temperature: 0.2,
            max_tokens: 4096,
            ..Default::default()
        },
    )
}
