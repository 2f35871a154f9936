//! Whole-config validation.
//!
//! Runs after every mutation over the entire [`BuilderConfig`], not just the
//! section that changed. Errors block deployment; warnings never do.

use std::collections::{BTreeMap, HashSet};

use kbatlas_types::builder::{
    BuilderConfig, BuilderStep, MAX_TOKENS_LIMIT, ProcessingStatus, ValidationReport,
};

const NO_CAPABILITIES_WARNING: &str =
    "Agent will have no capabilities beyond conversation: no tools enabled and no functions defined";
const NO_VECTOR_STORE_WARNING: &str = "File search enabled with no vector store";

/// Validate a full configuration.
///
/// `is_valid` is true iff no step produced an error. A step without
/// errors has no entry in `step_errors`.
pub fn validate(config: &BuilderConfig) -> ValidationReport {
    let mut step_errors: BTreeMap<BuilderStep, Vec<String>> = BTreeMap::new();
    let mut warnings = Vec::new();

    let mut push = |step: BuilderStep, message: String| {
        step_errors.entry(step).or_default().push(message);
    };

    // Basic
    if config.basic.name.trim().is_empty() {
        push(BuilderStep::Basic, "Agent name is required".to_string());
    }
    if config.basic.description.trim().is_empty() {
        push(BuilderStep::Basic, "Description is required".to_string());
    }
    if config.basic.model.trim().is_empty() {
        push(BuilderStep::Basic, "Model is required".to_string());
    }

    // Instructions
    if config.instructions.system_prompt.trim().is_empty() {
        push(
            BuilderStep::Instructions,
            "System prompt is required".to_string(),
        );
    }

    // Tools
    let tools = &config.tools;
    if !tools.code_interpreter && !tools.file_search && tools.functions.is_empty() {
        warnings.push(NO_CAPABILITIES_WARNING.to_string());
    }
    let mut seen = HashSet::new();
    for function in &tools.functions {
        let name = function.name.trim();
        if name.is_empty() {
            if function.enabled {
                push(BuilderStep::Tools, "Function name is required".to_string());
            }
            continue;
        }
        if !seen.insert(name) {
            push(
                BuilderStep::Tools,
                format!("Duplicate function name: '{name}'"),
            );
        }
    }

    // Files
    if tools.file_search && config.files.vector_store_ids.is_empty() {
        warnings.push(NO_VECTOR_STORE_WARNING.to_string());
    }
    for file in config
        .files
        .knowledge_files
        .iter()
        .chain(&config.files.code_files)
    {
        if file.processing_status == ProcessingStatus::Failed {
            warnings.push(format!("File '{}' failed processing", file.name));
        }
    }

    // Advanced
    let advanced = &config.advanced;
    if !(0.0..=2.0).contains(&advanced.temperature) {
        push(
            BuilderStep::Advanced,
            "Temperature must be between 0 and 2".to_string(),
        );
    }
    if !(0.0..=1.0).contains(&advanced.top_p) {
        push(
            BuilderStep::Advanced,
            "Top P must be between 0 and 1".to_string(),
        );
    }
    if advanced.max_tokens < 1 {
        push(
            BuilderStep::Advanced,
            "Max tokens must be at least 1".to_string(),
        );
    } else if advanced.max_tokens > MAX_TOKENS_LIMIT {
        push(
            BuilderStep::Advanced,
            format!("Max tokens must not exceed {MAX_TOKENS_LIMIT}"),
        );
    }
    if !(-2.0..=2.0).contains(&advanced.frequency_penalty) {
        push(
            BuilderStep::Advanced,
            "Frequency penalty must be between -2 and 2".to_string(),
        );
    }
    if !(-2.0..=2.0).contains(&advanced.presence_penalty) {
        push(
            BuilderStep::Advanced,
            "Presence penalty must be between -2 and 2".to_string(),
        );
    }

    let is_valid = step_errors.is_empty();
    ValidationReport {
        step_errors,
        warnings,
        is_valid,
    }
}

#[cfg(test)]
mod tests {
    use kbatlas_types::builder::{
        AgentFile, AgentFileType, BuilderId, CustomFunction, FunctionImplementation,
    };

    use super::*;

    fn valid_config() -> BuilderConfig {
        let mut config = BuilderConfig::new(BuilderId::new());
        config.basic.name = "Support Bot".to_string();
        config.basic.description = "Handles tickets".to_string();
        config.instructions.system_prompt = "You triage support tickets.".to_string();
        config.tools.code_interpreter = true;
        config
    }

    fn function(name: &str) -> CustomFunction {
        CustomFunction {
            id: format!("fn_{name}"),
            name: name.to_string(),
            description: String::new(),
            parameters: serde_json::json!({"type": "object"}),
            implementation: FunctionImplementation::External(serde_json::Value::Null),
            test_cases: Vec::new(),
            enabled: true,
        }
    }

    #[test]
    fn test_valid_config_has_no_errors_or_warnings() {
        let report = validate(&valid_config());
        assert!(report.is_valid);
        assert!(report.step_errors.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_empty_name_flags_basic_step() {
        let mut config = valid_config();
        config.basic.name = String::new();

        let report = validate(&config);
        assert!(!report.is_valid);
        assert!(!report.errors_for(BuilderStep::Basic).is_empty());
    }

    #[test]
    fn test_whitespace_only_fields_count_as_empty() {
        let mut config = valid_config();
        config.basic.description = "   ".to_string();
        config.instructions.system_prompt = "\n".to_string();

        let report = validate(&config);
        assert_eq!(report.errors_for(BuilderStep::Basic).len(), 1);
        assert_eq!(report.errors_for(BuilderStep::Instructions).len(), 1);
    }

    #[test]
    fn test_fresh_config_reports_every_required_field() {
        let report = validate(&BuilderConfig::new(BuilderId::new()));
        assert!(!report.is_valid);
        // Name and description missing; default model is present.
        assert_eq!(report.errors_for(BuilderStep::Basic).len(), 2);
        assert_eq!(report.errors_for(BuilderStep::Instructions).len(), 1);
        assert!(report.errors_for(BuilderStep::Advanced).is_empty());
        assert!(report.warnings.iter().any(|w| w.contains("no capabilities")));
    }

    #[test]
    fn test_temperature_out_of_range_flags_advanced() {
        for temperature in [-0.1, 2.01, f64::NAN] {
            let mut config = valid_config();
            config.advanced.temperature = temperature;
            let report = validate(&config);
            assert!(!report.is_valid, "temperature {temperature} accepted");
            assert_eq!(report.errors_for(BuilderStep::Advanced).len(), 1);
        }
    }

    #[test]
    fn test_temperature_bounds_are_inclusive() {
        for temperature in [0.0, 2.0] {
            let mut config = valid_config();
            config.advanced.temperature = temperature;
            assert!(validate(&config).is_valid);
        }
    }

    #[test]
    fn test_top_p_and_max_tokens_limits() {
        let mut config = valid_config();
        config.advanced.top_p = 1.5;
        config.advanced.max_tokens = 0;
        let report = validate(&config);
        assert_eq!(report.errors_for(BuilderStep::Advanced).len(), 2);

        let mut config = valid_config();
        config.advanced.max_tokens = MAX_TOKENS_LIMIT + 1;
        assert!(!validate(&config).is_valid);
    }

    #[test]
    fn test_penalties_out_of_range() {
        let mut config = valid_config();
        config.advanced.frequency_penalty = 2.5;
        config.advanced.presence_penalty = -3.0;
        let report = validate(&config);
        assert_eq!(report.errors_for(BuilderStep::Advanced).len(), 2);
    }

    #[test]
    fn test_no_tools_is_a_warning_not_an_error() {
        let mut config = valid_config();
        config.tools.code_interpreter = false;

        let report = validate(&config);
        assert!(report.is_valid);
        assert_eq!(report.warnings, vec![NO_CAPABILITIES_WARNING.to_string()]);
    }

    #[test]
    fn test_functions_alone_count_as_capabilities() {
        let mut config = valid_config();
        config.tools.code_interpreter = false;
        config.tools.functions.push(function("lookup_order"));

        assert!(validate(&config).warnings.is_empty());
    }

    #[test]
    fn test_file_search_without_vector_store_warns() {
        let mut config = valid_config();
        config.tools.file_search = true;

        let report = validate(&config);
        assert!(report.is_valid);
        assert!(report.warnings.contains(&NO_VECTOR_STORE_WARNING.to_string()));

        config.files.vector_store_ids.insert("vs_1".to_string());
        assert!(validate(&config).warnings.is_empty());
    }

    #[test]
    fn test_duplicate_function_names_flag_tools() {
        let mut config = valid_config();
        config.tools.functions.push(function("lookup_order"));
        config.tools.functions.push(function("lookup_order"));

        let report = validate(&config);
        assert!(!report.is_valid);
        assert_eq!(
            report.errors_for(BuilderStep::Tools),
            ["Duplicate function name: 'lookup_order'".to_string()]
        );
    }

    #[test]
    fn test_failed_file_produces_warning() {
        let mut config = valid_config();
        config.files.knowledge_files.push(AgentFile {
            id: "file_1".to_string(),
            name: "faq.md".to_string(),
            file_type: AgentFileType::Knowledge,
            size_bytes: 10,
            mime_type: "text/markdown".to_string(),
            content: Some("# FAQ".to_string()),
            url: None,
            openai_file_id: None,
            vector_store_id: None,
            processing_status: ProcessingStatus::Failed,
        });

        let report = validate(&config);
        assert!(report.is_valid);
        assert_eq!(report.warnings, vec!["File 'faq.md' failed processing".to_string()]);
    }
}
