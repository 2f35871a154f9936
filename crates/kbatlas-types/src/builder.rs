//! Agent builder domain types.
//!
//! A builder session accumulates one agent-under-construction
//! ([`BuilderConfig`]) across the seven wizard steps, together with its
//! validation report, test-run preview, and deployment status
//! ([`BuilderState`]). These are pure data types: validation, step
//! navigation and deployment live in `kbatlas-core`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Unique identifier for a builder session, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuilderId(pub Uuid);

impl BuilderId {
    /// Create a new BuilderId using UUID v7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create a BuilderId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for BuilderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BuilderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BuilderId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Opaque identifier of the user who owns a builder session.
///
/// Issued by the external auth provider; never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// The seven wizard steps, in their fixed total order.
///
/// `Ord` follows declaration order, so `Basic < Instructions < ... < Deploy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuilderStep {
    Basic,
    Instructions,
    Tools,
    Files,
    Advanced,
    Test,
    Deploy,
}

impl BuilderStep {
    /// All steps in wizard order.
    pub const ALL: [BuilderStep; 7] = [
        BuilderStep::Basic,
        BuilderStep::Instructions,
        BuilderStep::Tools,
        BuilderStep::Files,
        BuilderStep::Advanced,
        BuilderStep::Test,
        BuilderStep::Deploy,
    ];

    /// Zero-based position of this step in the wizard.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The following step, or `None` on `Deploy`.
    pub fn next(self) -> Option<BuilderStep> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// The preceding step, or `None` on `Basic`.
    pub fn previous(self) -> Option<BuilderStep> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BuilderStep::Basic => "basic",
            BuilderStep::Instructions => "instructions",
            BuilderStep::Tools => "tools",
            BuilderStep::Files => "files",
            BuilderStep::Advanced => "advanced",
            BuilderStep::Test => "test",
            BuilderStep::Deploy => "deploy",
        }
    }
}

impl fmt::Display for BuilderStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuilderStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(BuilderStep::Basic),
            "instructions" => Ok(BuilderStep::Instructions),
            "tools" => Ok(BuilderStep::Tools),
            "files" => Ok(BuilderStep::Files),
            "advanced" => Ok(BuilderStep::Advanced),
            "test" => Ok(BuilderStep::Test),
            "deploy" => Ok(BuilderStep::Deploy),
            other => Err(format!("invalid builder step: '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Basic section
// ---------------------------------------------------------------------------

/// Agent categories offered by the basic step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentCategory {
    Assistant,
    Support,
    Sales,
    Research,
    Coding,
    Content,
    Analytics,
    Custom,
}

impl Default for AgentCategory {
    fn default() -> Self {
        AgentCategory::Assistant
    }
}

impl fmt::Display for AgentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentCategory::Assistant => "assistant",
            AgentCategory::Support => "support",
            AgentCategory::Sales => "sales",
            AgentCategory::Research => "research",
            AgentCategory::Coding => "coding",
            AgentCategory::Content => "content",
            AgentCategory::Analytics => "analytics",
            AgentCategory::Custom => "custom",
        };
        f.write_str(s)
    }
}

/// Default model for freshly created sessions.
pub const DEFAULT_MODEL: &str = "gpt-4o";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicSection {
    pub name: String,
    pub description: String,
    pub model: String,
    #[serde(default)]
    pub category: AgentCategory,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl Default for BasicSection {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            model: DEFAULT_MODEL.to_string(),
            category: AgentCategory::default(),
            tags: BTreeSet::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Instructions section
// ---------------------------------------------------------------------------

/// A worked example shown to the agent as part of its instructions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionExample {
    pub input: String,
    pub output: String,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionsSection {
    pub system_prompt: String,
    #[serde(default)]
    pub personality: String,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub examples: Vec<InstructionExample>,
}

// ---------------------------------------------------------------------------
// Tools section
// ---------------------------------------------------------------------------

/// How the deployed agent chooses between tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    Auto,
    None,
    Required,
}

impl Default for ToolChoice {
    fn default() -> Self {
        ToolChoice::Auto
    }
}

/// Backing implementation of a custom function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details", rename_all = "snake_case")]
pub enum FunctionImplementation {
    ApiCall(serde_json::Value),
    Javascript(serde_json::Value),
    External(serde_json::Value),
}

/// A stored input/expected-output pair for exercising a custom function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionTestCase {
    pub name: String,
    pub input: serde_json::Value,
    #[serde(default)]
    pub expected_output: Option<serde_json::Value>,
}

/// A user-defined callable tool the deployed agent may invoke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFunction {
    pub id: String,
    /// Must be unique among the agent's functions.
    pub name: String,
    pub description: String,
    /// JSON-schema-like parameter object.
    pub parameters: serde_json::Value,
    pub implementation: FunctionImplementation,
    #[serde(default)]
    pub test_cases: Vec<FunctionTestCase>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolsSection {
    #[serde(default)]
    pub code_interpreter: bool,
    #[serde(default)]
    pub file_search: bool,
    #[serde(default)]
    pub functions: Vec<CustomFunction>,
    #[serde(default)]
    pub parallel_tool_calls: bool,
    #[serde(default)]
    pub tool_choice: ToolChoice,
}

// ---------------------------------------------------------------------------
// Files section
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentFileType {
    Knowledge,
    Code,
    Image,
    Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl Default for ProcessingStatus {
    fn default() -> Self {
        ProcessingStatus::Pending
    }
}

/// A file attached to the agent, either inline (`content`) or by `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentFile {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: AgentFileType,
    pub size_bytes: u64,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_store_id: Option<String>,
    #[serde(default)]
    pub processing_status: ProcessingStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesSection {
    #[serde(default)]
    pub knowledge_files: Vec<AgentFile>,
    #[serde(default)]
    pub code_files: Vec<AgentFile>,
    #[serde(default)]
    pub vector_store_ids: BTreeSet<String>,
}

// ---------------------------------------------------------------------------
// Advanced section
// ---------------------------------------------------------------------------

/// What the deployed agent does when generation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackBehavior {
    Error,
    DefaultResponse,
    Escalate,
}

impl Default for FallbackBehavior {
    fn default() -> Self {
        FallbackBehavior::Error
    }
}

/// Upper bound for `max_tokens`.
pub const MAX_TOKENS_LIMIT: u32 = 128_000;

/// Fields missing from a payload take their [`Default`] values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedSection {
    /// Valid range 0..=2.
    pub temperature: f64,
    /// Valid range 0..=1.
    pub top_p: f64,
    /// Valid range 1..=128000.
    pub max_tokens: u32,
    pub timeout_seconds: u32,
    pub max_retries: u32,
    pub fallback_behavior: FallbackBehavior,
    /// Valid range -2..=2.
    pub frequency_penalty: f64,
    /// Valid range -2..=2.
    pub presence_penalty: f64,
    pub seed: Option<i64>,
}

impl Default for AdvancedSection {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 1.0,
            max_tokens: 4096,
            timeout_seconds: 30,
            max_retries: 3,
            fallback_behavior: FallbackBehavior::default(),
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            seed: None,
        }
    }
}

// ---------------------------------------------------------------------------
// BuilderConfig
// ---------------------------------------------------------------------------

/// The agent under construction, grouped by wizard step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// Assigned once at session creation; never changes.
    pub id: BuilderId,
    pub step: BuilderStep,
    pub basic: BasicSection,
    pub instructions: InstructionsSection,
    pub tools: ToolsSection,
    pub files: FilesSection,
    pub advanced: AdvancedSection,
}

impl BuilderConfig {
    /// An empty configuration positioned on the first step.
    pub fn new(id: BuilderId) -> Self {
        Self {
            id,
            step: BuilderStep::Basic,
            basic: BasicSection::default(),
            instructions: InstructionsSection::default(),
            tools: ToolsSection::default(),
            files: FilesSection::default(),
            advanced: AdvancedSection::default(),
        }
    }

    /// Apply a whole-section replacement. The replaced section is taken
    /// verbatim; nested fields are never merged.
    pub fn apply(&mut self, update: SectionUpdate) {
        match update {
            SectionUpdate::Basic(basic) => self.basic = basic,
            SectionUpdate::Instructions(instructions) => self.instructions = instructions,
            SectionUpdate::Tools(tools) => self.tools = tools,
            SectionUpdate::Files(files) => self.files = files,
            SectionUpdate::Advanced(advanced) => self.advanced = advanced,
        }
    }
}

/// A replacement for exactly one form section of [`BuilderConfig`].
///
/// Serialized as `{"section": "basic", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "section", content = "data", rename_all = "snake_case")]
pub enum SectionUpdate {
    Basic(BasicSection),
    Instructions(InstructionsSection),
    Tools(ToolsSection),
    Files(FilesSection),
    Advanced(AdvancedSection),
}

impl SectionUpdate {
    /// The wizard step that owns this section.
    pub fn step(&self) -> BuilderStep {
        match self {
            SectionUpdate::Basic(_) => BuilderStep::Basic,
            SectionUpdate::Instructions(_) => BuilderStep::Instructions,
            SectionUpdate::Tools(_) => BuilderStep::Tools,
            SectionUpdate::Files(_) => BuilderStep::Files,
            SectionUpdate::Advanced(_) => BuilderStep::Advanced,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Result of validating a full [`BuilderConfig`].
///
/// Steps without errors are absent from `step_errors`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    #[serde(default)]
    pub step_errors: BTreeMap<BuilderStep, Vec<String>>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub is_valid: bool,
}

impl ValidationReport {
    /// Errors recorded for `step` (empty when none).
    pub fn errors_for(&self, step: BuilderStep) -> &[String] {
        self.step_errors
            .get(&step)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn error_count(&self) -> usize {
        self.step_errors.values().map(Vec::len).sum()
    }
}

// ---------------------------------------------------------------------------
// Preview
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestMessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestMessage {
    pub role: TestMessageRole,
    pub content: String,
}

/// One test-step conversation with the agent under construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestConversation {
    pub id: String,
    pub messages: Vec<TestMessage>,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviewState {
    #[serde(default)]
    pub test_conversations: Vec<TestConversation>,
}

// ---------------------------------------------------------------------------
// Deployment
// ---------------------------------------------------------------------------

/// Lifecycle of a session's deployment.
///
/// `Draft -> Deploying -> {Deployed | Failed}`, `Failed -> Deploying` on
/// retry. `Deployed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    Draft,
    Deploying,
    Deployed,
    Failed,
}

impl Default for DeploymentStatus {
    fn default() -> Self {
        DeploymentStatus::Draft
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeploymentStatus::Draft => "draft",
            DeploymentStatus::Deploying => "deploying",
            DeploymentStatus::Deployed => "deployed",
            DeploymentStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl FromStr for DeploymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(DeploymentStatus::Draft),
            "deploying" => Ok(DeploymentStatus::Deploying),
            "deployed" => Ok(DeploymentStatus::Deployed),
            "failed" => Ok(DeploymentStatus::Failed),
            other => Err(format!("invalid deployment status: '{other}'")),
        }
    }
}

/// Target environment for a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployEnvironment {
    Development,
    Staging,
    Production,
}

impl fmt::Display for DeployEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeployEnvironment::Development => "development",
            DeployEnvironment::Staging => "staging",
            DeployEnvironment::Production => "production",
        };
        f.write_str(s)
    }
}

impl FromStr for DeployEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(DeployEnvironment::Development),
            "staging" => Ok(DeployEnvironment::Staging),
            "production" | "prod" => Ok(DeployEnvironment::Production),
            other => Err(format!("invalid environment: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentState {
    #[serde(default)]
    pub status: DeploymentStatus,
    #[serde(default)]
    pub deployed_agent_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    /// Sent with every create-agent call for this session so provider-side
    /// retries collapse into a single resource.
    #[serde(default)]
    pub idempotency_key: Option<Uuid>,
    #[serde(default)]
    pub environment: Option<DeployEnvironment>,
    #[serde(default)]
    pub deployed_at: Option<DateTime<Utc>>,
    /// When the current `deploying` attempt started. Cleared once the
    /// attempt settles.
    #[serde(default)]
    pub deploying_since: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// BuilderState
// ---------------------------------------------------------------------------

/// The persisted wrapper around one builder session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuilderState {
    pub owner_id: OwnerId,
    pub config: BuilderConfig,
    pub validation: ValidationReport,
    #[serde(default)]
    pub preview: PreviewState,
    #[serde(default)]
    pub deployment: DeploymentState,
    /// Incremented by every successful save; used for conditional writes.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BuilderState {
    pub fn id(&self) -> BuilderId {
        self.config.id
    }

    /// Whether the session has reached the terminal `deployed` status.
    pub fn is_deployed(&self) -> bool {
        self.deployment.status == DeploymentStatus::Deployed
    }
}

/// Lightweight listing entry for a builder session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderSummary {
    pub id: BuilderId,
    pub name: String,
    pub step: BuilderStep,
    pub deployment_status: DeploymentStatus,
    pub updated_at: DateTime<Utc>,
}

impl From<&BuilderState> for BuilderSummary {
    fn from(state: &BuilderState) -> Self {
        Self {
            id: state.config.id,
            name: state.config.basic.name.clone(),
            step: state.config.step,
            deployment_status: state.deployment.status,
            updated_at: state.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_order_is_fixed() {
        assert!(BuilderStep::Basic < BuilderStep::Instructions);
        assert!(BuilderStep::Advanced < BuilderStep::Test);
        assert_eq!(BuilderStep::Basic.next(), Some(BuilderStep::Instructions));
        assert_eq!(BuilderStep::Deploy.next(), None);
        assert_eq!(BuilderStep::Basic.previous(), None);
        assert_eq!(BuilderStep::Deploy.previous(), Some(BuilderStep::Test));
    }

    #[test]
    fn test_step_from_str_and_display_agree() {
        for step in BuilderStep::ALL {
            assert_eq!(step.to_string().parse::<BuilderStep>().unwrap(), step);
        }
        assert!("review".parse::<BuilderStep>().is_err());
    }

    #[test]
    fn test_new_config_starts_on_basic_with_defaults() {
        let config = BuilderConfig::new(BuilderId::new());
        assert_eq!(config.step, BuilderStep::Basic);
        assert_eq!(config.basic.model, DEFAULT_MODEL);
        assert!(config.basic.name.is_empty());
        assert_eq!(config.tools.tool_choice, ToolChoice::Auto);
        assert!((config.advanced.temperature - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_apply_replaces_whole_section() {
        let mut config = BuilderConfig::new(BuilderId::new());
        config.basic.tags.insert("old".to_string());
        config.basic.category = AgentCategory::Research;

        config.apply(SectionUpdate::Basic(BasicSection {
            name: "X".to_string(),
            description: "Y".to_string(),
            model: "gpt-4o".to_string(),
            ..Default::default()
        }));

        assert_eq!(config.basic.name, "X");
        // Fields missing from the replacement are reset, not merged.
        assert!(config.basic.tags.is_empty());
        assert_eq!(config.basic.category, AgentCategory::Assistant);
    }

    #[test]
    fn test_section_update_wire_format() {
        let json = serde_json::json!({
            "section": "instructions",
            "data": { "system_prompt": "Be helpful." }
        });
        let update: SectionUpdate = serde_json::from_value(json).unwrap();
        assert_eq!(update.step(), BuilderStep::Instructions);
        match update {
            SectionUpdate::Instructions(i) => {
                assert_eq!(i.system_prompt, "Be helpful.");
                assert!(i.goals.is_empty());
            }
            other => panic!("unexpected section: {other:?}"),
        }
    }

    #[test]
    fn test_tags_deduplicate_on_deserialize() {
        let json = serde_json::json!({
            "name": "Bot",
            "description": "d",
            "model": "gpt-4o",
            "tags": ["a", "b", "a"]
        });
        let basic: BasicSection = serde_json::from_value(json).unwrap();
        assert_eq!(basic.tags.len(), 2);
    }

    #[test]
    fn test_step_errors_serialize_with_step_keys() {
        let mut report = ValidationReport::default();
        report
            .step_errors
            .insert(BuilderStep::Basic, vec!["Name is required".to_string()]);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["step_errors"]["basic"][0], "Name is required");
        assert_eq!(report.errors_for(BuilderStep::Basic).len(), 1);
        assert!(report.errors_for(BuilderStep::Tools).is_empty());
    }

    #[test]
    fn test_function_implementation_wire_format() {
        let json = serde_json::json!({
            "id": "fn_1",
            "name": "lookup_order",
            "description": "Look up an order",
            "parameters": { "type": "object" },
            "implementation": { "type": "api_call", "details": { "url": "https://example.com" } }
        });
        let function: CustomFunction = serde_json::from_value(json).unwrap();
        assert!(function.enabled);
        assert!(matches!(
            function.implementation,
            FunctionImplementation::ApiCall(_)
        ));
    }

    #[test]
    fn test_partial_advanced_payload_fills_defaults() {
        let json = serde_json::json!({ "temperature": 0.2, "seed": 7 });
        let advanced: AdvancedSection = serde_json::from_value(json).unwrap();
        assert_eq!(advanced.temperature, 0.2);
        assert_eq!(advanced.seed, Some(7));
        assert_eq!(advanced.max_tokens, AdvancedSection::default().max_tokens);
        assert_eq!(advanced.frequency_penalty, 0.0);
        assert_eq!(advanced.fallback_behavior, FallbackBehavior::default());
    }

    #[test]
    fn test_deployment_state_without_deploying_since_deserializes() {
        let json = serde_json::json!({ "status": "deploying" });
        let deployment: DeploymentState = serde_json::from_value(json).unwrap();
        assert_eq!(deployment.status, DeploymentStatus::Deploying);
        assert!(deployment.deploying_since.is_none());
    }

    #[test]
    fn test_environment_from_str_accepts_short_forms() {
        assert_eq!(
            "prod".parse::<DeployEnvironment>().unwrap(),
            DeployEnvironment::Production
        );
        assert_eq!(
            "Development".parse::<DeployEnvironment>().unwrap(),
            DeployEnvironment::Development
        );
        assert!("qa".parse::<DeployEnvironment>().is_err());
    }
}
