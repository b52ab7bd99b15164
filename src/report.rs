use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::patterns::Severity;

/// Sentinel pattern id reported when no failure signature matched.
pub const NO_PATTERN: &str = "none";

/// Category reported when no failure signature matched.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Failed-step name reported when no step could be resolved.
pub const UNKNOWN_STEP: &str = "Unknown step";

/// Placeholder for cloned-repository fields that could not be determined.
pub const UNKNOWN_FIELD: &str = "—";

/// Complete analysis output for a single CI job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobAnalysis {
    pub job: String,
    pub analyzed_at: DateTime<Utc>,
    pub analysis: AnalysisResult,
    pub git_refs: CappedList<GitRef>,
    pub cloned_repos: CappedList<ClonedRepo>,
    pub test_summary: Option<TestSummary>,
    pub annotations: Vec<Annotation>,
    pub links: CappedList<LinkRef>,
    pub timing: Option<JobTiming>,
}

/// Root-cause classification for a single analyzed job.
///
/// When a failure signature matched, `root_cause`, `suggestion`, `severity`,
/// `category` and `docs_url` are carried verbatim from that signature and
/// `matched_pattern` is its id. Otherwise all of them hold the fixed fallback
/// values and `matched_pattern` is [`NO_PATTERN`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub root_cause: String,
    pub failed_step: String,
    pub suggestion: String,
    pub error_lines: Vec<String>,
    pub errors_by_category: IndexMap<String, Vec<String>>,
    pub warning_lines: Vec<String>,
    pub warnings_by_category: IndexMap<String, Vec<String>>,
    pub matched_line: MatchedLine,
    pub total_lines: usize,
    pub severity: Severity,
    pub matched_pattern: String,
    pub category: String,
    pub docs_url: Option<String>,
    pub build_params: CappedList<BuildParam>,
}

/// The single line a failure signature matched, with surrounding context.
///
/// `line_number` is 1-based; 0 means no line matched (fallback result).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchedLine {
    pub text: String,
    pub line_number: usize,
    pub context_before: Vec<String>,
    pub context_after: Vec<String>,
}

/// A collection truncated to a fixed cap, carrying the true total alongside
/// the retained subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CappedList<T> {
    pub total: usize,
    pub items: Vec<T>,
}

impl<T> CappedList<T> {
    /// Truncates `items` to `cap` entries, recording the pre-truncation total.
    pub fn new(mut items: Vec<T>, cap: usize) -> Self {
        let total = items.len();
        items.truncate(cap);
        Self { total, items }
    }
}

impl<T> Default for CappedList<T> {
    fn default() -> Self {
        Self {
            total: 0,
            items: Vec::new(),
        }
    }
}

/// Where a build parameter was observed in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParamSource {
    Env,
    Input,
    CliFlag,
    Output,
}

/// A build parameter extracted from the log, deduplicated by `key=value`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildParam {
    pub key: String,
    pub value: String,
    pub source: ParamSource,
}

/// Kind of externally-referenced artifact a [`GitRef`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefType {
    Action,
    Docker,
    GitCheckout,
    Submodule,
}

impl RefType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::Docker => "docker",
            Self::GitCheckout => "git-checkout",
            Self::Submodule => "submodule",
        }
    }
}

/// A reference to an external artifact (action, image, repository).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitRef {
    pub repo: String,
    #[serde(rename = "ref")]
    pub ref_: Option<String>,
    #[serde(rename = "type")]
    pub ref_type: RefType,
}

impl GitRef {
    /// Deduplication key: `type:repo@ref`, or `type:repo` when no ref.
    pub fn dedup_key(&self) -> String {
        match &self.ref_ {
            Some(r) => format!("{}:{}@{}", self.ref_type.as_str(), self.repo, r),
            None => format!("{}:{}", self.ref_type.as_str(), self.repo),
        }
    }
}

/// Provenance of a repository cloned during the job.
///
/// Unknown branch/commit hold the [`UNKNOWN_FIELD`] placeholder; `depth` is
/// either a number or the literal "full".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClonedRepo {
    pub repository: String,
    pub branch: String,
    pub commit: String,
    pub depth: String,
}

impl ClonedRepo {
    /// A freshly-started record with all fields still unknown.
    pub fn unknown(repository: &str) -> Self {
        Self {
            repository: repository.to_string(),
            branch: UNKNOWN_FIELD.to_string(),
            commit: UNKNOWN_FIELD.to_string(),
            depth: "full".to_string(),
        }
    }
}

/// Test-framework result summary; at most one per job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSummary {
    pub framework: String,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub total: u32,
    pub failed_tests: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationLevel {
    Error,
    Warning,
    Notice,
}

/// A structured annotation emitted by the CI platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub level: AnnotationLevel,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

/// A URL found in the raw log, labeled by known service signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkRef {
    pub url: String,
    pub label: String,
}

/// Duration breakdown for one step of a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepTiming {
    pub name: String,
    pub duration_ms: i64,
    pub is_slow: bool,
}

/// Timing summary derived from step metadata, never from log text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobTiming {
    pub job_name: String,
    pub job_duration_ms: i64,
    pub queue_time_ms: i64,
    pub slowest_step: Option<String>,
    pub steps: Vec<StepTiming>,
}

/// Step metadata supplied by the caller alongside the log blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JobStep {
    pub name: String,
    pub conclusion: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Job-level metadata for the timing calculator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JobMetadata {
    pub job_name: String,
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub steps: Vec<JobStep>,
}
