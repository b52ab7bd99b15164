use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use log::{debug, info, warn};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{LogTriageError, Result};

/// Hard timeout for the remote catalog fetch. A slow community mirror must
/// never stall the whole analysis.
const REMOTE_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Severity assigned by a failure signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    #[default]
    Warning,
    Info,
}

/// A single declarative failure-signature rule.
///
/// Loaded once per run and never mutated. Identity is `id`; on id collision
/// during merge the local definition always wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureSignature {
    pub id: String,
    pub category: String,
    pub pattern: String,

    /// Regex flags; only "i" (case-insensitive) is recognized.
    #[serde(default)]
    pub flags: String,

    pub root_cause: String,
    pub suggestion: String,

    #[serde(default)]
    pub severity: Severity,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub docs_url: Option<String>,
}

/// On-disk/remote catalog representation. This schema is a stable external
/// contract; community rule files must conform to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternFile {
    pub version: u32,
    pub patterns: Vec<FailureSignature>,

    #[serde(default)]
    pub settings: Option<serde_json::Value>,
}

/// A signature whose pattern compiled successfully.
#[derive(Debug, Clone)]
pub struct CompiledSignature {
    pub signature: FailureSignature,
    pub regex: Regex,
}

/// An ordered, immutable set of compiled failure signatures.
///
/// Catalog order IS match-priority order: the first entry whose regex fires
/// on any line wins, so the merged local-before-remote ordering must be
/// preserved exactly. Once built, the catalog is read-only and can be shared
/// across any number of concurrent job analyses.
#[derive(Debug, Clone, Default)]
pub struct PatternCatalog {
    entries: Vec<CompiledSignature>,
}

impl PatternCatalog {
    /// Compiles signatures in order, skipping entries whose pattern fails to
    /// compile. An uncompilable community rule must never take down the run.
    pub fn compile(signatures: Vec<FailureSignature>) -> Self {
        let entries = signatures
            .into_iter()
            .filter_map(|signature| {
                let result = RegexBuilder::new(&signature.pattern)
                    .case_insensitive(signature.flags.contains('i'))
                    .build();

                match result {
                    Ok(regex) => Some(CompiledSignature { signature, regex }),
                    Err(err) => {
                        warn!(
                            "Skipping pattern '{}' with invalid regex: {}",
                            signature.id, err
                        );
                        None
                    }
                }
            })
            .collect();

        Self { entries }
    }

    pub fn entries(&self) -> &[CompiledSignature] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Loads the local rule set, failing soft.
///
/// A missing or corrupt file logs a warning and yields an empty set; local
/// catalog problems degrade the analysis, they never abort it.
pub fn load_local(path: &Path) -> Vec<FailureSignature> {
    match read_pattern_file(path) {
        Ok(file) => {
            debug!(
                "Loaded {} local patterns from {}",
                file.patterns.len(),
                path.display()
            );
            file.patterns
        }
        Err(err) => {
            warn!(
                "Could not load pattern file {}: {} - continuing without local patterns",
                path.display(),
                err
            );
            Vec::new()
        }
    }
}

fn read_pattern_file(path: &Path) -> Result<PatternFile> {
    let contents = std::fs::read_to_string(path)?;
    let file = serde_json::from_str(&contents)?;
    Ok(file)
}

/// Fetches a community rule set over HTTP.
///
/// Network errors and non-2xx responses surface as errors here; the caller
/// treats them as non-fatal and degrades to local-only patterns. No retries
/// are performed.
pub async fn fetch_remote(url: &str) -> Result<Vec<FailureSignature>> {
    let client = reqwest::Client::builder()
        .timeout(REMOTE_FETCH_TIMEOUT)
        .build()?;

    let body = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let file: PatternFile = serde_json::from_str(&body)
        .map_err(|err| LogTriageError::Patterns(format!("invalid pattern file at {url}: {err}")))?;

    debug!("Fetched {} remote patterns from {}", file.patterns.len(), url);
    Ok(file.patterns)
}

/// Merges local and remote signatures with absolute local precedence.
///
/// Result is `local ++ (remote filtered to ids not in local)`, in that exact
/// order. This lets users override a community rule by shipping a local entry
/// with the same id.
pub fn merge(local: Vec<FailureSignature>, remote: Vec<FailureSignature>) -> Vec<FailureSignature> {
    let local_ids: HashSet<String> = local.iter().map(|s| s.id.clone()).collect();

    let mut merged = local;
    merged.extend(
        remote
            .into_iter()
            .filter(|s| !local_ids.contains(&s.id)),
    );

    merged
}

/// Loads, merges and compiles the full catalog for one run.
///
/// Every failure mode along the way (missing file, bad JSON, network error,
/// invalid regex) degrades to a smaller catalog rather than an error.
pub async fn load_catalog(local_path: &Path, remote_url: Option<&str>) -> PatternCatalog {
    let local = load_local(local_path);

    let remote = match remote_url {
        Some(url) => match fetch_remote(url).await {
            Ok(patterns) => patterns,
            Err(err) => {
                warn!("Remote pattern fetch failed: {} - using local patterns only", err);
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let catalog = PatternCatalog::compile(merge(local, remote));
    info!("Pattern catalog ready with {} entries", catalog.len());
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_signature(id: &str, pattern: &str) -> FailureSignature {
        FailureSignature {
            id: id.to_string(),
            category: "test".to_string(),
            pattern: pattern.to_string(),
            flags: String::new(),
            root_cause: format!("{id} root cause"),
            suggestion: format!("{id} suggestion"),
            severity: Severity::Critical,
            tags: vec![],
            docs_url: None,
        }
    }

    #[test]
    fn test_merge_local_precedence() {
        let local = vec![create_signature("a", "foo"), create_signature("b", "bar")];
        let remote = vec![create_signature("b", "REMOTE"), create_signature("c", "baz")];

        let merged = merge(local, remote);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].id, "a");
        assert_eq!(merged[1].id, "b");
        // Local definition of "b" wins over the remote one
        assert_eq!(merged[1].pattern, "bar");
        assert_eq!(merged[2].id, "c");
    }

    #[test]
    fn test_merge_preserves_order() {
        let local = vec![create_signature("z", "1"), create_signature("a", "2")];
        let remote = vec![create_signature("m", "3")];

        let merged = merge(local, remote);

        let ids: Vec<&str> = merged.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_compile_skips_invalid_regex() {
        let signatures = vec![
            create_signature("good", "ENOENT"),
            create_signature("bad", "[unclosed"),
            create_signature("also-good", "exit code \\d+"),
        ];

        let catalog = PatternCatalog::compile(signatures);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.entries()[0].signature.id, "good");
        assert_eq!(catalog.entries()[1].signature.id, "also-good");
    }

    #[test]
    fn test_compile_case_insensitive_flag() {
        let mut signature = create_signature("ci", "enoent");
        signature.flags = "i".to_string();

        let catalog = PatternCatalog::compile(vec![signature]);

        assert!(catalog.entries()[0].regex.is_match("npm ERR! code ENOENT"));
    }

    #[test]
    fn test_load_local_missing_file() {
        let patterns = load_local(Path::new("/nonexistent/patterns.json"));
        assert!(patterns.is_empty());
    }

    #[test]
    fn test_load_local_corrupt_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{{ not json").unwrap();

        let patterns = load_local(temp_file.path());
        assert!(patterns.is_empty());
    }

    #[test]
    fn test_load_local_valid_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(
            temp_file,
            r#"{{
  "version": 1,
  "patterns": [
    {{
      "id": "npm-missing",
      "category": "npm",
      "pattern": "ENOENT",
      "rootCause": "Missing file",
      "suggestion": "Check path",
      "severity": "critical"
    }}
  ]
}}"#
        )
        .unwrap();

        let patterns = load_local(temp_file.path());

        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].id, "npm-missing");
        assert_eq!(patterns[0].root_cause, "Missing file");
        assert_eq!(patterns[0].severity, Severity::Critical);
    }

    #[tokio::test]
    async fn test_fetch_remote_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/patterns.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"version": 1, "patterns": [{"id": "oom", "category": "memory",
                    "pattern": "OOMKilled", "rootCause": "Out of memory",
                    "suggestion": "Raise the limit", "severity": "critical"}]}"#,
            )
            .create_async()
            .await;

        let url = format!("{}/patterns.json", server.url());
        let patterns = fetch_remote(&url).await.unwrap();

        mock.assert_async().await;
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].id, "oom");
    }

    #[tokio::test]
    async fn test_fetch_remote_server_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/patterns.json")
            .with_status(500)
            .create_async()
            .await;

        let url = format!("{}/patterns.json", server.url());
        assert!(fetch_remote(&url).await.is_err());
    }

    #[tokio::test]
    async fn test_load_catalog_degrades_on_remote_failure() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(
            temp_file,
            r#"{{"version": 1, "patterns": [{{"id": "local-only", "category": "x",
                "pattern": "boom", "rootCause": "r", "suggestion": "s"}}]}}"#
        )
        .unwrap();

        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/patterns.json")
            .with_status(404)
            .create_async()
            .await;

        let url = format!("{}/patterns.json", server.url());
        let catalog = load_catalog(temp_file.path(), Some(&url)).await;

        // Remote failure is non-fatal; local patterns survive
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.entries()[0].signature.id, "local-only");
    }
}
