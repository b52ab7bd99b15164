use std::collections::HashSet;

use regex::Regex;

use super::normalize::NormalizedLine;
use crate::report::{BuildParam, ParamSource};

/// Key substrings that mark a parameter as credential-like.
const CREDENTIAL_KEYWORDS: &[&str] = &[
    "token",
    "secret",
    "password",
    "api_key",
    "auth",
    "credential",
    "private",
];

/// Value every CI platform substitutes for masked secrets.
const REDACTION_MARKER: &str = "***";

/// Extracts build parameters from the normalized line stream.
///
/// Shape-matchers are applied per line in a fixed priority order; the first
/// matcher that fires wins and a line contributes at most one parameter.
/// The matcher order is load-bearing for lines several shapes could claim
/// (generic env assignment vs. npm-config vars, for instance) - changing it
/// changes classification of ambiguous lines.
///
/// Credential-like pairs are dropped before storage and never surfaced.
/// Deduplicated by exact `key=value`, first-seen order preserved. The
/// caller applies the display cap.
pub fn extract_build_params(lines: &[NormalizedLine]) -> Vec<BuildParam> {
    let matchers: Vec<(Regex, ParamSource)> = vec![
        // Shell env assignment, optional `export`
        (
            Regex::new(r"^(?:export\s+)?([A-Z_][A-Z0-9_]*)=(.+)$").expect("valid regex"),
            ParamSource::Env,
        ),
        // Workflow input binding phrasing
        (
            Regex::new(r"(?i)input\s+'([\w.-]+)'\s*[:=]\s*'?([^']+)'?\s*$").expect("valid regex"),
            ParamSource::Input,
        ),
        // docker build --build-arg K=V
        (
            Regex::new(r"--build-arg[ =]([A-Za-z_][\w]*)=(\S+)").expect("valid regex"),
            ParamSource::CliFlag,
        ),
        // JVM-style -Dkey=value
        (
            Regex::new(r"-D([\w.]+)=(\S+)").expect("valid regex"),
            ParamSource::CliFlag,
        ),
        // npm config environment variables
        (
            Regex::new(r"(npm_config_[a-z_]+)=(\S+)").expect("valid regex"),
            ParamSource::Env,
        ),
        // Legacy workflow-command wire phrasings
        (
            Regex::new(r"::set-output name=([\w.-]+)::(.*)").expect("valid regex"),
            ParamSource::Output,
        ),
        (
            Regex::new(r"::set-env name=([\w.-]+)::(.*)").expect("valid regex"),
            ParamSource::Env,
        ),
        // Key-value lines echoed from step `with:`/`env:` blocks. The
        // normalizer trims the indentation, so the shape is the bare
        // lowercase key with a single-token value.
        (
            Regex::new(r"^([a-z][\w-]*):\s+(\S+)$").expect("valid regex"),
            ParamSource::Input,
        ),
    ];

    let mut seen: HashSet<String> = HashSet::new();
    let mut params = Vec::new();

    for line in lines {
        if line.text.is_empty() {
            continue;
        }

        for (regex, source) in &matchers {
            let Some(caps) = regex.captures(&line.text) else {
                continue;
            };

            let key = caps[1].trim().to_string();
            let value = caps[2].trim().to_string();

            if !is_credential_like(&key, &value) && seen.insert(format!("{key}={value}")) {
                params.push(BuildParam {
                    key,
                    value,
                    source: *source,
                });
            }

            // First matching shape claims the line
            break;
        }
    }

    params
}

fn is_credential_like(key: &str, value: &str) -> bool {
    let key_lower = key.to_lowercase();
    CREDENTIAL_KEYWORDS.iter().any(|kw| key_lower.contains(kw))
        || value.contains(REDACTION_MARKER)
}
