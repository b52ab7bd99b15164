use log::debug;
use regex::Regex;

use super::categorize::{categorize_errors, categorize_warnings};
use super::normalize::NormalizedLine;
use crate::patterns::{PatternCatalog, Severity};
use crate::report::{AnalysisResult, CappedList, MatchedLine, NO_PATTERN, UNKNOWN_CATEGORY, UNKNOWN_STEP};

/// Root cause reported when no failure signature matched.
const FALLBACK_ROOT_CAUSE: &str = "Job failed but no known failure pattern matched";

/// Suggestion reported when no failure signature matched.
const FALLBACK_SUGGESTION: &str = "Review the collected error lines for details";

/// Broad failure-vocabulary test for bucketing lines as errors.
///
/// Case-insensitive on error/fail/fatal/exception plus the npm `ERR!`
/// marker. Simple substring checks keep this safe against pathological
/// inputs.
pub fn is_error_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    lower.contains("error")
        || lower.contains("fail")
        || lower.contains("fatal")
        || lower.contains("exception")
        || lower.contains("err!")
}

/// Broad warning-vocabulary test, mutually exclusive with [`is_error_line`].
///
/// Pure warning-count summaries ("3 warnings") are excluded so compiler
/// tallies do not drown the real warnings.
pub fn is_warning_line(line: &str) -> bool {
    if is_error_line(line) {
        return false;
    }

    let lower = line.to_lowercase();
    if !lower.contains("warn") && !line.contains('⚠') {
        return false;
    }

    !is_warning_count_summary(line)
}

fn is_warning_count_summary(line: &str) -> bool {
    let mut tokens = line.split_whitespace();
    let count = tokens.next().is_some_and(|t| t.chars().all(|c| c.is_ascii_digit()));
    let word = tokens
        .next()
        .is_some_and(|t| t.eq_ignore_ascii_case("warning") || t.eq_ignore_ascii_case("warnings"));

    count && word && tokens.next().is_none()
}

/// Collects every non-empty line matching the error vocabulary.
pub fn detect_error_lines(lines: &[NormalizedLine]) -> Vec<String> {
    lines
        .iter()
        .filter(|l| !l.text.is_empty() && is_error_line(&l.text))
        .map(|l| l.text.clone())
        .collect()
}

/// Collects every non-empty line matching the warning vocabulary.
pub fn detect_warning_lines(lines: &[NormalizedLine]) -> Vec<String> {
    lines
        .iter()
        .filter(|l| !l.text.is_empty() && is_warning_line(&l.text))
        .map(|l| l.text.clone())
        .collect()
}

/// Resolves the name of the failed step.
///
/// Preference order: caller-supplied name, an explicit step-failure
/// annotation in the raw log, a "Run <command> failed" phrase, then
/// [`UNKNOWN_STEP`].
pub fn resolve_failed_step(raw_log: &str, known_step: Option<&str>) -> String {
    if let Some(step) = known_step {
        if !step.trim().is_empty() {
            return step.trim().to_string();
        }
    }

    let step_annotation =
        Regex::new(r#"##\[error\](?:The )?[Ss]tep ['"]?([^'"\r\n]+?)['"]? failed"#)
            .expect("valid regex");
    let run_failed = Regex::new(r"Run (.+?) failed").expect("valid regex");

    for line in raw_log.lines() {
        if let Some(caps) = step_annotation.captures(line) {
            return caps[1].trim().to_string();
        }
    }

    for line in raw_log.lines() {
        if let Some(caps) = run_failed.captures(line) {
            return caps[1].trim().to_string();
        }
    }

    UNKNOWN_STEP.to_string()
}

/// Scans the normalized log against the catalog and builds the analysis
/// result.
///
/// Catalog entries are tried strictly in catalog order; for each entry the
/// lines are scanned in original order and the first line that matches wins
/// outright. If no entry matches any line, the fixed fallback result is
/// returned with pattern id [`NO_PATTERN`].
///
/// The error/warning line sets and their category groupings are computed
/// once, up front, and carried on the result regardless of which (if any)
/// signature matched.
pub fn classify_failure(
    raw_log: &str,
    lines: &[NormalizedLine],
    catalog: &PatternCatalog,
    known_step: Option<&str>,
) -> AnalysisResult {
    let error_lines = detect_error_lines(lines);
    let warning_lines = detect_warning_lines(lines);
    let errors_by_category = categorize_errors(&error_lines, catalog);
    let warnings_by_category = categorize_warnings(&warning_lines, catalog);
    let failed_step = resolve_failed_step(raw_log, known_step);

    for entry in catalog.entries() {
        let hit = lines
            .iter()
            .enumerate()
            .find(|(_, line)| entry.regex.is_match(&line.text));

        if let Some((idx, line)) = hit {
            debug!(
                "Pattern '{}' matched line {}",
                entry.signature.id, line.number
            );

            return AnalysisResult {
                root_cause: entry.signature.root_cause.clone(),
                failed_step,
                suggestion: entry.signature.suggestion.clone(),
                error_lines,
                errors_by_category,
                warning_lines,
                warnings_by_category,
                matched_line: MatchedLine {
                    text: line.text.clone(),
                    line_number: line.number,
                    context_before: context_before(lines, idx),
                    context_after: context_after(lines, idx),
                },
                total_lines: lines.len(),
                severity: entry.signature.severity,
                matched_pattern: entry.signature.id.clone(),
                category: entry.signature.category.clone(),
                docs_url: entry.signature.docs_url.clone(),
                build_params: CappedList::default(),
            };
        }
    }

    debug!("No pattern matched; returning fallback result");

    AnalysisResult {
        root_cause: FALLBACK_ROOT_CAUSE.to_string(),
        failed_step,
        suggestion: FALLBACK_SUGGESTION.to_string(),
        matched_line: MatchedLine {
            text: error_lines.first().cloned().unwrap_or_default(),
            line_number: 0,
            context_before: Vec::new(),
            context_after: error_lines.iter().skip(1).take(2).cloned().collect(),
        },
        error_lines,
        errors_by_category,
        warning_lines,
        warnings_by_category,
        total_lines: lines.len(),
        severity: Severity::Warning,
        matched_pattern: NO_PATTERN.to_string(),
        category: UNKNOWN_CATEGORY.to_string(),
        docs_url: None,
        build_params: CappedList::default(),
    }
}

/// Up to 2 non-empty lines preceding `idx`, in original order.
fn context_before(lines: &[NormalizedLine], idx: usize) -> Vec<String> {
    let mut context: Vec<String> = lines[..idx]
        .iter()
        .rev()
        .filter(|l| !l.text.is_empty())
        .take(2)
        .map(|l| l.text.clone())
        .collect();
    context.reverse();
    context
}

/// Up to 2 non-empty lines following `idx`, in original order.
fn context_after(lines: &[NormalizedLine], idx: usize) -> Vec<String> {
    lines[idx + 1..]
        .iter()
        .filter(|l| !l.text.is_empty())
        .take(2)
        .map(|l| l.text.clone())
        .collect()
}
