pub mod annotations;
pub mod categorize;
pub mod classifier;
pub mod links;
pub mod normalize;
pub mod params;
pub mod refs;
pub mod repos;
pub mod test_results;
pub mod timing;

use std::collections::HashSet;

use chrono::Utc;
use log::debug;

use crate::patterns::PatternCatalog;
use crate::report::{CappedList, GitRef, JobAnalysis, JobMetadata};

/// Display caps for the extracted collections. Truncation keeps the true
/// total alongside the retained subset; the error/warning line lists are
/// never capped here.
pub const MAX_BUILD_PARAMS: usize = 30;
pub const MAX_GIT_REFS: usize = 40;
pub const MAX_CLONED_REPOS: usize = 20;
pub const MAX_LINKS: usize = 20;

/// Runs the full analysis pipeline over one job's log.
///
/// The log is normalized once; the classifier and every field extractor then
/// run independently over the shared normalized stream (the annotation and
/// link extractors read the raw text by design). The catalog is read-only
/// and can be shared across concurrent calls.
pub fn analyze_job(
    job_name: &str,
    raw_log: &str,
    catalog: &PatternCatalog,
    failed_step: Option<&str>,
    metadata: Option<&JobMetadata>,
) -> JobAnalysis {
    let normalizer = normalize::LineNormalizer::new();
    let lines = normalizer.normalize_log(raw_log);
    debug!("Analyzing job '{}' ({} lines)", job_name, lines.len());

    let mut analysis = classifier::classify_failure(raw_log, &lines, catalog, failed_step);
    analysis.build_params = CappedList::new(params::extract_build_params(&lines), MAX_BUILD_PARAMS);

    let git_refs = merge_git_refs(
        refs::extract_git_refs(&lines),
        refs::extract_run_actions(&lines),
    );

    let timing = metadata.map(|meta| {
        timing::calculate_timing(&meta.job_name, meta.started_at, &meta.steps)
    });

    JobAnalysis {
        job: job_name.to_string(),
        analyzed_at: Utc::now(),
        analysis,
        git_refs: CappedList::new(git_refs, MAX_GIT_REFS),
        cloned_repos: CappedList::new(repos::extract_cloned_repos(&lines), MAX_CLONED_REPOS),
        test_summary: test_results::extract_test_summary(&lines),
        annotations: annotations::extract_annotations(raw_log),
        links: CappedList::new(links::extract_links(raw_log), MAX_LINKS),
        timing,
    }
}

/// Merges the shape-detected references with the `Run owner/repo@ref`
/// invocation signal, deduplicating across both sources.
fn merge_git_refs(mut detected: Vec<GitRef>, run_actions: Vec<GitRef>) -> Vec<GitRef> {
    let mut seen: HashSet<String> = detected.iter().map(GitRef::dedup_key).collect();

    for git_ref in run_actions {
        if seen.insert(git_ref.dedup_key()) {
            detected.push(git_ref);
        }
    }

    detected
}
