use std::collections::HashSet;

use regex::Regex;

use super::normalize::NormalizedLine;
use crate::report::{GitRef, RefType};

/// Detects externally-referenced artifacts line by line.
///
/// The shapes are independent regex tests, not mutually exclusive: a single
/// line can yield more than one reference type. Deduplicated by
/// `type:repo@ref`; the caller applies the display cap.
pub fn extract_git_refs(lines: &[NormalizedLine]) -> Vec<GitRef> {
    let action_download =
        Regex::new(r"Download action repository '([^@']+)@([^']+)'").expect("valid regex");
    let docker_pull = Regex::new(r"(?i)(?:docker pull|pulling from)\s+([a-z0-9][\w./-]*?)(?::([\w.-]+))?\s*$")
        .expect("valid regex");
    let dockerfile_from =
        Regex::new(r"^FROM\s+(?:--platform=\S+\s+)?([\w./-]+?)(?::([\w.-]+))?(?:\s+[Aa][Ss]\s+\S+)?\s*$")
            .expect("valid regex");
    let cloning_into = Regex::new(r"Cloning into '([^']+)'").expect("valid regex");
    let ref_checkout =
        Regex::new(r"\*\s+(?:\[new )?(?:branch|tag)\]?\s+(\S+)\s+->\s+(\S+)").expect("valid regex");
    let submodule =
        Regex::new(r"Submodule '[^']+' \(([^)]+)\) registered").expect("valid regex");

    let mut seen: HashSet<String> = HashSet::new();
    let mut refs = Vec::new();

    let mut push = |refs: &mut Vec<GitRef>, git_ref: GitRef| {
        if seen.insert(git_ref.dedup_key()) {
            refs.push(git_ref);
        }
    };

    for line in lines {
        let text = &line.text;
        if text.is_empty() {
            continue;
        }

        if let Some(caps) = action_download.captures(text) {
            push(
                &mut refs,
                GitRef {
                    repo: caps[1].to_string(),
                    ref_: Some(caps[2].to_string()),
                    ref_type: RefType::Action,
                },
            );
        }

        if let Some(caps) = docker_pull.captures(text) {
            push(
                &mut refs,
                GitRef {
                    repo: caps[1].to_string(),
                    ref_: caps.get(2).map(|m| m.as_str().to_string()),
                    ref_type: RefType::Docker,
                },
            );
        }

        if let Some(caps) = dockerfile_from.captures(text) {
            push(
                &mut refs,
                GitRef {
                    repo: caps[1].to_string(),
                    ref_: caps.get(2).map(|m| m.as_str().to_string()),
                    ref_type: RefType::Docker,
                },
            );
        }

        if let Some(caps) = cloning_into.captures(text) {
            let dir = caps[1].trim_end_matches(".git");
            let repo = dir.rsplit('/').next().unwrap_or(dir);
            push(
                &mut refs,
                GitRef {
                    repo: repo.to_string(),
                    ref_: Some("HEAD".to_string()),
                    ref_type: RefType::GitCheckout,
                },
            );
        }

        if let Some(caps) = ref_checkout.captures(text) {
            // "* [new branch] main -> origin/main": the remote-tracking
            // prefix stands in for the repository
            let remote = caps[2].split('/').next().unwrap_or("origin");
            push(
                &mut refs,
                GitRef {
                    repo: remote.to_string(),
                    ref_: Some(caps[1].to_string()),
                    ref_type: RefType::GitCheckout,
                },
            );
        }

        if let Some(caps) = submodule.captures(text) {
            push(
                &mut refs,
                GitRef {
                    repo: repo_name_from_url(&caps[1]),
                    ref_: None,
                    ref_type: RefType::Submodule,
                },
            );
        }
    }

    refs
}

/// Detects `Run owner/repo@ref` step invocation lines.
///
/// A distinct signal from the download/resolution shapes above: this is the
/// action actually executing. Uncapped here; the caller dedups and caps when
/// merging with [`extract_git_refs`] output.
pub fn extract_run_actions(lines: &[NormalizedLine]) -> Vec<GitRef> {
    let run_action = Regex::new(r"^Run\s+([\w.-]+/[\w.-]+)@(\S+)").expect("valid regex");

    lines
        .iter()
        .filter_map(|line| {
            run_action.captures(&line.text).map(|caps| GitRef {
                repo: caps[1].to_string(),
                ref_: Some(caps[2].to_string()),
                ref_type: RefType::Action,
            })
        })
        .collect()
}

/// Reduces a clone URL to an `owner/repo`-style identifier.
pub(crate) fn repo_name_from_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/').trim_end_matches(".git");

    // scp-like syntax: git@host:owner/repo
    let path = if let Some((_, path)) = trimmed.split_once("://") {
        path.split_once('/').map_or("", |(_, rest)| rest)
    } else if let Some((_, path)) = trimmed.split_once(':') {
        path
    } else {
        trimmed
    };

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.len() {
        0 => trimmed.to_string(),
        1 => segments[0].to_string(),
        n => format!("{}/{}", segments[n - 2], segments[n - 1]),
    }
}
