use std::collections::HashSet;

use regex::Regex;

use super::normalize::NormalizedLine;
use super::refs::repo_name_from_url;
use crate::report::ClonedRepo;

/// Accumulator for the cloned-repository scan.
///
/// Holds at most one in-progress record; a new "Syncing repository" marker
/// flushes the previous record and starts the next, and end-of-stream
/// flushes whatever is left. Keeping the state in an explicit struct with a
/// pure flush keeps the machine independently testable.
#[derive(Debug, Default)]
struct RepoScan {
    current: Option<ClonedRepo>,
    sync_seen: bool,
    seen: HashSet<String>,
    completed: Vec<ClonedRepo>,
}

impl RepoScan {
    /// Emits the in-progress record, if any. First record per repository
    /// wins; later duplicates are dropped.
    fn flush(&mut self) {
        if let Some(repo) = self.current.take() {
            self.emit(repo);
        }
    }

    fn emit(&mut self, repo: ClonedRepo) {
        if self.seen.insert(repo.repository.clone()) {
            self.completed.push(repo);
        }
    }
}

/// Reconstructs which repositories the job cloned and how.
///
/// Folds the line stream through [`RepoScan`]. Fields accumulate on the
/// in-progress record; unknown branch/commit keep the `—` placeholder.
/// Deduplicated by repository name; the caller applies the display cap.
pub fn extract_cloned_repos(lines: &[NormalizedLine]) -> Vec<ClonedRepo> {
    let syncing = Regex::new(r"(?i)^Syncing repository:\s+(\S+)").expect("valid regex");
    let auth_setup =
        Regex::new(r"(?i)setting up auth for ['\x22]?([\w.-]+/[\w.-]+)").expect("valid regex");
    let checkout_ref = Regex::new(r"refs/(?:remotes/)?(heads|tags|pull|origin)/([^\s'\x22]+)")
        .expect("valid regex");
    let head_at = Regex::new(r"HEAD is now at ([0-9a-f]{7,40})").expect("valid regex");
    let depth = Regex::new(r"(?:--depth[= ](\d+)|fetch-depth:\s*(\d+))").expect("valid regex");
    let git_clone =
        Regex::new(r"git clone\s+(?:--?[\w-]+(?:=\S+)?\s+)*(\S+?)(?:\.git)?(?:\s|$)")
            .expect("valid regex");
    let git_fetch = Regex::new(r"git fetch origin\s+(\S+)").expect("valid regex");

    let mut scan = RepoScan::default();

    for line in lines {
        let text = &line.text;
        if text.is_empty() {
            continue;
        }

        if let Some(caps) = syncing.captures(text) {
            scan.flush();
            scan.current = Some(ClonedRepo::unknown(&caps[1]));
            scan.sync_seen = true;
            continue;
        }

        if text.contains("git clone") && !scan.sync_seen {
            if let Some(caps) = git_clone.captures(text) {
                let url = &caps[1];
                if !url.starts_with('-') {
                    // Direct clone outside the sync flow gets its own record,
                    // independent of any in-progress one
                    scan.emit(ClonedRepo::unknown(&repo_name_from_url(url)));
                }
            }
        }

        if scan.current.is_none() {
            if let Some(caps) = auth_setup.captures(text) {
                scan.current = Some(ClonedRepo::unknown(&caps[1]));
            }
        }

        let Some(repo) = scan.current.as_mut() else {
            continue;
        };

        if text.to_lowercase().contains("checkout") || text.contains("Checking out") {
            if let Some(caps) = checkout_ref.captures(text) {
                repo.branch = match &caps[1] {
                    "tags" => format!("tag: {}", &caps[2]),
                    "pull" => {
                        let number: String =
                            caps[2].chars().take_while(|c| c.is_ascii_digit()).collect();
                        format!("PR #{number}")
                    }
                    _ => caps[2].to_string(),
                };
            }
        }

        if let Some(caps) = head_at.captures(text) {
            repo.commit = caps[1].to_string();
        }

        if let Some(caps) = depth.captures(text) {
            let value = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str());
            if let Some(value) = value {
                repo.depth = if value == "0" {
                    "full".to_string()
                } else {
                    value.to_string()
                };
            }
        }

        if repo.branch == crate::report::UNKNOWN_FIELD {
            if let Some(caps) = git_fetch.captures(text) {
                if !caps[1].starts_with('-') {
                    repo.branch = caps[1].to_string();
                }
            }
        }
    }

    scan.flush();
    scan.completed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::normalize::LineNormalizer;
    use crate::report::UNKNOWN_FIELD;

    fn extract(log: &str) -> Vec<ClonedRepo> {
        let normalizer = LineNormalizer::new();
        extract_cloned_repos(&normalizer.normalize_log(log))
    }

    #[test]
    fn test_full_sync_flow() {
        let log = "\
Syncing repository: acme/widgets
git -c protocol.version=2 fetch --depth=1 origin
/usr/bin/git checkout --progress --force -B main refs/remotes/origin/main
HEAD is now at 1a2b3c4 Fix the build";

        let repos = extract(log);

        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].repository, "acme/widgets");
        assert_eq!(repos[0].branch, "main");
        assert_eq!(repos[0].commit, "1a2b3c4");
        assert_eq!(repos[0].depth, "1");
    }

    #[test]
    fn test_tag_checkout() {
        let log = "\
Syncing repository: acme/widgets
git checkout --progress --force refs/tags/v2.1.0";

        let repos = extract(log);
        assert_eq!(repos[0].branch, "tag: v2.1.0");
    }

    #[test]
    fn test_pull_request_checkout() {
        let log = "\
Syncing repository: acme/widgets
git checkout --progress --force refs/remotes/pull/476/merge";

        let repos = extract(log);
        assert_eq!(repos[0].branch, "PR #476");
    }

    #[test]
    fn test_fetch_depth_zero_means_full() {
        let log = "\
Syncing repository: acme/widgets
fetch-depth: 0";

        let repos = extract(log);
        assert_eq!(repos[0].depth, "full");
    }

    #[test]
    fn test_new_sync_marker_flushes_previous() {
        let log = "\
Syncing repository: acme/widgets
HEAD is now at 1a2b3c4 First
Syncing repository: acme/gadgets
HEAD is now at 9f8e7d6 Second";

        let repos = extract(log);

        assert_eq!(repos.len(), 2);
        assert_eq!(repos[0].repository, "acme/widgets");
        assert_eq!(repos[0].commit, "1a2b3c4");
        assert_eq!(repos[1].repository, "acme/gadgets");
        assert_eq!(repos[1].commit, "9f8e7d6");
    }

    #[test]
    fn test_duplicate_sync_marker_keeps_first_record() {
        let log = "\
Syncing repository: acme/widgets
HEAD is now at 1a2b3c4 First
some unrelated output
Syncing repository: acme/widgets";

        let repos = extract(log);

        assert_eq!(repos.len(), 1);
        // The first record's fields survive; the second never accumulated any
        assert_eq!(repos[0].commit, "1a2b3c4");
    }

    #[test]
    fn test_direct_clone_emits_own_record() {
        let log = "git clone https://github.com/acme/tooling.git";

        let repos = extract(log);

        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].repository, "acme/tooling");
        assert_eq!(repos[0].branch, UNKNOWN_FIELD);
        assert_eq!(repos[0].commit, UNKNOWN_FIELD);
        assert_eq!(repos[0].depth, "full");
    }

    #[test]
    fn test_direct_clone_suppressed_after_sync_marker() {
        let log = "\
Syncing repository: acme/widgets
git clone https://github.com/acme/widgets.git";

        let repos = extract(log);

        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].repository, "acme/widgets");
    }

    #[test]
    fn test_auth_line_seeds_repo_only_when_none_in_progress() {
        let log = "\
Setting up auth for 'acme/widgets'
HEAD is now at 1a2b3c4 Seeded";

        let repos = extract(log);

        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].repository, "acme/widgets");
        assert_eq!(repos[0].commit, "1a2b3c4");
    }

    #[test]
    fn test_git_fetch_fills_missing_branch_only() {
        let log = "\
Syncing repository: acme/widgets
git fetch origin release-2.0";

        let repos = extract(log);
        assert_eq!(repos[0].branch, "release-2.0");

        let log_with_branch = "\
Syncing repository: acme/widgets
git checkout --force refs/heads/main
git fetch origin release-2.0";

        let repos = extract(log_with_branch);
        assert_eq!(repos[0].branch, "main");
    }

    #[test]
    fn test_git_fetch_ignores_flag_arguments() {
        let log = "\
Syncing repository: acme/widgets
git fetch origin --prune";

        let repos = extract(log);
        assert_eq!(repos[0].branch, UNKNOWN_FIELD);
    }

    #[test]
    fn test_end_of_stream_flushes_in_progress_record() {
        let repos = extract("Syncing repository: acme/widgets");

        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].branch, UNKNOWN_FIELD);
    }
}
