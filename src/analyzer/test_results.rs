use regex::Regex;

use super::normalize::NormalizedLine;
use crate::report::TestSummary;

/// Recognizes test-runner summary lines and returns at most one summary.
///
/// The first framework whose summary line appears in the stream wins;
/// frameworks later in the log are ignored. Failed test names are then
/// collected with the winning framework's own failure phrasing.
pub fn extract_test_summary(lines: &[NormalizedLine]) -> Option<TestSummary> {
    let jest = Regex::new(
        r"Tests:\s+(?:(\d+) failed, )?(?:(\d+) skipped, )?(\d+) passed, (\d+) total",
    )
    .expect("valid regex");
    let cargo = Regex::new(r"test result: (?:ok|FAILED)\. (\d+) passed; (\d+) failed; (\d+) ignored")
        .expect("valid regex");
    let pytest = Regex::new(
        r"=+ (?:(\d+) failed,? )?(?:(\d+) passed,? )?(?:(\d+) skipped,? )?.*in [\d.]+s(?: \(.*\))? =+",
    )
    .expect("valid regex");
    let mocha_passing = Regex::new(r"(\d+) passing").expect("valid regex");

    for line in lines {
        let text = &line.text;

        if let Some(caps) = jest.captures(text) {
            let failed = capture_u32(&caps, 1);
            let skipped = capture_u32(&caps, 2);
            let passed = capture_u32(&caps, 3);
            let total = capture_u32(&caps, 4);
            return Some(summary("jest", passed, failed, skipped, total, jest_failures(lines)));
        }

        if let Some(caps) = cargo.captures(text) {
            let passed = capture_u32(&caps, 1);
            let failed = capture_u32(&caps, 2);
            let skipped = capture_u32(&caps, 3);
            let total = passed + failed + skipped;
            return Some(summary("cargo", passed, failed, skipped, total, cargo_failures(lines)));
        }

        if let Some(caps) = pytest.captures(text) {
            let failed = capture_u32(&caps, 1);
            let passed = capture_u32(&caps, 2);
            let skipped = capture_u32(&caps, 3);
            // A separator line with no counts is not a summary
            if failed + passed + skipped == 0 {
                continue;
            }
            let total = passed + failed + skipped;
            return Some(summary("pytest", passed, failed, skipped, total, pytest_failures(lines)));
        }

        if let Some(caps) = mocha_passing.captures(text) {
            let passed = capture_u32(&caps, 1);
            let failed = scan_count(lines, r"(\d+) failing");
            let skipped = scan_count(lines, r"(\d+) pending");
            let total = passed + failed + skipped;
            return Some(summary("mocha", passed, failed, skipped, total, mocha_failures(lines)));
        }
    }

    None
}

fn summary(
    framework: &str,
    passed: u32,
    failed: u32,
    skipped: u32,
    total: u32,
    failed_tests: Vec<String>,
) -> TestSummary {
    TestSummary {
        framework: framework.to_string(),
        passed,
        failed,
        skipped,
        total,
        failed_tests,
    }
}

fn capture_u32(caps: &regex::Captures<'_>, group: usize) -> u32 {
    caps.get(group)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

fn scan_count(lines: &[NormalizedLine], pattern: &str) -> u32 {
    let regex = Regex::new(pattern).expect("valid regex");
    lines
        .iter()
        .find_map(|l| regex.captures(&l.text))
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0)
}

fn collect_failures(lines: &[NormalizedLine], pattern: &str) -> Vec<String> {
    let regex = Regex::new(pattern).expect("valid regex");
    lines
        .iter()
        .filter_map(|l| regex.captures(&l.text))
        .map(|caps| caps[1].trim().to_string())
        .collect()
}

fn jest_failures(lines: &[NormalizedLine]) -> Vec<String> {
    collect_failures(lines, r"^[✕✗]\s+(.+?)(?:\s+\(\d+\s*m?s\))?$")
}

fn cargo_failures(lines: &[NormalizedLine]) -> Vec<String> {
    collect_failures(lines, r"^test (\S+) \.\.\. FAILED$")
}

fn pytest_failures(lines: &[NormalizedLine]) -> Vec<String> {
    collect_failures(lines, r"^FAILED\s+(\S+)")
}

fn mocha_failures(lines: &[NormalizedLine]) -> Vec<String> {
    collect_failures(lines, r"^\d+\)\s+(.+?):?$")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::normalize::LineNormalizer;

    fn extract(log: &str) -> Option<TestSummary> {
        let normalizer = LineNormalizer::new();
        extract_test_summary(&normalizer.normalize_log(log))
    }

    #[test]
    fn test_jest_summary() {
        let log = "\
✕ renders the header (23 ms)
Tests:       2 failed, 1 skipped, 17 passed, 20 total
Snapshots:   0 total";

        let summary = extract(log).unwrap();

        assert_eq!(summary.framework, "jest");
        assert_eq!(summary.passed, 17);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.total, 20);
        assert_eq!(summary.failed_tests, vec!["renders the header"]);
    }

    #[test]
    fn test_jest_summary_without_failures() {
        let summary = extract("Tests:       5 passed, 5 total").unwrap();

        assert_eq!(summary.passed, 5);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.total, 5);
        assert!(summary.failed_tests.is_empty());
    }

    #[test]
    fn test_cargo_summary() {
        let log = "\
test config::tests::test_load ... ok
test patterns::tests::test_merge ... FAILED
test result: FAILED. 41 passed; 1 failed; 2 ignored; 0 measured; 0 filtered out";

        let summary = extract(log).unwrap();

        assert_eq!(summary.framework, "cargo");
        assert_eq!(summary.passed, 41);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.total, 44);
        assert_eq!(summary.failed_tests, vec!["patterns::tests::test_merge"]);
    }

    #[test]
    fn test_pytest_summary() {
        let log = "\
FAILED tests/test_api.py::test_timeout
========= 2 failed, 30 passed, 1 skipped in 12.34s =========";

        let summary = extract(log).unwrap();

        assert_eq!(summary.framework, "pytest");
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.passed, 30);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed_tests, vec!["tests/test_api.py::test_timeout"]);
    }

    #[test]
    fn test_mocha_summary() {
        let log = "\
  12 passing (3s)
  1 pending
  2 failing

  1) api handles missing token:
     AssertionError: expected 401 to equal 200";

        let summary = extract(log).unwrap();

        assert_eq!(summary.framework, "mocha");
        assert_eq!(summary.passed, 12);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.total, 15);
        assert_eq!(summary.failed_tests, vec!["api handles missing token"]);
    }

    #[test]
    fn test_first_framework_wins() {
        let log = "\
Tests:       3 passed, 3 total
test result: ok. 10 passed; 0 failed; 0 ignored";

        let summary = extract(log).unwrap();
        assert_eq!(summary.framework, "jest");
    }

    #[test]
    fn test_no_summary_in_log() {
        assert!(extract("just some build output\nnothing else").is_none());
    }
}
