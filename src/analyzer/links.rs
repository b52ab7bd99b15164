use std::collections::HashSet;

use regex::Regex;
use url::Url;

/// URLs shorter or longer than this are treated as log noise.
const MIN_URL_LEN: usize = 12;
const MAX_URL_LEN: usize = 300;

use crate::report::LinkRef;

/// Ordered service-signature table; first matching domain substring wins.
const SERVICE_SIGNATURES: &[(&[&str], &str)] = &[
    (&["artifactory", "jfrog.io"], "Artifactory"),
    (
        &["s3.amazonaws.com", "storage.googleapis.com", "blob.core.windows.net"],
        "Cloud storage",
    ),
    // Before the container-registry row: "registry." would otherwise claim
    // hosts like registry.npmjs.com
    (
        &[
            "npmjs.com",
            "npmjs.org",
            "pypi.org",
            "crates.io",
            "rubygems.org",
            "maven.org",
            "nuget.org",
        ],
        "Package registry",
    ),
    (
        &["docker.io", "ghcr.io", "gcr.io", "quay.io", "registry."],
        "Container registry",
    ),
    (
        &["codecov.io", "coveralls.io", "sonarcloud.io", "sonarqube"],
        "Coverage/quality",
    ),
];

/// Scans RAW text for URLs and labels the plausible ones.
///
/// Works on raw text because URLs frequently sit inside annotation markers
/// the normalizer strips. Trailing punctuation is trimmed, implausibly
/// short/long URLs and the CI platform's own UI/API chatter are discarded
/// (release and artifact endpoints excepted), and survivors are labeled by
/// known service signature or bare hostname. Deduplicated, first-seen order;
/// the caller applies the display cap.
pub fn extract_links(raw_log: &str) -> Vec<LinkRef> {
    let url_pattern = Regex::new(r#"https?://[^\s<>"'\)\]]+"#).expect("valid regex");

    let mut seen: HashSet<String> = HashSet::new();
    let mut links = Vec::new();

    for found in url_pattern.find_iter(raw_log) {
        let trimmed = found.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']);

        if trimmed.len() < MIN_URL_LEN || trimmed.len() > MAX_URL_LEN {
            continue;
        }

        let Ok(parsed) = Url::parse(trimmed) else {
            continue;
        };
        let Some(host) = parsed.host_str() else {
            continue;
        };

        if is_provider_noise(host, parsed.path()) {
            continue;
        }

        if seen.insert(trimmed.to_string()) {
            links.push(LinkRef {
                url: trimmed.to_string(),
                label: classify_host(host),
            });
        }
    }

    links
}

/// The CI platform's own UI/API URLs carry no diagnostic value, except when
/// they point at release or artifact endpoints.
fn is_provider_noise(host: &str, path: &str) -> bool {
    let provider_host = host == "github.com"
        || host == "api.github.com"
        || host.ends_with("actions.githubusercontent.com");

    provider_host && !path.contains("/releases/") && !path.contains("/artifacts")
}

fn classify_host(host: &str) -> String {
    for (domains, label) in SERVICE_SIGNATURES {
        if domains.iter().any(|d| host.contains(d)) {
            return (*label).to_string();
        }
    }

    host.to_string()
}
