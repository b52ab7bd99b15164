use indexmap::IndexMap;

use crate::patterns::PatternCatalog;

/// Reserved bucket for error lines matching no catalog entry.
const OTHER_BUCKET: &str = "Other";

/// Reserved bucket for warning lines matching no catalog entry.
const GENERAL_BUCKET: &str = "General";

/// Groups lines into category buckets using the catalog.
///
/// Each line is tested against every catalog entry in order; the first entry
/// whose regex matches assigns the line to that entry's category. Lines
/// matching nothing land in `fallback`. Purely a display grouping - it never
/// affects which single root cause was chosen.
fn categorize_lines(
    lines: &[String],
    catalog: &PatternCatalog,
    fallback: &str,
) -> IndexMap<String, Vec<String>> {
    let mut buckets: IndexMap<String, Vec<String>> = IndexMap::new();

    for line in lines {
        let category = catalog
            .entries()
            .iter()
            .find(|entry| entry.regex.is_match(line))
            .map_or(fallback, |entry| entry.signature.category.as_str());

        buckets
            .entry(category.to_string())
            .or_default()
            .push(line.clone());
    }

    buckets
}

pub fn categorize_errors(
    lines: &[String],
    catalog: &PatternCatalog,
) -> IndexMap<String, Vec<String>> {
    categorize_lines(lines, catalog, OTHER_BUCKET)
}

pub fn categorize_warnings(
    lines: &[String],
    catalog: &PatternCatalog,
) -> IndexMap<String, Vec<String>> {
    categorize_lines(lines, catalog, GENERAL_BUCKET)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{FailureSignature, Severity};

    fn create_signature(id: &str, pattern: &str, category: &str) -> FailureSignature {
        FailureSignature {
            id: id.to_string(),
            category: category.to_string(),
            pattern: pattern.to_string(),
            flags: String::new(),
            root_cause: String::new(),
            suggestion: String::new(),
            severity: Severity::Warning,
            tags: vec![],
            docs_url: None,
        }
    }

    #[test]
    fn test_first_matching_entry_assigns_category() {
        let catalog = PatternCatalog::compile(vec![
            create_signature("npm", "npm ERR!", "npm"),
            create_signature("broad", "ERR", "generic"),
        ]);
        let lines = vec!["npm ERR! code ENOENT".to_string()];

        let buckets = categorize_errors(&lines, &catalog);

        // "broad" also matches, but "npm" comes first in catalog order
        assert_eq!(buckets.get("npm").unwrap().len(), 1);
        assert!(buckets.get("generic").is_none());
    }

    #[test]
    fn test_unmatched_errors_fall_into_other() {
        let catalog = PatternCatalog::compile(vec![create_signature("npm", "npm ERR!", "npm")]);
        let lines = vec!["segfault in module".to_string()];

        let buckets = categorize_errors(&lines, &catalog);

        assert_eq!(buckets.get("Other").unwrap(), &lines);
    }

    #[test]
    fn test_unmatched_warnings_fall_into_general() {
        let catalog = PatternCatalog::compile(vec![]);
        let lines = vec!["warning: something minor".to_string()];

        let buckets = categorize_warnings(&lines, &catalog);

        assert_eq!(buckets.get("General").unwrap(), &lines);
    }

    #[test]
    fn test_bucket_order_is_first_seen() {
        let catalog = PatternCatalog::compile(vec![
            create_signature("a", "alpha", "A"),
            create_signature("b", "beta", "B"),
        ]);
        let lines = vec![
            "beta warning".to_string(),
            "alpha warning".to_string(),
            "beta again".to_string(),
        ];

        let buckets = categorize_errors(&lines, &catalog);
        let categories: Vec<&String> = buckets.keys().collect();

        assert_eq!(categories, vec!["B", "A"]);
        assert_eq!(buckets.get("B").unwrap().len(), 2);
    }
}
