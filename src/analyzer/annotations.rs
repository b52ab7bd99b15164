use regex::Regex;

use crate::report::{Annotation, AnnotationLevel};

/// Extracts structured runner annotations from RAW log text.
///
/// This runs before normalization on purpose: normalization is exactly what
/// strips the `##[...]` markers this extractor keys on. Both the runner
/// display form (`##[error]...`) and the workflow-command wire form
/// (`::error file=app.js,line=10::...`) are recognized.
pub fn extract_annotations(raw_log: &str) -> Vec<Annotation> {
    let display_form = Regex::new(r"##\[(error|warning|notice)\](.*)").expect("valid regex");
    let command_form =
        Regex::new(r"^::(error|warning|notice)(?:\s+([^:]+))?::(.*)$").expect("valid regex");
    // Compiler-style location prefix: path(line,col): message
    let location_prefix =
        Regex::new(r"^([\w./\\-]+)\((\d+)(?:,\d+)?\):\s*(.*)$").expect("valid regex");

    let mut annotations = Vec::new();

    for line in raw_log.lines() {
        let line = line.trim();

        if let Some(caps) = command_form.captures(line) {
            let level = parse_level(&caps[1]);
            let (file, line_no) = parse_properties(caps.get(2).map_or("", |m| m.as_str()));
            let message = caps[3].trim().to_string();
            annotations.push(Annotation {
                level,
                message,
                file,
                line: line_no,
            });
            continue;
        }

        if let Some(caps) = display_form.captures(line) {
            let level = parse_level(&caps[1]);
            let rest = caps[2].trim();

            let (file, line_no, message) = match location_prefix.captures(rest) {
                Some(loc) => (
                    Some(loc[1].to_string()),
                    loc[2].parse().ok(),
                    loc[3].trim().to_string(),
                ),
                None => (None, None, rest.to_string()),
            };

            annotations.push(Annotation {
                level,
                message,
                file,
                line: line_no,
            });
        }
    }

    annotations
}

fn parse_level(level: &str) -> AnnotationLevel {
    match level {
        "error" => AnnotationLevel::Error,
        "warning" => AnnotationLevel::Warning,
        _ => AnnotationLevel::Notice,
    }
}

/// Parses `file=app.js,line=10` style property lists.
fn parse_properties(properties: &str) -> (Option<String>, Option<u32>) {
    let mut file = None;
    let mut line = None;

    for pair in properties.split(',') {
        match pair.trim().split_once('=') {
            Some(("file", value)) => file = Some(value.to_string()),
            Some(("line", value)) => line = value.parse().ok(),
            _ => {}
        }
    }

    (file, line)
}
