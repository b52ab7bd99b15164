use regex::Regex;

/// A log line after normalization, retaining its original 1-based number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLine {
    pub number: usize,
    pub text: String,
}

/// Strips runner noise from raw log lines.
///
/// Removes a leading ISO-8601 timestamp, ANSI escape sequences and the
/// runner's structured annotation markers, then trims surrounding
/// whitespace. Normalization is idempotent: feeding an already-normalized
/// line back in returns it unchanged.
///
/// Every downstream matcher operates on normalized lines, except the link
/// extractor which deliberately scans raw text (URLs can sit inside
/// annotation markers the normalizer strips).
pub struct LineNormalizer {
    timestamp: Regex,
    ansi: Regex,
    marker: Regex,
}

impl LineNormalizer {
    pub fn new() -> Self {
        Self {
            // 2024-01-01T00:00:00.0000000Z prefix emitted by the runner
            timestamp: Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?Z?\s?")
                .expect("valid regex"),
            // SGR and cursor-movement sequences
            ansi: Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("valid regex"),
            marker: Regex::new(r"##\[(?:error|warning|debug|group|endgroup)\]\s*")
                .expect("valid regex"),
        }
    }

    /// Normalizes one raw line. Pure, no side effects.
    pub fn normalize(&self, line: &str) -> String {
        let line = self.timestamp.replace(line, "");
        let line = self.ansi.replace_all(&line, "");
        let line = self.marker.replace_all(&line, "");
        line.trim().to_string()
    }

    /// Normalizes a whole log blob, keeping original 1-based line numbers.
    pub fn normalize_log(&self, log: &str) -> Vec<NormalizedLine> {
        log.lines()
            .enumerate()
            .map(|(idx, raw)| NormalizedLine {
                number: idx + 1,
                text: self.normalize(raw),
            })
            .collect()
    }
}

impl Default for LineNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
