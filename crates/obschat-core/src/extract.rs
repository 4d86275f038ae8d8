//! Structured-data recovery from free-form model text.
//!
//! Models sometimes answer with an observation config written out as YAML
//! (fenced, document-marked, JSON-style, or bare key-value lines) instead of
//! calling the tool. These helpers pull the first parseable mapping out of
//! such text so the orchestration layer can still act on it.

use crate::planner::ObservationRequest;
use regex::Regex;
use std::sync::OnceLock;

fn candidate_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // Markdown YAML blocks
            r"```(?:yaml|yml)\n([\s\S]*?)```",
            // Standard YAML document markers
            r"(?:^|\n)(-{3}[\s\S]*?\.{3})",
            // JSON-style mappings
            r"(?:^|\n)(\{[\s\S]*?\})",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static pattern"))
        .collect()
    })
}

fn key_line() -> &'static Regex {
    static KEY_LINE: OnceLock<Regex> = OnceLock::new();
    KEY_LINE.get_or_init(|| Regex::new(r"^[\w][\w\s]*:").expect("static pattern"))
}

/// Fallback candidates: bare key-value runs outside any fence or marker.
///
/// The run from the first key-looking line to the end of the text is tried
/// first (a multi-key mapping), then each single key's block, so one
/// unparseable line does not sink the rest.
fn bare_block_candidates(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    let starts: Vec<usize> = (0..lines.len())
        .filter(|&i| key_line().is_match(lines[i]))
        .collect();
    let Some(&first) = starts.first() else {
        return Vec::new();
    };
    let mut candidates = vec![lines[first..].join("\n")];
    for (n, &start) in starts.iter().enumerate() {
        let end = starts.get(n + 1).copied().unwrap_or(lines.len());
        candidates.push(lines[start..end].join("\n"));
    }
    candidates
}

/// Extract the first non-empty YAML mapping found in `text`.
///
/// Patterns are tried in order of specificity; within a pattern, earlier
/// matches win. Candidates that fail to parse are skipped silently.
pub fn extract_mapping(text: &str) -> Option<serde_yml::Value> {
    for pattern in candidate_patterns() {
        for captures in pattern.captures_iter(text) {
            let Some(candidate) = captures.get(1) else {
                continue;
            };
            if let Some(value) = parse_mapping(candidate.as_str()) {
                return Some(value);
            }
        }
    }
    bare_block_candidates(text)
        .iter()
        .find_map(|candidate| parse_mapping(candidate))
}

fn parse_mapping(candidate: &str) -> Option<serde_yml::Value> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }
    serde_yml::from_str::<serde_yml::Value>(candidate)
        .ok()
        .filter(|value| value.as_mapping().is_some_and(|m| !m.is_empty()))
}

/// Extract an [`ObservationRequest`] written out as YAML in `text`.
///
/// Only mappings that actually carry targets count; a stray `note: ...`
/// line must not trigger a planner run.
pub fn extract_request(text: &str) -> Option<ObservationRequest> {
    let mapping = extract_mapping(text)?;
    let request: ObservationRequest = serde_yml::from_value(mapping).ok()?;
    if request.targets.is_empty() {
        return None;
    }
    Some(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_fenced_yaml_block() {
        let text = "Here is the config:\n```yaml\ntargets:\n  - \"25544\"\ntime_start: 2026-09-01\n```\nLet me know.";
        let request = extract_request(text).unwrap();
        assert_eq!(request.targets, vec!["25544"]);
        assert_eq!(request.time_start, "2026-09-01");
    }

    #[test]
    fn test_extracts_document_markers() {
        let text = "---\ntargets:\n  - ISS\n...";
        let mapping = extract_mapping(text).unwrap();
        assert!(mapping.as_mapping().unwrap().len() >= 1);
    }

    #[test]
    fn test_extracts_json_style() {
        let text = "Sure, here it is:\n{\"targets\": [\"25544\"], \"duration_hours\": 2}";
        let request = extract_request(text).unwrap();
        assert_eq!(request.duration_hours, 2.0);
    }

    #[test]
    fn test_extracts_bare_key_value_run() {
        let text = "targets: [\"25544\"]\nduration_hours: 1.5";
        let request = extract_request(text).unwrap();
        assert_eq!(request.targets, vec!["25544"]);
    }

    #[test]
    fn test_plain_prose_yields_nothing() {
        assert!(extract_mapping("No passes visible tonight.").is_none());
        // Colon-bearing prose may parse as some mapping, but never as a
        // plannable request.
        assert!(extract_request("The ISS passes overhead around 19:04 local time.").is_none());
        assert!(extract_request("note: remember to check the weather").is_none());
    }

    #[test]
    fn test_invalid_yaml_block_is_skipped() {
        let text = "```yaml\n: : :\n```\n{\"targets\": [\"25544\"]}";
        assert!(extract_request(text).is_some());
    }
}
