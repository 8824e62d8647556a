//! Hidden dependency scanner
//!
//! Line-oriented detection of container-bypassing lookup calls in PHP
//! source. Two idioms are recognized, in order, per line:
//!
//! 1. `$this->getDi('name')`, the self-referencing lookup on the DI base
//! 2. `Registry::get('name')`, the global static registry lookup
//!
//! Both patterns require a string-literal key and capture it. Calls with a
//! dynamic argument (`$this->getDi($name)`) are not reported; that recall
//! limit is accepted, this is pattern matching, not parsing. The flip side
//! holds too: a matching literal inside a comment is reported.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Bytes of context kept either side of a match
const CONTEXT_RADIUS: usize = 50;

/// One detected hidden-lookup call site.
///
/// Findings are never deduplicated: a call appearing verbatim in two
/// ancestor files is reported once per file, and a line with N matches
/// yields N findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiddenDependency {
    /// The literal key passed to the lookup call
    pub service: String,

    /// The file the call site lives in
    pub file: PathBuf,

    /// 1-based line number of the call site
    pub line: usize,

    /// Source text around the match, `...`-marked where clipped
    pub context: String,
}

lazy_static! {
    // Match: $this->getDi('service.name') with either quote style
    static ref GET_DI_RE: Regex =
        Regex::new(r#"\$this\s*->\s*getDi\s*\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap();

    // Match: Registry::get('service.name')
    static ref REGISTRY_GET_RE: Regex =
        Regex::new(r#"Registry\s*::\s*get\s*\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap();
}

/// Scan one source file for hidden lookup calls.
///
/// A file that cannot be read contributes zero findings; the miss is
/// logged at debug and the scan goes on.
pub fn scan_file(path: &Path) -> Vec<HiddenDependency> {
    match std::fs::read_to_string(path) {
        Ok(content) => scan_content(&content, path),
        Err(e) => {
            debug!("Skipping unreadable source file {:?}: {}", path, e);
            Vec::new()
        }
    }
}

/// Scan already-loaded source text for hidden lookup calls.
///
/// Split out from [`scan_file`] so tests and in-memory callers can scan
/// without touching the filesystem.
pub fn scan_content(content: &str, path: &Path) -> Vec<HiddenDependency> {
    let mut findings = Vec::new();

    for (index, line) in content.lines().enumerate() {
        for pattern in [&*GET_DI_RE, &*REGISTRY_GET_RE] {
            for caps in pattern.captures_iter(line) {
                if let Some(key) = caps.get(1) {
                    findings.push(HiddenDependency {
                        service: key.as_str().to_string(),
                        file: path.to_path_buf(),
                        line: index + 1,
                        context: context_around(line, key.start()),
                    });
                }
            }
        }
    }

    findings
}

/// A bounded window of the line around a match offset.
///
/// Up to [`CONTEXT_RADIUS`] bytes either side, clamped to character
/// boundaries and line bounds, with `...` on each clipped side, then
/// trimmed.
fn context_around(line: &str, offset: usize) -> String {
    let mut start = offset.saturating_sub(CONTEXT_RADIUS);
    let mut end = (offset + CONTEXT_RADIUS).min(line.len());
    while start > 0 && !line.is_char_boundary(start) {
        start -= 1;
    }
    while end < line.len() && !line.is_char_boundary(end) {
        end += 1;
    }

    let mut context = line[start..end].to_string();
    if start > 0 {
        context = format!("...{}", context);
    }
    if end < line.len() {
        context.push_str("...");
    }

    context.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(content: &str) -> Vec<HiddenDependency> {
        scan_content(content, Path::new("/app/src/Service.php"))
    }

    #[test]
    fn test_get_di_call_is_found_with_key_and_line() {
        let findings = scan("noop();\n$x = $this->getDi('Logger');\n");

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].service, "Logger");
        assert_eq!(findings[0].line, 2);
        assert!(findings[0].context.contains("getDi('Logger')"));
        assert_eq!(findings[0].file, PathBuf::from("/app/src/Service.php"));
    }

    #[test]
    fn test_registry_get_call_is_found() {
        let findings = scan("$db = Registry::get(\"database\");\n");

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].service, "database");
        assert_eq!(findings[0].line, 1);
    }

    #[test]
    fn test_whitespace_variants_match() {
        let findings = scan("$x = $this -> getDi ( 'Mailer' );\n$y = Registry :: get( 'cache' );\n");

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].service, "Mailer");
        assert_eq!(findings[1].service, "cache");
    }

    #[test]
    fn test_two_matches_on_one_line_yield_two_findings() {
        let findings = scan("$a = $this->getDi('A'); $b = $this->getDi('B');\n");

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].service, "A");
        assert_eq!(findings[1].service, "B");
        assert_eq!(findings[0].line, findings[1].line);
    }

    #[test]
    fn test_get_di_findings_come_before_registry_findings_on_a_line() {
        let findings = scan("Registry::get('r'); $this->getDi('d');\n");

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].service, "d");
        assert_eq!(findings[1].service, "r");
    }

    #[test]
    fn test_dynamic_argument_is_not_reported() {
        let findings = scan("$x = $this->getDi($serviceName);\nRegistry::get($key);\n");
        assert!(findings.is_empty());
    }

    #[test]
    fn test_commented_call_is_still_reported() {
        // Accepted false positive of line-oriented matching
        let findings = scan("// $this->getDi('Logger');\n");
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn test_context_clipped_on_both_sides() {
        let mut line = "x".repeat(95);
        line.push_str("$this->getDi('svc')");
        line.push_str(&"y".repeat(95));

        let findings = scan(&line);
        assert_eq!(findings.len(), 1);
        let context = &findings[0].context;
        assert!(context.starts_with("..."));
        assert!(context.ends_with("..."));
        assert!(context.contains("svc"));
    }

    #[test]
    fn test_context_clipped_on_right_only_near_line_start() {
        let mut line = String::from("$x = $this->getDi('svc');");
        line.push_str(&"y".repeat(200));

        let findings = scan(&line);
        assert_eq!(findings.len(), 1);
        let context = &findings[0].context;
        assert!(!context.starts_with("..."));
        assert!(context.ends_with("..."));
        assert!(context.starts_with("$x ="));
    }

    #[test]
    fn test_short_line_context_is_whole_trimmed_line() {
        let findings = scan("    $x = $this->getDi('svc');\n");
        assert_eq!(findings[0].context, "$x = $this->getDi('svc');");
    }

    #[test]
    fn test_context_window_respects_multibyte_text() {
        let mut line = "é".repeat(40);
        line.push_str("$this->getDi('svc')");
        line.push_str(&"é".repeat(40));

        let findings = scan(&line);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].context.contains("getDi('svc')"));
    }

    #[test]
    fn test_scan_file_missing_file_yields_nothing() {
        let findings = scan_file(Path::new("/definitely/not/here.php"));
        assert!(findings.is_empty());
    }

    #[test]
    fn test_scan_file_reads_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Service.php");
        std::fs::write(&path, "<?php\n$this->getDi('Logger');\n").unwrap();

        let findings = scan_file(&path);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].file, path);
        assert_eq!(findings[0].line, 2);
    }

    #[test]
    fn test_finding_serializes_to_plain_record() {
        let finding = HiddenDependency {
            service: "Logger".into(),
            file: PathBuf::from("/app/src/Service.php"),
            line: 2,
            context: "$this->getDi('Logger');".into(),
        };

        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["service"], "Logger");
        assert_eq!(json["line"], 2);

        let restored: HiddenDependency = serde_json::from_value(json).unwrap();
        assert_eq!(restored, finding);
    }
}
