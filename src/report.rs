use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::types::Violation;

#[derive(Debug, Deserialize)]
struct ScanReport {
    #[serde(default)]
    violations: Vec<Violation>,
}

/// Load the scanner's report and normalize it into an ordered violation
/// sequence. A missing or malformed report is fatal: there is nothing
/// to annotate and the run must not reach the mutation phases.
pub fn load(path: &Path) -> Result<Vec<Violation>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read scan report {}", path.display()))?;
    let report: ScanReport = serde_json::from_str(&content)
        .with_context(|| format!("scan report {} is not valid JSON", path.display()))?;
    info!(
        "loaded {} violation(s) from {}",
        report.violations.len(),
        path.display()
    );
    Ok(report.violations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_report(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write");
        file
    }

    #[test]
    fn parses_report_preserving_order() {
        let file = write_report(
            r#"{
                "violations": [
                    {
                        "message": "first",
                        "rule": "RuleA",
                        "engine": "pmd",
                        "severity": 3,
                        "resources": ["https://docs.example/a"],
                        "locations": [{"file": "src/A.cls", "startLine": 4, "endLine": 6}],
                        "primaryLocationIndex": 0
                    },
                    {
                        "message": "second",
                        "rule": "RuleB",
                        "engine": "eslint",
                        "severity": 1,
                        "locations": [{"file": "src/b.js", "startLine": 10}]
                    }
                ]
            }"#,
        );

        let violations = load(file.path()).expect("load");
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].message, "first");
        assert_eq!(violations[0].locations[0].end_line, Some(6));
        assert_eq!(violations[1].rule, "RuleB");
        assert_eq!(violations[1].primary_location_index, 0);
        assert!(violations[1].resource_urls.is_empty());
    }

    #[test]
    fn empty_violation_list_is_not_an_error() {
        let file = write_report(r#"{"violations": []}"#);
        assert!(load(file.path()).expect("load").is_empty());
    }

    #[test]
    fn missing_report_is_fatal() {
        assert!(load(Path::new("/nonexistent/apexScanResults.json")).is_err());
    }

    #[test]
    fn malformed_report_is_fatal() {
        let file = write_report("not json at all");
        assert!(load(file.path()).is_err());
    }
}
