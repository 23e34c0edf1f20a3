use crate::types::{Overflow, Violation};

/// Fixed anchor embedded in every body this tool produces. Cleanup
/// matches on this substring and nothing else, so changing it strands
/// comments posted by earlier versions.
pub const MARKER: &str = "<!-- diffnote:static-analysis -->";

/// Render the inline comment body for one finding: the marker, a
/// heading, and a detail table with the rule (hyperlinked to its first
/// resource URL when present), engine, severity, and message.
pub fn inline_body(violation: &Violation) -> String {
    let mut out = String::new();
    out.push_str(MARKER);
    out.push_str("\n### Static analysis finding\n\n");
    out.push_str("| Rule | Engine | Severity | Message |\n");
    out.push_str("|---|---|---|---|\n");

    let rule = match violation.resource_urls.first() {
        Some(url) => format!("[{}]({})", escape_pipes(&violation.rule), url),
        None => escape_pipes(&violation.rule),
    };
    out.push_str(&format!(
        "| {} | {} | {} | {} |\n",
        rule,
        escape_pipes(&violation.engine),
        violation.severity,
        escape_pipes(&violation.message)
    ));
    out
}

/// Render the single aggregated comment for everything that could not
/// be posted inline. One row per finding, report order, messages
/// truncated to `message_budget` characters.
pub fn overflow_body(overflow: &[Overflow], message_budget: usize) -> String {
    let mut out = String::new();
    out.push_str(MARKER);
    out.push_str("\n### Static analysis findings not shown inline\n\n");
    out.push_str(&format!(
        "{} finding(s) could not be placed on the diff or exceeded the inline limit.\n\n",
        overflow.len()
    ));
    out.push_str("| File | Line | Rule | Severity | Message |\n");
    out.push_str("|---|---|---|---|---|\n");

    for entry in overflow {
        let (file, line, rule, url, severity, message) = entry.row();
        let rule = match url {
            Some(url) => format!("[{}]({})", escape_pipes(rule), url),
            None => escape_pipes(rule),
        };
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            escape_pipes(file),
            line,
            rule,
            severity,
            escape_pipes(&truncate(message, message_budget))
        ));
    }
    out
}

/// Escape pipe characters so table cells cannot break the table
fn escape_pipes(text: &str) -> String {
    text.replace('|', "\\|")
}

fn truncate(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(budget.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Location;

    fn violation(message: &str, urls: Vec<String>) -> Violation {
        Violation {
            message: message.to_string(),
            rule: "ApexCRUDViolation".to_string(),
            engine: "pmd".to_string(),
            severity: 3,
            resource_urls: urls,
            locations: vec![Location {
                file: "src/A.cls".to_string(),
                start_line: Some(5),
                end_line: None,
            }],
            primary_location_index: 0,
        }
    }

    #[test]
    fn inline_body_carries_marker_and_linked_rule() {
        let body = inline_body(&violation(
            "check CRUD",
            vec!["https://docs.pmd.example/crud".to_string()],
        ));
        assert!(body.contains(MARKER));
        assert!(body.contains("[ApexCRUDViolation](https://docs.pmd.example/crud)"));
        assert!(body.contains("| pmd | 3 |"));
    }

    #[test]
    fn rule_without_resources_is_plain_text() {
        let body = inline_body(&violation("check CRUD", vec![]));
        assert!(body.contains("| ApexCRUDViolation |"));
        assert!(!body.contains("]("));
    }

    #[test]
    fn pipes_in_messages_do_not_break_the_table() {
        let body = inline_body(&violation("a | b", vec![]));
        assert!(body.contains("a \\| b"));
    }

    #[test]
    fn overflow_rule_is_linked_when_a_resource_exists() {
        let entries = vec![Overflow::Unplaced {
            index: 0,
            file: "src/A.cls".to_string(),
            line: 2,
            rule: "RuleA".to_string(),
            engine: "pmd".to_string(),
            severity: 1,
            message: "short".to_string(),
            url: Some("https://docs.pmd.example/a".to_string()),
        }];
        let body = overflow_body(&entries, 200);
        assert!(body.contains("[RuleA](https://docs.pmd.example/a)"));
    }

    #[test]
    fn overflow_body_truncates_messages_to_budget() {
        let entries = vec![Overflow::Unplaced {
            index: 0,
            file: "src/A.cls".to_string(),
            line: 12,
            rule: "LongRule".to_string(),
            engine: "pmd".to_string(),
            severity: 2,
            message: "x".repeat(300),
            url: None,
        }];
        let body = overflow_body(&entries, 40);
        assert!(body.contains(MARKER));
        assert!(body.contains("| src/A.cls | 12 | LongRule | 2 |"));
        assert!(body.contains(&format!("{}…", "x".repeat(39))));
        assert!(!body.contains(&"x".repeat(41)));
    }
}
