use serde::Deserialize;

/// A static-analysis finding with one or more source locations
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Finding detail shown to the reviewer
    pub message: String,
    /// Rule identifier (e.g. "ApexCRUDViolation")
    pub rule: String,
    /// Engine that produced the finding (e.g. "pmd", "eslint")
    pub engine: String,
    /// Numeric severity, lower is more severe
    pub severity: u32,
    /// Documentation URLs for the rule, first one is linked inline
    #[serde(default, rename = "resources")]
    pub resource_urls: Vec<String>,
    /// Source locations, at least one for a well-formed finding
    #[serde(default)]
    pub locations: Vec<Location>,
    /// Index into `locations` of the location to annotate
    #[serde(default)]
    pub primary_location_index: usize,
}

/// One source location as emitted by the scanner
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Raw scanner-emitted path, not yet repo-relative
    pub file: String,
    /// Start line (1-indexed)
    #[serde(default)]
    pub start_line: Option<i64>,
    /// End line (inclusive)
    #[serde(default)]
    pub end_line: Option<i64>,
}

/// An inline comment ready to post, carrying both the rendered markdown
/// body and the structured fields so overflow rendering never has to
/// re-parse rendered text.
#[derive(Debug, Clone)]
pub struct AnnotationCandidate {
    /// Repo-relative path, guaranteed to be a diff-index key
    pub path: String,
    /// New-file line number, guaranteed commentable
    pub line: u32,
    /// Rendered markdown body, marker included
    pub body: String,
    pub rule: String,
    pub engine: String,
    pub severity: u32,
    pub message: String,
    /// First resource URL, if the rule has documentation
    pub url: Option<String>,
    /// Line as reported by the scanner before fallback resolution
    pub source_line: u32,
}

/// A finding that will not be posted inline.
///
/// Both variants keep the original report index so the aggregated
/// comment preserves report order.
#[derive(Debug, Clone)]
pub enum Overflow {
    /// Never matched a diff file or commentable line
    Unplaced {
        index: usize,
        file: String,
        line: u32,
        rule: String,
        engine: String,
        severity: u32,
        message: String,
        url: Option<String>,
    },
    /// Matched, but the inline set was already at capacity
    OverCapacity {
        index: usize,
        candidate: AnnotationCandidate,
    },
}

impl Overflow {
    pub fn index(&self) -> usize {
        match self {
            Overflow::Unplaced { index, .. } => *index,
            Overflow::OverCapacity { index, .. } => *index,
        }
    }

    /// (file, line, rule, rule url, severity, message) as shown in the
    /// aggregated table
    pub fn row(&self) -> (&str, u32, &str, Option<&str>, u32, &str) {
        match self {
            Overflow::Unplaced {
                file,
                line,
                rule,
                severity,
                message,
                url,
                ..
            } => (file, *line, rule, url.as_deref(), *severity, message),
            Overflow::OverCapacity { candidate, .. } => (
                &candidate.path,
                candidate.line,
                &candidate.rule,
                candidate.url.as_deref(),
                candidate.severity,
                &candidate.message,
            ),
        }
    }
}

/// Outcome of one annotation run, reported by the synchronizer.
/// The caller derives the process exit status from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    /// Stale comments removed during cleanup
    pub deleted: usize,
    /// Inline comments created
    pub inline_posted: usize,
    /// Inline candidates that failed permanently
    pub inline_failed: usize,
    /// Whether the aggregated overflow comment was created
    pub overflow_posted: bool,
    /// Whether the aggregated overflow comment was attempted and failed
    pub overflow_failed: bool,
}
