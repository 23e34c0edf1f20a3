use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use crate::github::ChangedFile;

/// Commentable surface of one changed file, built from its unified-diff
/// patch text.
///
/// `valid_lines` holds every new-file line number an inline comment can
/// attach to (additions and context lines). `line_to_position` maps each
/// of those lines to its 1-based diff position: the index of the patch
/// line counting every line of the patch, hunk headers included. The
/// hosting platform addresses inline comments by either coordinate, and
/// the two must never be confused.
#[derive(Debug, Clone)]
pub struct DiffFile {
    pub path: String,
    pub valid_lines: BTreeSet<u32>,
    pub line_to_position: BTreeMap<u32, u32>,
}

impl DiffFile {
    pub fn is_commentable(&self, line: u32) -> bool {
        self.valid_lines.contains(&line)
    }

    pub fn position_of(&self, line: u32) -> Option<u32> {
        self.line_to_position.get(&line).copied()
    }
}

/// Index over every changed file that carries patch text, keyed by the
/// platform's repo-relative path. Built once per run, read-only after.
#[derive(Debug, Default)]
pub struct DiffIndex {
    files: BTreeMap<String, DiffFile>,
}

impl DiffIndex {
    /// Build the index in one pass over the PR's changed-file list.
    ///
    /// Files without patch text (renamed, removed, binary) are excluded:
    /// they have no diff positions to comment on.
    pub fn build(changed: &[ChangedFile]) -> Self {
        let mut files = BTreeMap::new();
        for file in changed {
            let Some(patch) = &file.patch else {
                trace!("skipping {} ({}): no patch text", file.filename, file.status);
                continue;
            };
            let parsed = parse_patch(&file.filename, patch);
            debug!(
                "indexed {}: {} commentable lines",
                file.filename,
                parsed.valid_lines.len()
            );
            files.insert(file.filename.clone(), parsed);
        }
        Self { files }
    }

    pub fn get(&self, path: &str) -> Option<&DiffFile> {
        self.files.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Walk one file's patch text, assigning diff positions and collecting
/// commentable new-file lines.
///
/// Every patch line consumes one position slot, the hunk header
/// included. `current_line` tracks the next new-file line number and
/// resets at each hunk header; `position` never resets across hunks.
fn parse_patch(path: &str, patch: &str) -> DiffFile {
    let mut valid_lines = BTreeSet::new();
    let mut line_to_position = BTreeMap::new();
    let mut current_line: u32 = 0;
    let mut position: u32 = 0;

    for raw in patch.lines() {
        position += 1;

        if raw.starts_with("@@") {
            current_line = parse_hunk_new_start(raw).unwrap_or(current_line);
            continue;
        }
        if raw.starts_with('+') && !raw.starts_with("+++") {
            valid_lines.insert(current_line);
            line_to_position.insert(current_line, position);
            current_line = current_line.saturating_add(1);
            continue;
        }
        if raw.starts_with('-') && !raw.starts_with("---") {
            // Deleted line: occupies a position slot, maps to no new-file line.
            continue;
        }
        if raw.starts_with('\\') {
            // "\ No newline at end of file": a position slot, nothing more.
            continue;
        }
        // Context line (leading space, or empty when trimmed in transit).
        valid_lines.insert(current_line);
        line_to_position.insert(current_line, position);
        current_line = current_line.saturating_add(1);
    }

    DiffFile {
        path: path.to_string(),
        valid_lines,
        line_to_position,
    }
}

/// Extract the new-range start `c` from a hunk header `@@ -a,b +c,d @@`
fn parse_hunk_new_start(line: &str) -> Option<u32> {
    let plus_pos = line.find(" +")?;
    let tail = &line[(plus_pos + 2)..];
    let digits: String = tail.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<u32>().ok()
}
