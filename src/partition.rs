use tracing::{debug, info};

use crate::diff::DiffIndex;
use crate::matcher;
use crate::render;
use crate::types::{AnnotationCandidate, Overflow, Violation};

/// The two outputs of a run's placement pass: comments that will be
/// posted inline, and everything destined for the aggregated comment.
#[derive(Debug, Default)]
pub struct Partition {
    pub inline: Vec<AnnotationCandidate>,
    pub overflow: Vec<Overflow>,
}

/// Place each violation on the diff, in report order.
///
/// A violation lands inline when its primary location resolves to an
/// indexed file and a commentable line; everything else overflows. The
/// inline set is then capped at `max_inline`, and the excess moves to
/// overflow as already-built candidates.
pub fn partition(violations: &[Violation], index: &DiffIndex, max_inline: usize) -> Partition {
    let mut inline: Vec<(usize, AnnotationCandidate)> = Vec::new();
    let mut overflow: Vec<Overflow> = Vec::new();

    for (idx, violation) in violations.iter().enumerate() {
        match place(violation, index) {
            Placement::Inline(candidate) => {
                debug!(
                    "{} -> {}:{} (reported line {}, diff position {:?})",
                    violation.rule,
                    candidate.path,
                    candidate.line,
                    candidate.source_line,
                    index
                        .get(&candidate.path)
                        .and_then(|f| f.position_of(candidate.line))
                );
                inline.push((idx, candidate));
            }
            Placement::Overflow { file, line } => {
                debug!("{} -> overflow ({}:{})", violation.rule, file, line);
                overflow.push(unplaced(idx, violation, file, line));
            }
        }
    }

    if inline.len() > max_inline {
        let excess = inline.split_off(max_inline);
        info!(
            "inline cap reached: {} candidate(s) moved to the aggregated comment",
            excess.len()
        );
        overflow.extend(
            excess
                .into_iter()
                .map(|(index, candidate)| Overflow::OverCapacity { index, candidate }),
        );
    }

    overflow.sort_by_key(Overflow::index);

    Partition {
        inline: inline.into_iter().map(|(_, c)| c).collect(),
        overflow,
    }
}

enum Placement {
    Inline(AnnotationCandidate),
    Overflow { file: String, line: u32 },
}

fn place(violation: &Violation, index: &DiffIndex) -> Placement {
    let Some(location) = violation.locations.get(violation.primary_location_index) else {
        // Out-of-range primary index: insufficient location data.
        return Placement::Overflow {
            file: violation
                .locations
                .first()
                .map(|l| matcher::normalize(&l.file).to_string())
                .unwrap_or_default(),
            line: 0,
        };
    };

    let line = resolve_line(location);
    let Some(path) = matcher::resolve(index, &location.file) else {
        return Placement::Overflow {
            file: matcher::normalize(&location.file).to_string(),
            line,
        };
    };
    let path = path.to_string();

    let commentable = index.get(&path).is_some_and(|f| f.is_commentable(line));
    if !commentable {
        return Placement::Overflow { file: path, line };
    }

    Placement::Inline(AnnotationCandidate {
        body: render::inline_body(violation),
        path,
        line,
        rule: violation.rule.clone(),
        engine: violation.engine.clone(),
        severity: violation.severity,
        message: violation.message.clone(),
        url: violation.resource_urls.first().cloned(),
        source_line: location.start_line.and_then(|l| u32::try_from(l).ok()).unwrap_or(0),
    })
}

/// Start line if positive, else end line if positive, else 1
fn resolve_line(location: &crate::types::Location) -> u32 {
    for candidate in [location.start_line, location.end_line] {
        if let Some(line) = candidate {
            if line > 0 {
                if let Ok(line) = u32::try_from(line) {
                    return line;
                }
            }
        }
    }
    1
}

fn unplaced(index: usize, violation: &Violation, file: String, line: u32) -> Overflow {
    Overflow::Unplaced {
        index,
        file,
        line,
        rule: violation.rule.clone(),
        engine: violation.engine.clone(),
        severity: violation.severity,
        message: violation.message.clone(),
        url: violation.resource_urls.first().cloned(),
    }
}
