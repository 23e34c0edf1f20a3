use tracing::trace;

use crate::diff::DiffIndex;

/// Directory the CI job copies scanner inputs into. Scanner reports
/// prefix their paths with it; the PR's changed-file list does not.
const WORKSPACE_SENTINEL: &str = "changed-sources/";

/// Strip the workspace sentinel and any leading `./` or `/` from a raw
/// scanner path, yielding a best-effort repo-relative path.
pub fn normalize(raw: &str) -> &str {
    let path = match raw.find(WORKSPACE_SENTINEL) {
        Some(idx) => &raw[idx + WORKSPACE_SENTINEL.len()..],
        None => raw,
    };
    path.trim_start_matches("./").trim_start_matches('/')
}

/// Resolve a scanner-reported path to a diff-index key.
///
/// Resolution order, first match wins:
/// 1. exact equality with an index key
/// 2. unique match on `/<basename>` suffix among keys (ambiguity is a miss)
/// 3. either string being a suffix of the other
///
/// Returns None when the file is not part of the PR's diff; the caller
/// routes such findings to the aggregated comment.
pub fn resolve<'a>(index: &'a DiffIndex, raw: &str) -> Option<&'a str> {
    let path = normalize(raw);
    if path.is_empty() {
        return None;
    }

    if let Some(file) = index.get(path) {
        return Some(&file.path);
    }

    if let Some(basename) = path.rsplit('/').next() {
        let suffix = format!("/{basename}");
        let mut matches = index
            .paths()
            .filter(|key| key.ends_with(&suffix) || *key == basename);
        if let Some(first) = matches.next() {
            if matches.next().is_none() {
                trace!("resolved {} to {} by basename", raw, first);
                return Some(first);
            }
            trace!("basename of {} is ambiguous in the diff", raw);
        }
    }

    index
        .paths()
        .find(|key| path.ends_with(*key) || key.ends_with(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::ChangedFile;

    fn index_of(paths: &[&str]) -> DiffIndex {
        let files: Vec<ChangedFile> = paths
            .iter()
            .map(|p| ChangedFile {
                filename: p.to_string(),
                status: "modified".to_string(),
                patch: Some("@@ -1,1 +1,2 @@\n a\n+b".to_string()),
            })
            .collect();
        DiffIndex::build(&files)
    }

    #[test]
    fn strips_sentinel_and_leading_markers() {
        assert_eq!(
            normalize("/tmp/work/changed-sources/force-app/classes/A.cls"),
            "force-app/classes/A.cls"
        );
        assert_eq!(normalize("./src/A.cls"), "src/A.cls");
        assert_eq!(normalize("/src/A.cls"), "src/A.cls");
        assert_eq!(normalize("src/A.cls"), "src/A.cls");
    }

    #[test]
    fn exact_match_wins() {
        let index = index_of(&["src/A.cls", "other/A.cls"]);
        assert_eq!(resolve(&index, "src/A.cls"), Some("src/A.cls"));
    }

    #[test]
    fn unique_basename_matches_as_suffix() {
        let index = index_of(&["force-app/main/default/classes/Account.cls"]);
        assert_eq!(
            resolve(&index, "/scan/changed-sources/classes/Account.cls"),
            Some("force-app/main/default/classes/Account.cls")
        );
    }

    #[test]
    fn ambiguous_basename_is_a_miss() {
        let index = index_of(&["a/Thing.cls", "b/Thing.cls"]);
        assert_eq!(resolve(&index, "elsewhere/Thing.cls"), None);
    }

    #[test]
    fn suffix_containment_breaks_basename_ties() {
        // Basename alone is ambiguous; the longer suffix is not.
        let index = index_of(&["a/x/Thing.cls", "b/y/Thing.cls"]);
        assert_eq!(resolve(&index, "x/Thing.cls"), Some("a/x/Thing.cls"));
        // And the other direction: scanner path longer than the key.
        let index = index_of(&["x/Thing.cls", "y/Thing.cls"]);
        assert_eq!(resolve(&index, "deep/tree/x/Thing.cls"), Some("x/Thing.cls"));
    }

    #[test]
    fn unknown_file_is_unmatched() {
        let index = index_of(&["src/A.cls"]);
        assert_eq!(resolve(&index, "src/Missing.cls"), None);
        assert_eq!(resolve(&index, ""), None);
    }
}
