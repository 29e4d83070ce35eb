//! Last-modified-lines attribution.
//!
//! For every line a commit deletes, blame the file as of the commit's first
//! parent and collect the commits that last touched those lines. This is the
//! core step of SZZ-style tracing of bug-introducing commits.

use crate::backend::{ModificationType, ObjectId};
use crate::commit::Commit;
use crate::error::Result;
use crate::modified_file::ModifiedFile;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Path to the set of commits that last modified its deleted lines.
pub type LastModifiedLines = BTreeMap<String, BTreeSet<ObjectId>>;

const COMMENT_MARKERS: [&str; 6] = ["//", "#", "/*", "'''", "\"\"\"", "*"];

/// True for lines that carry no code: blanks and comment lines.
pub fn is_useless_line(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || COMMENT_MARKERS.iter().any(|m| line.starts_with(m))
}

/// Attribute the lines deleted by `commit`.
///
/// With `modification` set only that file is considered. A file whose blame
/// fails is logged and left out of the result.
pub fn last_modified_lines(
    commit: &Commit,
    modification: Option<&ModifiedFile>,
) -> Result<LastModifiedLines> {
    let mut result = LastModifiedLines::new();
    let Some(parent) = commit.parents().first() else {
        return Ok(result);
    };

    let files: Vec<&ModifiedFile> = match modification {
        Some(file) => vec![file],
        None => commit.modified_files()?.iter().collect(),
    };

    for file in files {
        if let Err(e) = attribute_file(commit, parent, file, &mut result) {
            warn!(
                commit = %commit.hash(),
                file = file.path(),
                "Could not find file in commit, probably a double rename: {}",
                e
            );
        }
    }

    Ok(result)
}

fn attribute_file(
    commit: &Commit,
    parent: &str,
    file: &ModifiedFile,
    result: &mut LastModifiedLines,
) -> Result<()> {
    let deleted: Vec<&(usize, String)> = file
        .diff_parsed()
        .deleted
        .iter()
        .filter(|(_, text)| !is_useless_line(text))
        .collect();
    if deleted.is_empty() {
        return Ok(());
    }

    let blame_path = match file.change_type() {
        ModificationType::Rename | ModificationType::Delete => file.old_path(),
        _ => file.new_path(),
    }
    .unwrap_or_else(|| file.path());
    let key = match file.change_type() {
        ModificationType::Rename => file.new_path(),
        _ => Some(blame_path),
    }
    .unwrap_or(blame_path);

    let blame = commit.context().backend.blame(parent, blame_path)?;
    for (line_no, _) in deleted {
        let Some(line) = line_no.checked_sub(1).and_then(|i| blame.get(i)) else {
            debug!(path = blame_path, line = line_no, "Deleted line outside blame range");
            continue;
        };
        if line.unblamable {
            continue;
        }
        result
            .entry(key.to_string())
            .or_default()
            .insert(line.origin.clone());
    }

    Ok(())
}
