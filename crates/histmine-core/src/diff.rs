//! Unified diff line attribution.

use serde::{Deserialize, Serialize};

const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file";

/// Added and deleted lines of a unified diff, tagged with their line numbers.
///
/// Deleted lines carry their number in the old file, added lines their number
/// in the new file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDiff {
    pub added: Vec<(usize, String)>,
    pub deleted: Vec<(usize, String)>,
}

impl ParsedDiff {
    /// Line numbers (new side) of added lines.
    pub fn added_line_numbers(&self) -> impl Iterator<Item = usize> + '_ {
        self.added.iter().map(|(n, _)| *n)
    }

    /// Line numbers (old side) of deleted lines.
    pub fn deleted_line_numbers(&self) -> impl Iterator<Item = usize> + '_ {
        self.deleted.iter().map(|(n, _)| *n)
    }
}

/// Parse a single-file unified diff.
///
/// File headers (`diff --git`, `index`, `---`, `+++`) are skipped until the
/// first hunk; inside hunks every `-`/`+` line is content, even one that
/// itself starts with `---` or `+++`.
pub fn parse_diff(diff: &str) -> ParsedDiff {
    let mut parsed = ParsedDiff::default();
    let mut old_line: isize = 0;
    let mut new_line: isize = 0;
    let mut in_hunk = false;

    for raw in diff.lines() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        old_line += 1;
        new_line += 1;

        if line.starts_with("@@") {
            if let Some((old_start, new_start)) = parse_hunk_header(line) {
                old_line = old_start as isize - 1;
                new_line = new_start as isize - 1;
                in_hunk = true;
            }
            continue;
        }
        if line.starts_with("diff --git ") {
            in_hunk = false;
            continue;
        }
        if !in_hunk {
            continue;
        }

        if let Some(text) = line.strip_prefix('-') {
            parsed.deleted.push((line_number(old_line), text.to_string()));
            new_line -= 1;
        } else if let Some(text) = line.strip_prefix('+') {
            parsed.added.push((line_number(new_line), text.to_string()));
            old_line -= 1;
        } else if line == NO_NEWLINE_MARKER {
            old_line -= 1;
            new_line -= 1;
        }
    }

    parsed
}

/// Count added and deleted lines without keeping their text.
pub fn count_changes(diff: &str) -> (usize, usize) {
    let parsed = parse_diff(diff);
    (parsed.added.len(), parsed.deleted.len())
}

fn line_number(counter: isize) -> usize {
    counter.max(0) as usize
}

/// Old and new start lines of a `@@ -a,b +c,d @@` header.
fn parse_hunk_header(line: &str) -> Option<(usize, usize)> {
    let mut tokens = line.split_whitespace().skip(1);
    let old = tokens.next()?.strip_prefix('-')?;
    let new = tokens.next()?.strip_prefix('+')?;
    let start = |range: &str| range.split(',').next()?.parse::<usize>().ok();
    Some((start(old)?, start(new)?))
}
