//! Git blame functionality.

use crate::repository::{parse_oid, GitError, Result};
use git2::{BlameOptions, Repository};
use histmine_core::BlameLine;
use std::path::Path;

/// Origin of every line of `path` as of `commit`; index `i` is line `i + 1`.
pub fn blame_lines(repo: &Repository, commit: &str, path: &str) -> Result<Vec<BlameLine>> {
    let mut opts = BlameOptions::new();
    opts.newest_commit(parse_oid(commit)?).ignore_whitespace(true);
    let blame = repo
        .blame_file(Path::new(path), Some(&mut opts))
        .map_err(|e| match e.code() {
            git2::ErrorCode::NotFound => GitError::PathNotFound(format!("{path} at {commit}")),
            _ => GitError::Git(e),
        })?;

    let mut lines = Vec::new();
    for hunk in blame.iter() {
        let first = hunk.final_start_line().saturating_sub(1);
        let end = first + hunk.lines_in_hunk();
        if lines.len() < end {
            lines.resize(
                end,
                BlameLine {
                    origin: String::new(),
                    unblamable: true,
                },
            );
        }
        let origin = hunk.final_commit_id().to_string();
        for line in &mut lines[first..end] {
            *line = BlameLine {
                origin: origin.clone(),
                unblamable: false,
            };
        }
    }
    Ok(lines)
}
