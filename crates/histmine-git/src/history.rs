//! Commits touching one path.

use crate::repository::{parse_oid, Result};
use git2::{Commit, DiffFindOptions, ErrorCode, Oid, Repository, Sort};
use std::path::Path;
use tracing::debug;

/// Commits reachable from `head` that change `path`, newest first.
///
/// A merge counts only when the path differs from every parent. Once the
/// commit that renamed the file is reached the search continues under the
/// old name. A path deleted before `head` is found through its deletion.
pub fn path_history(repo: &Repository, path: &str, head: &str) -> Result<Vec<String>> {
    let mut revwalk = repo.revwalk()?;
    revwalk.push(parse_oid(head)?)?;
    revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;

    let mut tracked = path.to_string();
    let mut touching = Vec::new();
    for oid in revwalk {
        let commit = repo.find_commit(oid?)?;
        let current = entry_id(&commit, &tracked)?;

        let mut parent_ids = Vec::new();
        for parent in commit.parents() {
            parent_ids.push(entry_id(&parent, &tracked)?);
        }
        let changed = if parent_ids.is_empty() {
            current.is_some()
        } else {
            parent_ids.iter().all(|id| *id != current)
        };
        if !changed {
            continue;
        }
        touching.push(commit.id().to_string());

        if current.is_some() && parent_ids.first() == Some(&None) {
            if let Some(old) = renamed_from(repo, &commit, &tracked)? {
                debug!(from = %old, to = %tracked, commit = %commit.id(), "Following rename");
                tracked = old;
            }
        }
    }
    Ok(touching)
}

/// Blob id of `path` in the commit's tree, `None` if absent.
fn entry_id(commit: &Commit, path: &str) -> Result<Option<Oid>> {
    match commit.tree()?.get_path(Path::new(path)) {
        Ok(entry) => Ok(Some(entry.id())),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Old name of `path` if the commit renamed it from its first parent.
fn renamed_from(repo: &Repository, commit: &Commit, path: &str) -> Result<Option<String>> {
    let parent_tree = commit.parent(0)?.tree()?;
    let mut diff = repo.diff_tree_to_tree(Some(&parent_tree), Some(&commit.tree()?), None)?;
    diff.find_similar(Some(DiffFindOptions::new().renames(true)))?;

    let renamed = diff
        .deltas()
        .filter(|d| d.status() == git2::Delta::Renamed)
        .find(|d| d.new_file().path() == Some(Path::new(path)))
        .and_then(|d| d.old_file().path().map(|p| p.to_string_lossy().into_owned()));
    Ok(renamed)
}
