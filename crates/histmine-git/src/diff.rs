//! Tree diffs with rename detection.

use crate::repository::{find_commit, Result};
use git2::{Delta, Diff, DiffFindOptions, Patch, Repository};
use histmine_core::{ChangeEntry, DiffOptions, ModificationType};
use tracing::debug;

/// Changes between the tree of `old` (empty tree when `None`) and `new`.
pub fn tree_diff(
    repo: &Repository,
    old: Option<&str>,
    new: &str,
    options: &DiffOptions,
) -> Result<Vec<ChangeEntry>> {
    let new_tree = find_commit(repo, new)?.tree()?;
    let old_tree = match old {
        Some(hash) => Some(find_commit(repo, hash)?.tree()?),
        None => None,
    };

    let mut opts = git2::DiffOptions::new();
    opts.ignore_whitespace(options.ignore_whitespace)
        .patience(options.histogram);
    let mut diff = repo.diff_tree_to_tree(old_tree.as_ref(), Some(&new_tree), Some(&mut opts))?;
    diff.find_similar(Some(DiffFindOptions::new().renames(true)))?;

    let entries = change_entries(&diff)?;
    debug!(commit = new, changes = entries.len(), "Computed tree diff");
    Ok(entries)
}

fn change_entries(diff: &Diff) -> Result<Vec<ChangeEntry>> {
    let mut entries = Vec::with_capacity(diff.deltas().len());
    for (idx, delta) in diff.deltas().enumerate() {
        let kind = match delta.status() {
            Delta::Added => ModificationType::Add,
            Delta::Deleted => ModificationType::Delete,
            Delta::Modified => ModificationType::Modify,
            Delta::Renamed => ModificationType::Rename,
            Delta::Copied => ModificationType::Copy,
            _ => ModificationType::Unknown,
        };
        let path_of = |file: git2::DiffFile| {
            file.path().map(|p| p.to_string_lossy().replace('\\', "/"))
        };
        let old_path = match kind {
            ModificationType::Add => None,
            _ => path_of(delta.old_file()),
        };
        let new_path = match kind {
            ModificationType::Delete => None,
            _ => path_of(delta.new_file()),
        };

        let text = match Patch::from_diff(diff, idx)? {
            Some(mut patch) => {
                let buf = patch.to_buf()?;
                String::from_utf8_lossy(&buf).into_owned()
            }
            None => String::new(),
        };

        entries.push(ChangeEntry {
            kind,
            old_path,
            new_path,
            diff: hunks_only(&text).to_string(),
        });
    }
    Ok(entries)
}

/// Drop the `diff --git`/`---`/`+++` preamble; binary patches become empty.
fn hunks_only(patch: &str) -> &str {
    if patch.starts_with("@@") {
        return patch;
    }
    match patch.find("\n@@") {
        Some(pos) => &patch[pos + 1..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hunks_only() {
        let patch = "diff --git a/x b/x\nindex 1..2 100644\n--- a/x\n+++ b/x\n@@ -1 +1 @@\n-a\n+b\n";
        assert_eq!(hunks_only(patch), "@@ -1 +1 @@\n-a\n+b\n");
        assert_eq!(hunks_only("@@ -0,0 +1 @@\n+a\n"), "@@ -0,0 +1 @@\n+a\n");
        assert_eq!(hunks_only("diff --git a/x b/x\nBinary files differ\n"), "");
    }
}
