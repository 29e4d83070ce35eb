//! [`GitBackend`] over libgit2.

use crate::blame::blame_lines;
use crate::commit::revision_from_commit;
use crate::diff;
use crate::history;
use crate::repository::{find_commit, parse_oid, GitRepository};
use git2::{BranchType, ErrorCode, Sort};
use histmine_core::{
    BlameLine, ChangeEntry, DiffOptions, GitBackend, ObjectId, Result, Revision, SortMode, Tag,
    WalkRequest,
};
use std::path::Path;
use tracing::debug;

fn sorting(mode: SortMode) -> Sort {
    match mode {
        SortMode::Insertion => Sort::NONE,
        SortMode::Reverse => Sort::TOPOLOGICAL | Sort::TIME | Sort::REVERSE,
        SortMode::Topological => Sort::TOPOLOGICAL,
        SortMode::CommitTimeDesc => Sort::TIME,
    }
}

impl GitBackend for GitRepository {
    fn resolve_ref(&self, name: &str) -> Result<ObjectId> {
        Ok(self.with_repo(|repo| {
            let commit = repo.revparse_single(name)?.peel_to_commit()?;
            Ok(commit.id().to_string())
        })?)
    }

    fn revision(&self, id: &str) -> Result<Revision> {
        Ok(self.with_repo(|repo| Ok(revision_from_commit(&find_commit(repo, id)?)))?)
    }

    fn walk(&self, request: &WalkRequest) -> Result<Vec<ObjectId>> {
        Ok(self.with_repo(|repo| {
            let mut revwalk = repo.revwalk()?;
            revwalk.set_sorting(sorting(request.sort))?;
            for start in &request.starts {
                revwalk.push(parse_oid(start)?)?;
            }
            for hidden in &request.hidden {
                revwalk.hide(parse_oid(hidden)?)?;
            }
            let ids = revwalk
                .map(|oid| oid.map(|o| o.to_string()))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            debug!(commits = ids.len(), sort = ?request.sort, "Walked revisions");
            Ok(ids)
        })?)
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        Ok(self.with_repo(|repo| {
            Ok(repo.graph_descendant_of(parse_oid(descendant)?, parse_oid(ancestor)?)?)
        })?)
    }

    fn tree_diff(
        &self,
        old: Option<&str>,
        new: &str,
        options: &DiffOptions,
    ) -> Result<Vec<ChangeEntry>> {
        Ok(self.with_repo(|repo| diff::tree_diff(repo, old, new, options))?)
    }

    fn file_bytes(&self, commit: &str, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.with_repo(|repo| {
            let tree = find_commit(repo, commit)?.tree()?;
            let entry = match tree.get_path(Path::new(path)) {
                Ok(entry) => entry,
                Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            let blob = repo.find_blob(entry.id())?;
            Ok(Some(blob.content().to_vec()))
        })?)
    }

    fn blame(&self, commit: &str, path: &str) -> Result<Vec<BlameLine>> {
        Ok(self.with_repo(|repo| blame_lines(repo, commit, path))?)
    }

    fn path_history(&self, path: &str, head: &str) -> Result<Vec<ObjectId>> {
        Ok(self.with_repo(|repo| history::path_history(repo, path, head))?)
    }

    fn list_tags(&self) -> Result<Vec<Tag>> {
        Ok(self.with_repo(|repo| {
            let mut tags = Vec::new();
            for name in repo.tag_names(None)?.iter().flatten() {
                let target = repo
                    .revparse_single(&format!("refs/tags/{}", name))
                    .and_then(|object| object.peel_to_commit());
                match target {
                    Ok(commit) => tags.push(Tag {
                        name: name.to_string(),
                        commit: commit.id().to_string(),
                    }),
                    Err(e) => debug!(tag = name, "Skipping tag without a commit: {}", e),
                }
            }
            Ok(tags)
        })?)
    }

    fn branches_containing(&self, id: &str) -> Result<Vec<String>> {
        Ok(self.with_repo(|repo| {
            let oid = parse_oid(id)?;
            let mut names = Vec::new();
            for branch in repo.branches(Some(BranchType::Local))? {
                let (branch, _) = branch?;
                let Some(tip) = branch.get().target() else {
                    continue;
                };
                if tip == oid || repo.graph_descendant_of(tip, oid)? {
                    if let Some(name) = branch.name()? {
                        names.push(name.to_string());
                    }
                }
            }
            Ok(names)
        })?)
    }

    fn main_branch(&self) -> Result<Option<String>> {
        Ok(self.with_repo(|repo| match repo.head() {
            Ok(head) if head.is_branch() => Ok(head.shorthand().map(String::from)),
            Ok(_) => Ok(None),
            Err(e) if e.code() == ErrorCode::UnbornBranch => Ok(None),
            Err(e) => Err(e.into()),
        })?)
    }
}
