//! Commit records produced by the traversal.

use crate::backend::{ChangeEntry, ObjectId, Revision};
use crate::context::RepoContext;
use crate::dmm;
use crate::error::Result;
use crate::method::DmmProperty;
use crate::modified_file::ModifiedFile;
use chrono::{DateTime, FixedOffset};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Author or committer identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Developer {
    pub name: String,
    pub email: String,
}

impl fmt::Display for Developer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.email.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} <{}>", self.name, self.email)
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct DiffStats {
    insertions: usize,
    deletions: usize,
    files: usize,
}

/// A commit and its lazily computed derivations.
///
/// Identity and metadata are fixed at construction. Diff entries, modified
/// files, line statistics and branch membership are computed at most once,
/// on first access.
pub struct Commit {
    revision: Revision,
    author: Developer,
    committer: Developer,
    context: Arc<RepoContext>,
    diff_entries: OnceCell<Vec<ChangeEntry>>,
    modified_files: OnceCell<Vec<ModifiedFile>>,
    stats: OnceCell<DiffStats>,
    branches: OnceCell<Vec<String>>,
}

impl Commit {
    pub fn new(revision: Revision, context: Arc<RepoContext>) -> Self {
        let author = Developer {
            name: revision.author.name.clone(),
            email: revision.author.email.clone(),
        };
        let committer = Developer {
            name: revision.committer.name.clone(),
            email: revision.committer.email.clone(),
        };
        Self {
            revision,
            author,
            committer,
            context,
            diff_entries: OnceCell::new(),
            modified_files: OnceCell::new(),
            stats: OnceCell::new(),
            branches: OnceCell::new(),
        }
    }

    pub fn hash(&self) -> &str {
        &self.revision.id
    }

    /// Commit message, surrounding whitespace trimmed.
    pub fn msg(&self) -> &str {
        self.revision.message.trim()
    }

    pub fn author(&self) -> &Developer {
        &self.author
    }

    pub fn committer(&self) -> &Developer {
        &self.committer
    }

    pub fn author_date(&self) -> DateTime<FixedOffset> {
        self.revision.author.time
    }

    pub fn committer_date(&self) -> DateTime<FixedOffset> {
        self.revision.committer.time
    }

    /// Author offset in seconds east of UTC.
    pub fn author_timezone(&self) -> i32 {
        self.revision.author.time.offset().local_minus_utc()
    }

    /// Committer offset in seconds east of UTC.
    pub fn committer_timezone(&self) -> i32 {
        self.revision.committer.time.offset().local_minus_utc()
    }

    pub fn parents(&self) -> &[ObjectId] {
        &self.revision.parents
    }

    pub fn merge(&self) -> bool {
        self.revision.is_merge()
    }

    pub fn project_name(&self) -> String {
        self.context.project_name()
    }

    pub fn project_path(&self) -> &Path {
        &self.context.project_path
    }

    pub fn revision(&self) -> &Revision {
        &self.revision
    }

    pub(crate) fn context(&self) -> &RepoContext {
        &self.context
    }

    /// Tree diff against the first parent, or the empty tree for a root commit.
    ///
    /// Merge commits have no diff entries.
    pub fn diff_entries(&self) -> Result<&[ChangeEntry]> {
        let entries = self.diff_entries.get_or_try_init(|| {
            if self.merge() {
                return Ok(Vec::new());
            }
            self.context.backend.tree_diff(
                self.revision.parents.first().map(String::as_str),
                &self.revision.id,
                &self.context.diff_options,
            )
        })?;
        Ok(entries)
    }

    pub fn modified_files(&self) -> Result<&[ModifiedFile]> {
        let files = self.modified_files.get_or_try_init(|| {
            let parent = self.revision.parents.first().cloned();
            Ok::<_, crate::Error>(
                self.diff_entries()?
                    .iter()
                    .cloned()
                    .map(|entry| {
                        ModifiedFile::new(
                            entry,
                            self.revision.id.clone(),
                            parent.clone(),
                            Arc::clone(&self.context),
                        )
                    })
                    .collect(),
            )
        })?;
        Ok(files)
    }

    fn stats(&self) -> Result<DiffStats> {
        self.stats
            .get_or_try_init(|| {
                let files = self.modified_files()?;
                Ok::<_, crate::Error>(DiffStats {
                    insertions: files.iter().map(ModifiedFile::added_lines).sum(),
                    deletions: files.iter().map(ModifiedFile::deleted_lines).sum(),
                    files: files.len(),
                })
            })
            .copied()
    }

    /// Lines added across all modified files.
    pub fn insertions(&self) -> Result<usize> {
        Ok(self.stats()?.insertions)
    }

    pub fn deletions(&self) -> Result<usize> {
        Ok(self.stats()?.deletions)
    }

    /// Insertions plus deletions.
    pub fn lines(&self) -> Result<usize> {
        let stats = self.stats()?;
        Ok(stats.insertions + stats.deletions)
    }

    /// Number of modified files.
    pub fn files(&self) -> Result<usize> {
        Ok(self.stats()?.files)
    }

    /// Local branches containing this commit.
    pub fn branches(&self) -> Result<&[String]> {
        let branches = self
            .branches
            .get_or_try_init(|| self.context.backend.branches_containing(&self.revision.id))?;
        Ok(branches)
    }

    /// True when the repository's main branch contains this commit.
    pub fn in_main_branch(&self) -> Result<bool> {
        let Some(main) = self.context.main_branch.as_deref() else {
            return Ok(false);
        };
        Ok(self.branches()?.iter().any(|b| b == main))
    }

    pub fn dmm_unit_size(&self) -> Option<f64> {
        self.dmm(DmmProperty::UnitSize)
    }

    pub fn dmm_unit_complexity(&self) -> Option<f64> {
        self.dmm(DmmProperty::UnitComplexity)
    }

    pub fn dmm_unit_interfacing(&self) -> Option<f64> {
        self.dmm(DmmProperty::UnitInterfacing)
    }

    /// Delta maintainability for `property`.
    ///
    /// `None` when no modified file is in a supported language. Files whose
    /// analysis fails are left out of the aggregate.
    pub fn dmm(&self, property: DmmProperty) -> Option<f64> {
        let files = match self.modified_files() {
            Ok(files) => files,
            Err(e) => {
                warn!(commit = %self.hash(), "Could not compute modified files: {}", e);
                return None;
            }
        };

        let deltas = files.iter().filter_map(|file| {
            match file.delta_risk_profile(property) {
                Ok(delta) => delta,
                Err(e) => {
                    warn!(
                        commit = %self.hash(),
                        file = file.path(),
                        "Skipping file in {}: {}",
                        property.as_str(),
                        e
                    );
                    None
                }
            }
        });
        dmm::commit_dmm(deltas)
    }
}

impl fmt::Debug for Commit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Commit")
            .field("hash", &self.revision.id)
            .field("author", &self.author)
            .field("committer_date", &self.revision.committer.time)
            .field("parents", &self.revision.parents)
            .finish_non_exhaustive()
    }
}
