//! Interfaces consumed from the version-control backend.
//!
//! The mining engine never touches the object store directly. Everything it
//! needs from git goes through [`GitBackend`], and repositories are opened or
//! cloned through a [`BackendProvider`]. Implementations must be `Send + Sync`
//! because commit records are built on worker threads.

use crate::error::Result;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Full hexadecimal object id.
pub type ObjectId = String;

/// Name, email and timestamp of an author or committer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    /// Timestamp with the offset recorded in the commit.
    pub time: DateTime<FixedOffset>,
}

/// Raw commit metadata as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub id: ObjectId,
    pub parents: Vec<ObjectId>,
    pub author: Signature,
    pub committer: Signature,
    pub message: String,
}

impl Revision {
    /// True when the revision has more than one parent.
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

/// Kind of change a diff entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModificationType {
    Add,
    Copy,
    Rename,
    Delete,
    Modify,
    Unknown,
}

impl ModificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModificationType::Add => "ADD",
            ModificationType::Copy => "COPY",
            ModificationType::Rename => "RENAME",
            ModificationType::Delete => "DELETE",
            ModificationType::Modify => "MODIFY",
            ModificationType::Unknown => "UNKNOWN",
        }
    }
}

/// One path's change between two trees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub kind: ModificationType,
    /// `None` iff the entry is an addition.
    pub old_path: Option<String>,
    /// `None` iff the entry is a deletion.
    pub new_path: Option<String>,
    /// Unified diff hunks, from the first `@@` header on.
    pub diff: String,
}

/// Blame result for one line of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameLine {
    /// Commit that introduced the line.
    pub origin: ObjectId,
    /// Backend could not attribute this line (e.g. ignored revision).
    pub unblamable: bool,
}

/// A tag and the commit it ultimately points to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub commit: ObjectId,
}

/// Walk order requested from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// Backend's natural order (newest first).
    Insertion,
    /// Oldest first, parents always before children.
    #[default]
    Reverse,
    /// Children before parents.
    Topological,
    /// Newest committer time first.
    CommitTimeDesc,
}

/// Algorithm and whitespace policy for tree diffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiffOptions {
    /// Use the backend's alternative (histogram-like) algorithm instead of Myers.
    pub histogram: bool,
    /// Ignore whitespace changes.
    pub ignore_whitespace: bool,
}

/// Revision walk arguments produced by the filter resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkRequest {
    /// Commits the walk starts from.
    pub starts: Vec<ObjectId>,
    /// Commits whose ancestry is excluded.
    pub hidden: Vec<ObjectId>,
    pub sort: SortMode,
}

/// Commit graph access, tree diffing and blame.
pub trait GitBackend: Send + Sync {
    /// Resolve a ref name, tag or (short) hash to a full commit id.
    fn resolve_ref(&self, name: &str) -> Result<ObjectId>;

    /// Load the metadata of one commit.
    fn revision(&self, id: &str) -> Result<Revision>;

    /// Ordered ids reachable from the request's starts, minus hidden ancestry.
    fn walk(&self, request: &WalkRequest) -> Result<Vec<ObjectId>>;

    /// True when `descendant` has `ancestor` in its history.
    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool>;

    /// Diff the tree of `old` (or the empty tree) against the tree of `new`, detecting renames.
    fn tree_diff(
        &self,
        old: Option<&str>,
        new: &str,
        options: &DiffOptions,
    ) -> Result<Vec<ChangeEntry>>;

    /// Bytes of `path` in the tree of `commit`, `None` if the path is absent.
    fn file_bytes(&self, commit: &str, path: &str) -> Result<Option<Vec<u8>>>;

    /// Per-line origins of `path` as of `commit`, indexed by line number minus one.
    fn blame(&self, commit: &str, path: &str) -> Result<Vec<BlameLine>>;

    /// Commits touching `path` reachable from `head`, newest first.
    ///
    /// Renames are followed back to the file's earlier names, and a path
    /// deleted before `head` still reports its history.
    fn path_history(&self, path: &str, head: &str) -> Result<Vec<ObjectId>>;

    fn list_tags(&self) -> Result<Vec<Tag>>;

    /// Short names of local branches containing `id`.
    fn branches_containing(&self, id: &str) -> Result<Vec<String>>;

    /// Short name of the branch HEAD points at, `None` when detached or unborn.
    fn main_branch(&self) -> Result<Option<String>>;
}

/// Opens local repositories and clones remote ones.
pub trait BackendProvider: Send + Sync {
    fn open(&self, path: &Path) -> Result<Arc<dyn GitBackend>>;

    /// Clone `url` into `dest`, which must not already hold a repository.
    fn clone_repository(&self, url: &str, dest: &Path) -> Result<()>;
}
