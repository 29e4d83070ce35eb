//! Git repository wrapper.

use git2::{build::CheckoutBuilder, ErrorCode, Oid, Repository, Sort};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Not a git repository: {0}")]
    NotARepository(PathBuf),

    #[error("Invalid commit: {0}")]
    InvalidCommit(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),
}

/// Result type for git operations.
pub type Result<T> = std::result::Result<T, GitError>;

impl GitError {
    fn is_not_found(&self) -> bool {
        match self {
            GitError::Git(e) => matches!(
                e.code(),
                ErrorCode::NotFound
                    | ErrorCode::InvalidSpec
                    | ErrorCode::Ambiguous
                    | ErrorCode::UnbornBranch
            ),
            GitError::NotARepository(_) => false,
            GitError::InvalidCommit(_) | GitError::PathNotFound(_) => true,
        }
    }
}

impl From<GitError> for histmine_core::Error {
    fn from(err: GitError) -> Self {
        if err.is_not_found() {
            histmine_core::Error::NotFound(err.to_string())
        } else {
            histmine_core::Error::backend(err)
        }
    }
}

/// A local repository shared across worker threads.
///
/// `git2::Repository` is not `Sync`, so each call borrows one handle from a
/// small pool and opens another when all are in use.
pub struct GitRepository {
    path: PathBuf,
    handles: Mutex<Vec<Repository>>,
}

impl GitRepository {
    /// Open the repository whose working tree (or git dir) is `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let repo = Repository::open(&path).map_err(|e| match e.code() {
            ErrorCode::NotFound => GitError::NotARepository(path.clone()),
            _ => GitError::Git(e),
        })?;
        debug!(path = %path.display(), "Opened repository");

        Ok(Self {
            path,
            handles: Mutex::new(vec![repo]),
        })
    }

    /// Get the repository root path.
    pub fn root(&self) -> &Path {
        &self.path
    }

    /// Directory name of the repository.
    pub fn project_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Run `f` with a repository handle no other thread is using.
    pub(crate) fn with_repo<T>(&self, f: impl FnOnce(&Repository) -> Result<T>) -> Result<T> {
        let handle = self.handles.lock().pop();
        let repo = match handle {
            Some(repo) => repo,
            None => Repository::open(&self.path)?,
        };
        let result = f(&repo);
        self.handles.lock().push(repo);
        result
    }

    /// Check out `hash` with a detached HEAD, discarding local changes.
    pub fn checkout(&self, hash: &str) -> Result<()> {
        self.with_repo(|repo| {
            let oid = parse_oid(hash)?;
            repo.set_head_detached(oid)?;
            repo.checkout_head(Some(CheckoutBuilder::new().force()))?;
            info!(commit = hash, "Checked out commit");
            Ok(())
        })
    }

    /// Return the working tree to the tip of `branch`.
    pub fn reset(&self, branch: &str) -> Result<()> {
        self.with_repo(|repo| {
            let refname = format!("refs/heads/{}", branch);
            repo.find_reference(&refname)?;
            repo.set_head(&refname)?;
            repo.checkout_head(Some(CheckoutBuilder::new().force()))?;
            info!(branch, "Reset working tree");
            Ok(())
        })
    }

    /// Files of the working tree, `.git` excluded.
    pub fn files(&self) -> Vec<PathBuf> {
        WalkDir::new(&self.path)
            .into_iter()
            .filter_entry(|e| e.file_name() != ".git")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect()
    }

    /// Number of commits reachable from HEAD.
    pub fn total_commits(&self) -> Result<usize> {
        self.with_repo(|repo| {
            let mut revwalk = repo.revwalk()?;
            revwalk.push_head()?;
            revwalk.set_sorting(Sort::NONE)?;
            Ok(revwalk.count())
        })
    }
}

pub(crate) fn parse_oid(hash: &str) -> Result<Oid> {
    Oid::from_str(hash).map_err(|_| GitError::InvalidCommit(hash.to_string()))
}

pub(crate) fn find_commit<'r>(repo: &'r Repository, hash: &str) -> Result<git2::Commit<'r>> {
    Ok(repo.find_commit(parse_oid(hash)?)?)
}
