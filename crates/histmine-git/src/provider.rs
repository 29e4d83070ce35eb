//! Opening and cloning repositories for the miner.

use crate::repository::{GitError, GitRepository};
use git2::Repository;
use histmine_core::{BackendProvider, GitBackend, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// [`BackendProvider`] backed by libgit2.
#[derive(Debug, Default, Clone, Copy)]
pub struct Git2Provider;

impl Git2Provider {
    pub fn new() -> Self {
        Self
    }
}

impl BackendProvider for Git2Provider {
    fn open(&self, path: &Path) -> Result<Arc<dyn GitBackend>> {
        let repo = GitRepository::open(path)?;
        Ok(Arc::new(repo))
    }

    fn clone_repository(&self, url: &str, dest: &Path) -> Result<()> {
        Repository::clone(url, dest).map_err(GitError::from)?;
        info!(url, dest = %dest.display(), "Cloned repository");
        Ok(())
    }
}
