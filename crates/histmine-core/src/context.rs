//! Shared state of the repository currently being mined.

use crate::analysis::SourceAnalyzer;
use crate::backend::{DiffOptions, GitBackend};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Backend handle, analyzer and settings shared by every record of one repository.
///
/// Built once per repository traversal and dropped before the next
/// repository is opened.
pub struct RepoContext {
    pub backend: Arc<dyn GitBackend>,
    pub analyzer: Arc<dyn SourceAnalyzer>,
    pub diff_options: DiffOptions,
    pub project_path: PathBuf,
    pub main_branch: Option<String>,
}

impl RepoContext {
    pub fn new(
        backend: Arc<dyn GitBackend>,
        analyzer: Arc<dyn SourceAnalyzer>,
        project_path: impl AsRef<Path>,
    ) -> Self {
        Self {
            backend,
            analyzer,
            diff_options: DiffOptions::default(),
            project_path: project_path.as_ref().to_path_buf(),
            main_branch: None,
        }
    }

    pub fn with_diff_options(mut self, diff_options: DiffOptions) -> Self {
        self.diff_options = diff_options;
        self
    }

    pub fn with_main_branch(mut self, main_branch: Option<String>) -> Self {
        self.main_branch = main_branch;
        self
    }

    /// Last component of the project path.
    pub fn project_name(&self) -> String {
        self.project_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl fmt::Debug for RepoContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepoContext")
            .field("project_path", &self.project_path)
            .field("main_branch", &self.main_branch)
            .field("diff_options", &self.diff_options)
            .finish_non_exhaustive()
    }
}
