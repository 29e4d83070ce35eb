//! Histmine Git Integration
//!
//! libgit2 implementation of the mining backend: revision walks, tree diffs,
//! blame and path history, plus repository opening and cloning.

mod backend;
pub mod blame;
pub mod commit;
pub mod diff;
pub mod history;
pub mod provider;
pub mod repository;

pub use provider::Git2Provider;
pub use repository::{GitError, GitRepository};
