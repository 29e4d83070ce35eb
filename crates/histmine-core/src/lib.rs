//! Histmine Core Library
//!
//! Repository mining engine: option resolution, revision traversal, diff
//! parsing, Delta Maintainability Model scoring and blame attribution. The
//! git plumbing and source analysis are supplied through the [`GitBackend`]
//! and [`SourceAnalyzer`] traits.

pub mod analysis;
pub mod backend;
pub mod blame;
pub mod commit;
pub mod context;
pub mod diff;
pub mod dmm;
pub mod error;
pub mod filter;
pub mod language;
pub mod location;
pub mod method;
pub mod metrics;
pub mod miner;
pub mod modified_file;
pub mod pool;
pub mod walk;

#[cfg(test)]
pub mod testutils;

pub use analysis::{FileAnalysis, SourceAnalyzer};
pub use backend::{
    BackendProvider, BlameLine, ChangeEntry, DiffOptions, GitBackend, ModificationType, ObjectId,
    Revision, Signature, SortMode, Tag, WalkRequest,
};
pub use blame::{last_modified_lines, LastModifiedLines};
pub use commit::{Commit, Developer};
pub use context::RepoContext;
pub use diff::{parse_diff, ParsedDiff};
pub use error::{Error, Result};
pub use filter::{Dispatch, FilterResolver, MiningFilter, MiningOptions, Order};
pub use language::Language;
pub use method::{DmmProperty, Method};
pub use metrics::{ChangeSet, MetricRange};
pub use miner::{CommitStream, RepositoryMiner};
pub use modified_file::ModifiedFile;
