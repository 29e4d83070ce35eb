//! Process metrics over a commit range.

use crate::analysis::SourceAnalyzer;
use crate::backend::BackendProvider;
use crate::error::{Error, Result};
use crate::filter::{MiningOptions, Order};
use crate::miner::RepositoryMiner;
use chrono::{DateTime, FixedOffset};
use std::sync::Arc;
use tracing::warn;

/// Bounds of the range a process metric covers.
#[derive(Debug, Clone, Default)]
pub struct MetricRange {
    pub since: Option<DateTime<FixedOffset>>,
    pub to: Option<DateTime<FixedOffset>>,
    pub from_commit: Option<String>,
    pub to_commit: Option<String>,
}

impl MetricRange {
    fn options(&self) -> Result<MiningOptions> {
        if self.since.is_none() && self.from_commit.is_none() {
            return Err(Error::Config(
                "A process metric needs since or from_commit".into(),
            ));
        }
        if self.to.is_none() && self.to_commit.is_none() {
            return Err(Error::Config("A process metric needs to or to_commit".into()));
        }

        let mut options = MiningOptions::new();
        match (&self.from_commit, &self.to_commit) {
            (Some(from), Some(to)) if from == to => return Ok(options.with_single(from.clone())),
            _ => {}
        }
        options.since = self.since;
        options.to = self.to;
        options.from_commit = self.from_commit.clone();
        options.to_commit = self.to_commit.clone();
        Ok(options.with_order(Order::Reverse))
    }
}

/// Number of files committed together, per commit in the range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    sizes: Vec<usize>,
}

impl ChangeSet {
    pub fn new<I, S>(
        locations: I,
        range: &MetricRange,
        provider: Arc<dyn BackendProvider>,
        analyzer: Arc<dyn SourceAnalyzer>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let miner = RepositoryMiner::new(locations, range.options()?, provider, analyzer)?;
        let mut sizes = Vec::new();
        for commit in miner.traverse_commits() {
            let commit = commit?;
            match commit.modified_files() {
                Ok(files) => sizes.push(files.len()),
                Err(e) => warn!(commit = %commit.hash(), "Could not count modified files: {}", e),
            }
        }
        Ok(Self { sizes })
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Largest number of files modified together.
    pub fn max(&self) -> usize {
        self.sizes.iter().copied().max().unwrap_or(0)
    }

    /// Mean change-set size, rounded.
    pub fn avg(&self) -> usize {
        if self.sizes.is_empty() {
            return 0;
        }
        let total: usize = self.sizes.iter().sum();
        (total as f64 / self.sizes.len() as f64).round() as usize
    }
}
