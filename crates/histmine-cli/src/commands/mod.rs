//! Subcommand implementations and the options they share.

pub mod attribute;
pub mod changeset;
pub mod commits;
pub mod dmm;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate};
use clap::Args;
use colored::Colorize;
use histmine_core::{Commit, Dispatch, MiningOptions, Order, RepositoryMiner};
use histmine_git::Git2Provider;
use histmine_parser::MethodAnalyzer;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::warn;

/// Repository locations and the filters applied while mining them.
#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    /// Local paths or remote URLs, mined in order
    #[arg(required = true)]
    pub locations: Vec<String>,

    /// Only commits after this date (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub since: Option<DateTime<FixedOffset>>,

    /// Like --since, but applied as a filter while walking the whole history
    #[arg(long, value_parser = parse_date)]
    pub since_as_filter: Option<DateTime<FixedOffset>>,

    /// Only commits before this date
    #[arg(long, value_parser = parse_date)]
    pub to: Option<DateTime<FixedOffset>>,

    /// Start from this commit
    #[arg(long)]
    pub from_commit: Option<String>,

    /// Stop at this commit
    #[arg(long)]
    pub to_commit: Option<String>,

    /// Start from this tag
    #[arg(long)]
    pub from_tag: Option<String>,

    /// Stop at this tag
    #[arg(long)]
    pub to_tag: Option<String>,

    /// Mine only this commit
    #[arg(long)]
    pub single: Option<String>,

    /// Only commits reachable from this branch
    #[arg(long)]
    pub branch: Option<String>,

    /// Only commits touching files with this extension (repeatable)
    #[arg(long = "file-type")]
    pub file_types: Vec<String>,

    /// Only commits by this author name (repeatable)
    #[arg(long = "author")]
    pub authors: Vec<String>,

    /// Only these commit hashes (repeatable)
    #[arg(long = "only-commit")]
    pub only_commits: Vec<String>,

    /// Skip merge commits
    #[arg(long)]
    pub no_merges: bool,

    /// Only commits pointed to by a tag
    #[arg(long)]
    pub only_releases: bool,

    /// Only commits that touched this path
    #[arg(long)]
    pub filepath: Option<String>,

    /// Accepted for compatibility; --filepath always reports the history of deleted paths
    #[arg(long)]
    pub include_deleted_files: bool,

    /// Use the histogram diff algorithm
    #[arg(long)]
    pub histogram_diff: bool,

    /// Ignore whitespace changes in diffs
    #[arg(long)]
    pub skip_whitespaces: bool,

    /// Clone remote repositories here instead of a temporary directory
    #[arg(long)]
    pub clone_to: Option<PathBuf>,

    /// default, reverse, topo-order or date-order
    #[arg(long, default_value = "default")]
    pub order: Order,

    /// Worker threads building commit records; above 1 the output order is unspecified
    #[arg(short, long, default_value = "1")]
    pub workers: usize,
}

impl FilterArgs {
    pub fn to_options(&self) -> Result<MiningOptions> {
        let mut options = MiningOptions::new()
            .with_only_no_merge(self.no_merges)
            .with_only_releases(self.only_releases)
            .with_include_deleted_files(self.include_deleted_files)
            .with_histogram_diff(self.histogram_diff)
            .with_skip_whitespaces(self.skip_whitespaces)
            .with_order(self.order)
            .with_dispatch(Dispatch::from_workers(self.workers)?);

        options.single = self.single.clone();
        options.since = self.since;
        options.since_as_filter = self.since_as_filter;
        options.to = self.to;
        options.from_commit = self.from_commit.clone();
        options.to_commit = self.to_commit.clone();
        options.from_tag = self.from_tag.clone();
        options.to_tag = self.to_tag.clone();
        options.only_in_branch = self.branch.clone();
        options.filepath = self.filepath.clone();
        options.clone_repo_to = self.clone_to.clone();

        if !self.file_types.is_empty() {
            options = options.with_file_types(self.file_types.iter().cloned());
        }
        if !self.authors.is_empty() {
            options = options.with_authors(self.authors.iter().cloned());
        }
        if !self.only_commits.is_empty() {
            options = options.with_commits(self.only_commits.iter().cloned());
        }

        Ok(options)
    }

    pub fn miner(&self) -> Result<RepositoryMiner> {
        let miner = RepositoryMiner::new(
            self.locations.iter().cloned(),
            self.to_options()?,
            Arc::new(Git2Provider::new()),
            Arc::new(MethodAnalyzer::new()),
        )?;
        Ok(miner)
    }
}

/// Accepts RFC 3339 timestamps or plain dates, read as midnight UTC.
pub fn parse_date(value: &str) -> Result<DateTime<FixedOffset>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Ok(date);
    }
    let day = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{value}', expected RFC 3339 or YYYY-MM-DD"))?;
    let midnight = day
        .and_hms_opt(0, 0, 0)
        .with_context(|| format!("Invalid date '{value}'"))?;
    Ok(midnight.and_utc().fixed_offset())
}

/// Mine on a blocking thread, handing each commit's row to `emit` as it arrives.
///
/// Ctrl-C stops the traversal; rows already emitted stay printed. Returns the
/// number of rows emitted.
pub async fn mine<T, F, E>(args: &FilterArgs, row: F, mut emit: E) -> Result<usize>
where
    T: Send + 'static,
    F: Fn(&Commit) -> Result<T> + Send + 'static,
    E: FnMut(T),
{
    let miner = args.miner()?;
    let (tx, mut rx) = mpsc::channel::<T>(64);

    let producer = tokio::task::spawn_blocking(move || -> Result<()> {
        for commit in miner.traverse_commits() {
            let commit = commit?;
            match row(&commit) {
                Ok(value) => {
                    if tx.blocking_send(value).is_err() {
                        break;
                    }
                }
                Err(e) => warn!(commit = %commit.hash(), "Skipping commit: {}", e),
            }
        }
        Ok(())
    });

    let (count, interrupted) = drain(&mut rx, signal::ctrl_c(), &mut emit).await;
    drop(rx);

    if interrupted {
        eprintln!("{} Interrupted after {} commit(s)", "⚠".yellow(), count);
    }
    producer.await??;
    Ok(count)
}

/// Hand received rows to `emit` until the channel closes or `shutdown` resolves.
///
/// `shutdown` is polled first and as one future across the whole loop, so a
/// signal that lands while `emit` runs ends the loop on the next turn. Returns the number of rows
/// emitted and whether `shutdown` ended the loop.
async fn drain<T, S, E>(rx: &mut mpsc::Receiver<T>, shutdown: S, emit: &mut E) -> (usize, bool)
where
    S: Future,
    E: FnMut(T),
{
    tokio::pin!(shutdown);
    let mut count = 0;
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => return (count, true),
            value = rx.recv() => match value {
                Some(value) => {
                    emit(value);
                    count += 1;
                }
                None => return (count, false),
            },
        }
    }
}
