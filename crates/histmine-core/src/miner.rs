//! Commit traversal over one or more repositories.
//!
//! [`RepositoryMiner::traverse_commits`] returns a lazy [`CommitStream`].
//! Repositories are mined one at a time: each is resolved to a local working
//! copy, its options are resolved against the live backend, and its
//! revision walk feeds commit construction. Every resource of a repository
//! (worker pool, backend handle, temporary clone) is released before the next
//! repository is opened, or when the stream is dropped.
//!
//! With [`Dispatch::Sequential`] commits come out in walk order. With
//! [`Dispatch::Pooled`] records are built concurrently and yielded as they
//! complete, so their order is unspecified.

use crate::analysis::SourceAnalyzer;
use crate::backend::{BackendProvider, DiffOptions, GitBackend, ObjectId, Revision};
use crate::commit::Commit;
use crate::context::RepoContext;
use crate::error::{Error, Result};
use crate::filter::{Dispatch, FilterResolver, MiningFilter, MiningOptions};
use crate::location::{is_remote, repo_name_from_url, validate_clone_dir, Checkout};
use crate::pool::WorkerPool;
use crate::walk::RevisionWalk;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Entry point: repository locations plus mining options.
pub struct RepositoryMiner {
    locations: Vec<String>,
    options: MiningOptions,
    provider: Arc<dyn BackendProvider>,
    analyzer: Arc<dyn SourceAnalyzer>,
}

impl RepositoryMiner {
    /// Validate the configuration; nothing is opened or cloned yet.
    pub fn new<I, S>(
        locations: I,
        options: MiningOptions,
        provider: Arc<dyn BackendProvider>,
        analyzer: Arc<dyn SourceAnalyzer>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let locations: Vec<String> = locations.into_iter().map(Into::into).collect();
        if locations.is_empty() {
            return Err(Error::Config("No repository location given".into()));
        }
        options.validate()?;

        for location in locations.iter().filter(|l| is_remote(l)) {
            repo_name_from_url(location)?;
        }
        if let Some(dir) = &options.clone_repo_to {
            validate_clone_dir(dir)?;
        }

        Ok(Self {
            locations,
            options,
            provider,
            analyzer,
        })
    }

    pub fn options(&self) -> &MiningOptions {
        &self.options
    }

    /// Walk every repository from scratch.
    pub fn traverse_commits(&self) -> CommitStream {
        CommitStream {
            shared: Arc::new(Shared {
                options: self.options.clone(),
                provider: Arc::clone(&self.provider),
                analyzer: Arc::clone(&self.analyzer),
            }),
            pending: self.locations.iter().cloned().collect(),
            current: None,
            finished: false,
        }
    }
}

struct Shared {
    options: MiningOptions,
    provider: Arc<dyn BackendProvider>,
    analyzer: Arc<dyn SourceAnalyzer>,
}

/// Lazy, finite stream of commits.
///
/// A resolution or backend error while opening a repository is yielded once
/// and ends the stream. Failures building a single commit are logged and the
/// commit is skipped.
pub struct CommitStream {
    shared: Arc<Shared>,
    pending: VecDeque<String>,
    current: Option<RepoTraversal>,
    finished: bool,
}

impl Iterator for CommitStream {
    type Item = Result<Commit>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            if self.current.is_none() {
                let Some(location) = self.pending.pop_front() else {
                    self.finished = true;
                    return None;
                };
                match RepoTraversal::start(&self.shared, &location) {
                    Ok(traversal) => self.current = Some(traversal),
                    Err(e) => {
                        self.finished = true;
                        return Some(Err(e));
                    }
                }
            }

            if let Some(traversal) = self.current.as_mut() {
                if let Some(commit) = traversal.next_commit() {
                    return Some(Ok(commit));
                }
            }
            // Exhausted: release this repository before opening the next.
            self.current = None;
        }
    }
}

/// Post-walk filters that need the built commit or precomputed sets.
struct PostFilter {
    file_types: Option<Vec<String>>,
    commits: Option<HashSet<String>>,
    path_commits: Option<HashSet<ObjectId>>,
    tagged_commits: Option<HashSet<ObjectId>>,
}

impl PostFilter {
    /// Reason the commit is dropped, if any.
    fn rejects(&self, commit: &Commit) -> Option<&'static str> {
        if let Some(types) = &self.file_types {
            let matches = match commit.modified_files() {
                Ok(files) => files
                    .iter()
                    .any(|f| types.iter().any(|t| f.filename().ends_with(t.as_str()))),
                Err(e) => {
                    warn!(commit = %commit.hash(), "Could not list modified files: {}", e);
                    false
                }
            };
            if !matches {
                return Some("no modification with a requested file type");
            }
        }
        if self
            .commits
            .as_ref()
            .is_some_and(|set| !set.contains(commit.hash()))
        {
            return Some("not in the commit allow-list");
        }
        if self
            .path_commits
            .as_ref()
            .is_some_and(|set| !set.contains(commit.hash()))
        {
            return Some("does not touch the requested path");
        }
        if self
            .tagged_commits
            .as_ref()
            .is_some_and(|set| !set.contains(commit.hash()))
        {
            return Some("not a tagged release");
        }
        None
    }
}

/// Build one commit record and run the post-walk filters on it.
fn build_commit(
    revision: Revision,
    context: &Arc<RepoContext>,
    filter: &PostFilter,
) -> Option<Commit> {
    let commit = Commit::new(revision, Arc::clone(context));
    if let Some(reason) = filter.rejects(&commit) {
        debug!(commit = %commit.hash(), reason, "Commit filtered out");
        return None;
    }
    info!(
        "Commit #{} in {} from {}",
        commit.hash(),
        commit.committer_date(),
        commit.author().name
    );
    Some(commit)
}

enum Dispatcher {
    Sequential,
    Pooled(WorkerPool<Option<Commit>>),
}

/// Traversal state of one repository.
///
/// Fields drop in declaration order: the pool first, the temporary clone last.
struct RepoTraversal {
    dispatcher: Dispatcher,
    walk: RevisionWalk,
    walk_done: bool,
    filter: Arc<PostFilter>,
    context: Arc<RepoContext>,
    started: Instant,
    yielded: usize,
    checkout: Checkout,
}

impl RepoTraversal {
    fn start(shared: &Shared, location: &str) -> Result<Self> {
        let options = &shared.options;
        let checkout = Checkout::prepare(
            location,
            options.clone_repo_to.as_deref(),
            shared.provider.as_ref(),
        )?;
        let backend = shared.provider.open(checkout.path())?;
        let filter = FilterResolver::new(backend.as_ref()).resolve(options)?;
        let post_filter = post_filter(&filter, backend.as_ref())?;

        let context = Arc::new(
            RepoContext::new(
                Arc::clone(&backend),
                Arc::clone(&shared.analyzer),
                checkout.path(),
            )
            .with_diff_options(DiffOptions {
                histogram: options.histogram_diff,
                ignore_whitespace: options.skip_whitespaces,
            })
            .with_main_branch(backend.main_branch()?),
        );

        let walk = RevisionWalk::new(backend, &filter.walk, filter.predicates.clone())?;
        let dispatcher = match options.dispatch {
            Dispatch::Sequential => Dispatcher::Sequential,
            Dispatch::Pooled(workers) => Dispatcher::Pooled(WorkerPool::new(workers.get())?),
        };
        info!(
            location,
            path = %checkout.path().display(),
            workers = options.dispatch.workers(),
            "Mining repository"
        );

        Ok(Self {
            dispatcher,
            walk,
            walk_done: false,
            filter: Arc::new(post_filter),
            context,
            started: Instant::now(),
            yielded: 0,
            checkout,
        })
    }

    /// Next revision of the walk; revisions that fail to load are skipped.
    fn next_revision(&mut self) -> Option<Revision> {
        if self.walk_done {
            return None;
        }
        loop {
            match self.walk.next() {
                Some(Ok(revision)) => return Some(revision),
                Some(Err(e)) => warn!("Skipping revision: {}", e),
                None => {
                    self.walk_done = true;
                    return None;
                }
            }
        }
    }

    fn next_commit(&mut self) -> Option<Commit> {
        let commit = match &self.dispatcher {
            Dispatcher::Sequential => self.next_sequential(),
            Dispatcher::Pooled(_) => self.next_pooled(),
        };
        if commit.is_some() {
            self.yielded += 1;
        }
        commit
    }

    fn next_sequential(&mut self) -> Option<Commit> {
        while let Some(revision) = self.next_revision() {
            if let Some(commit) = build_commit(revision, &self.context, &self.filter) {
                return Some(commit);
            }
        }
        None
    }

    fn next_pooled(&mut self) -> Option<Commit> {
        loop {
            while self.pool_has_capacity() {
                let Some(revision) = self.next_revision() else {
                    break;
                };
                let context = Arc::clone(&self.context);
                let filter = Arc::clone(&self.filter);
                if let Dispatcher::Pooled(pool) = &mut self.dispatcher {
                    pool.submit(move || Ok(build_commit(revision, &context, &filter)));
                }
            }

            let Dispatcher::Pooled(pool) = &mut self.dispatcher else {
                return None;
            };
            match pool.next_completed()? {
                Ok(Some(commit)) => return Some(commit),
                Ok(None) => {}
                Err(e) => warn!("Could not build commit: {}", e),
            }
        }
    }

    fn pool_has_capacity(&self) -> bool {
        match &self.dispatcher {
            Dispatcher::Pooled(pool) => pool.has_capacity(),
            Dispatcher::Sequential => false,
        }
    }
}

impl Drop for RepoTraversal {
    fn drop(&mut self) {
        info!(
            path = %self.checkout.path().display(),
            commits = self.yielded,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "Finished repository"
        );
    }
}

fn post_filter(filter: &MiningFilter, backend: &dyn GitBackend) -> Result<PostFilter> {
    let path_commits = match &filter.filepath {
        Some(path) => {
            let history = backend.path_history(path, &filter.head)?;
            debug!(path, commits = history.len(), "Resolved path history");
            Some(history.into_iter().collect())
        }
        None => None,
    };
    let tagged_commits = if filter.only_releases {
        Some(
            backend
                .list_tags()?
                .into_iter()
                .map(|tag| tag.commit)
                .collect(),
        )
    } else {
        None
    };

    Ok(PostFilter {
        file_types: filter.file_types.clone(),
        commits: filter.only_commits.clone(),
        path_commits,
        tagged_commits,
    })
}
