//! Mining options and their resolution into a canonical filter.
//!
//! [`MiningOptions`] is what callers fill in. [`FilterResolver::resolve`]
//! validates it, resolves tags and commits against a live backend and
//! produces a [`MiningFilter`]: commit ranges in chronological order, dates
//! in UTC and the arguments of the revision walk.

use crate::backend::{GitBackend, ObjectId, Revision, SortMode, WalkRequest};
use crate::error::{Error, Result};
use chrono::{DateTime, FixedOffset, Utc};
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, warn};

/// Order in which commits are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Oldest first.
    #[default]
    Default,
    /// Newest first.
    Reverse,
    /// Children before parents.
    TopoOrder,
    /// Newest committer date first.
    DateOrder,
}

impl Order {
    pub fn sort_mode(&self) -> SortMode {
        match self {
            Order::Default => SortMode::Reverse,
            Order::Reverse => SortMode::Insertion,
            Order::TopoOrder => SortMode::Topological,
            Order::DateOrder => SortMode::CommitTimeDesc,
        }
    }
}

impl FromStr for Order {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "default" => Ok(Order::Default),
            "reverse" => Ok(Order::Reverse),
            "topo-order" => Ok(Order::TopoOrder),
            "date-order" => Ok(Order::DateOrder),
            other => Err(Error::Config(format!(
                "Unknown order '{other}', expected one of default, reverse, topo-order, date-order"
            ))),
        }
    }
}

/// How commit records are built.
///
/// `Sequential` preserves walk order exactly. `Pooled` builds records on a
/// worker pool and yields them as they complete, in no particular order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dispatch {
    #[default]
    Sequential,
    Pooled(NonZeroUsize),
}

impl Dispatch {
    /// One worker is sequential, more is pooled.
    pub fn from_workers(workers: usize) -> Result<Self> {
        match workers {
            0 => Err(Error::Config("The number of workers must be at least 1".into())),
            1 => Ok(Dispatch::Sequential),
            n => Ok(NonZeroUsize::new(n)
                .map(Dispatch::Pooled)
                .unwrap_or(Dispatch::Sequential)),
        }
    }

    pub fn workers(&self) -> usize {
        match self {
            Dispatch::Sequential => 1,
            Dispatch::Pooled(n) => n.get(),
        }
    }
}

/// User-facing mining options.
#[derive(Debug, Clone, Default)]
pub struct MiningOptions {
    pub single: Option<String>,
    pub since: Option<DateTime<FixedOffset>>,
    pub since_as_filter: Option<DateTime<FixedOffset>>,
    pub to: Option<DateTime<FixedOffset>>,
    pub from_commit: Option<String>,
    pub to_commit: Option<String>,
    pub from_tag: Option<String>,
    pub to_tag: Option<String>,
    /// Reserved.
    pub include_refs: bool,
    /// Reserved.
    pub include_remotes: bool,
    pub only_in_branch: Option<String>,
    pub only_modifications_with_file_types: Option<Vec<String>>,
    pub only_no_merge: bool,
    pub only_authors: Option<Vec<String>>,
    pub only_commits: Option<Vec<String>>,
    pub only_releases: bool,
    pub filepath: Option<String>,
    /// Accepted for compatibility. Path history always follows renames and
    /// reports paths deleted before the head.
    pub include_deleted_files: bool,
    pub histogram_diff: bool,
    pub skip_whitespaces: bool,
    pub clone_repo_to: Option<PathBuf>,
    pub order: Order,
    pub dispatch: Dispatch,
}

impl MiningOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_single(mut self, hash: impl Into<String>) -> Self {
        self.single = Some(hash.into());
        self
    }

    pub fn with_since(mut self, date: DateTime<FixedOffset>) -> Self {
        self.since = Some(date);
        self
    }

    pub fn with_since_as_filter(mut self, date: DateTime<FixedOffset>) -> Self {
        self.since_as_filter = Some(date);
        self
    }

    pub fn with_to(mut self, date: DateTime<FixedOffset>) -> Self {
        self.to = Some(date);
        self
    }

    pub fn with_from_commit(mut self, hash: impl Into<String>) -> Self {
        self.from_commit = Some(hash.into());
        self
    }

    pub fn with_to_commit(mut self, hash: impl Into<String>) -> Self {
        self.to_commit = Some(hash.into());
        self
    }

    pub fn with_from_tag(mut self, tag: impl Into<String>) -> Self {
        self.from_tag = Some(tag.into());
        self
    }

    pub fn with_to_tag(mut self, tag: impl Into<String>) -> Self {
        self.to_tag = Some(tag.into());
        self
    }

    pub fn with_only_in_branch(mut self, branch: impl Into<String>) -> Self {
        self.only_in_branch = Some(branch.into());
        self
    }

    pub fn with_file_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only_modifications_with_file_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_only_no_merge(mut self, only_no_merge: bool) -> Self {
        self.only_no_merge = only_no_merge;
        self
    }

    pub fn with_authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only_authors = Some(authors.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_commits<I, S>(mut self, commits: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only_commits = Some(commits.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_only_releases(mut self, only_releases: bool) -> Self {
        self.only_releases = only_releases;
        self
    }

    pub fn with_filepath(mut self, path: impl Into<String>) -> Self {
        self.filepath = Some(path.into());
        self
    }

    pub fn with_include_deleted_files(mut self, include: bool) -> Self {
        self.include_deleted_files = include;
        self
    }

    pub fn with_histogram_diff(mut self, histogram: bool) -> Self {
        self.histogram_diff = histogram;
        self
    }

    pub fn with_skip_whitespaces(mut self, skip: bool) -> Self {
        self.skip_whitespaces = skip;
        self
    }

    pub fn with_clone_repo_to(mut self, dir: impl Into<PathBuf>) -> Self {
        self.clone_repo_to = Some(dir.into());
        self
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// One worker (or zero) is sequential, more is pooled.
    pub fn with_num_workers(mut self, workers: usize) -> Self {
        self.dispatch = match NonZeroUsize::new(workers) {
            Some(n) if n.get() > 1 => Dispatch::Pooled(n),
            _ => Dispatch::Sequential,
        };
        self
    }

    /// Check option combinations that are invalid regardless of the repository.
    pub fn validate(&self) -> Result<()> {
        let from_criteria = [
            self.since.is_some(),
            self.since_as_filter.is_some(),
            self.from_tag.is_some(),
            self.from_commit.is_some(),
        ];
        if from_criteria.iter().filter(|set| **set).count() > 1 {
            return Err(Error::Config(
                "You can only specify one filter between since, since_as_filter, from_tag and from_commit"
                    .into(),
            ));
        }

        let to_criteria = [
            self.to.is_some(),
            self.to_tag.is_some(),
            self.to_commit.is_some(),
        ];
        if to_criteria.iter().filter(|set| **set).count() > 1 {
            return Err(Error::Config(
                "You can only specify one filter between to, to_tag and to_commit".into(),
            ));
        }

        if self.single.is_some()
            && (self.since.is_some() || self.since_as_filter.is_some() || self.to.is_some())
        {
            return Err(Error::Config(
                "You can not specify a single commit with date filters".into(),
            ));
        }

        if self.include_refs || self.include_remotes {
            warn!("include_refs and include_remotes are reserved and have no effect");
        }

        Ok(())
    }
}

/// Conjunctive predicates applied to every walked revision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkPredicates {
    pub max_count: Option<usize>,
    pub authors: Option<HashSet<String>>,
    /// Inclusive lower bound on the committer date.
    pub since: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the committer date.
    pub until: Option<DateTime<Utc>>,
    pub no_merges: bool,
    /// Keep only the commit itself and its descendants.
    pub ancestry_path: Option<ObjectId>,
}

impl WalkPredicates {
    /// Metadata checks; the ancestry restriction needs the backend and is applied by the walk.
    pub fn accepts(&self, revision: &Revision) -> bool {
        if self.no_merges && revision.is_merge() {
            return false;
        }
        if let Some(authors) = &self.authors {
            if !authors.contains(&revision.author.name) {
                return false;
            }
        }
        let committed = revision.committer.time.with_timezone(&Utc);
        if self.since.is_some_and(|since| committed < since) {
            return false;
        }
        if self.until.is_some_and(|until| committed > until) {
            return false;
        }
        true
    }
}

/// Canonical, validated query for one repository.
#[derive(Debug, Clone, Default)]
pub struct MiningFilter {
    pub single: Option<ObjectId>,
    /// Earlier end of the commit range.
    pub from_commit: Option<ObjectId>,
    /// Later end of the commit range.
    pub to_commit: Option<ObjectId>,
    pub since: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Commit the walk starts from when not in single mode.
    pub head: ObjectId,
    pub only_commits: Option<HashSet<String>>,
    pub file_types: Option<Vec<String>>,
    pub filepath: Option<String>,
    pub only_releases: bool,
    pub walk: WalkRequest,
    pub predicates: WalkPredicates,
}

/// Ancestry restriction for a from-commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestryRestriction {
    pub commit: ObjectId,
    /// Parents whose ancestry is excluded.
    pub hidden: Vec<ObjectId>,
}

impl AncestryRestriction {
    /// Root: just the commit. One parent: exclude its ancestry. Merge: exclude every parent's.
    pub fn for_revision(revision: &Revision) -> Self {
        let hidden = match revision.parents.as_slice() {
            [] => Vec::new(),
            [first] => vec![first.clone()],
            parents => parents.to_vec(),
        };
        Self {
            commit: revision.id.clone(),
            hidden,
        }
    }
}

/// Turns [`MiningOptions`] into a [`MiningFilter`] for one repository.
pub struct FilterResolver<'a> {
    backend: &'a dyn GitBackend,
}

impl<'a> FilterResolver<'a> {
    pub fn new(backend: &'a dyn GitBackend) -> Self {
        Self { backend }
    }

    /// Validate `options` and resolve them against the repository.
    pub fn resolve(&self, options: &MiningOptions) -> Result<MiningFilter> {
        options.validate()?;

        let mut from_commit = match (&options.from_tag, &options.from_commit) {
            (Some(tag), _) => Some(self.resolve_named("from_tag", tag)?),
            (None, Some(hash)) => Some(self.resolve_named("from_commit", hash)?),
            (None, None) => None,
        };
        let mut to_commit = match (&options.to_tag, &options.to_commit) {
            (Some(tag), _) => Some(self.resolve_named("to_tag", tag)?),
            (None, Some(hash)) => Some(self.resolve_named("to_commit", hash)?),
            (None, None) => None,
        };
        let mut single = match &options.single {
            Some(hash) => Some(self.resolve_named("single", hash)?),
            None => None,
        };

        if let (Some(from), Some(to)) = (&from_commit, &to_commit) {
            if from == to {
                warn!(
                    commit = %from,
                    "from and to point to the same commit, switching to single commit mode"
                );
                single = Some(from.clone());
                from_commit = None;
                to_commit = None;
            } else {
                let from_rev = self.backend.revision(from)?;
                let to_rev = self.backend.revision(to)?;
                if !is_commit_before(&from_rev, &to_rev) {
                    debug!(from = %from, to = %to, "Swapping reversed commit range");
                    std::mem::swap(&mut from_commit, &mut to_commit);
                }
            }
        }

        let head = match (&to_commit, &options.only_in_branch) {
            (Some(to), _) => to.clone(),
            (None, Some(branch)) => self.resolve_named("only_in_branch", branch)?,
            (None, None) => self.resolve_named("HEAD", "HEAD")?,
        };

        let since = options
            .since
            .or(options.since_as_filter)
            .map(|d| d.with_timezone(&Utc));
        let to = options.to.map(|d| d.with_timezone(&Utc));

        let mut predicates = WalkPredicates {
            authors: options
                .only_authors
                .as_ref()
                .map(|a| a.iter().cloned().collect()),
            since,
            until: to,
            no_merges: options.only_no_merge,
            ..Default::default()
        };

        let mut walk = WalkRequest {
            sort: options.order.sort_mode(),
            ..Default::default()
        };
        match (&single, &from_commit) {
            (Some(single), _) => {
                walk.starts = vec![single.clone()];
                walk.hidden = AncestryRestriction::for_revision(&self.backend.revision(single)?).hidden;
                predicates.max_count = Some(1);
            }
            (None, Some(from)) => {
                let restriction = AncestryRestriction::for_revision(&self.backend.revision(from)?);
                walk.starts = vec![head.clone()];
                walk.hidden = restriction.hidden;
                predicates.ancestry_path = Some(restriction.commit);
            }
            (None, None) => walk.starts = vec![head.clone()],
        }

        debug!(?walk, "Resolved revision walk");

        Ok(MiningFilter {
            single,
            from_commit,
            to_commit,
            since,
            to,
            head,
            only_commits: options
                .only_commits
                .as_ref()
                .map(|c| c.iter().cloned().collect()),
            file_types: options.only_modifications_with_file_types.clone(),
            filepath: options.filepath.clone(),
            only_releases: options.only_releases,
            walk,
            predicates,
        })
    }

    fn resolve_named(&self, filter: &'static str, value: &str) -> Result<ObjectId> {
        self.backend.resolve_ref(value).map_err(|e| match e {
            Error::NotFound(_) => Error::Resolution {
                filter,
                value: value.to_string(),
            },
            other => other,
        })
    }
}

/// Committer date first, author date as tiebreak.
pub fn is_commit_before(earlier: &Revision, later: &Revision) -> bool {
    let (a, b) = (&earlier.committer.time, &later.committer.time);
    if a != b {
        return a < b;
    }
    earlier.author.time < later.author.time
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{revision, MockBackend};
    use chrono::TimeZone;

    fn date(secs: i64) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(-5 * 3600)
            .unwrap()
            .timestamp_opt(secs, 0)
            .unwrap()
    }

    #[test]
    fn test_never_two_from_or_to_criteria() {
        for mask in 0u32..128 {
            let bit = |n: u32| mask & (1 << n) != 0;
            let mut options = MiningOptions::new();
            if bit(0) {
                options.since = Some(date(10));
            }
            if bit(1) {
                options.since_as_filter = Some(date(10));
            }
            if bit(2) {
                options.from_tag = Some("v1".into());
            }
            if bit(3) {
                options.from_commit = Some("c1".into());
            }
            if bit(4) {
                options.to = Some(date(20));
            }
            if bit(5) {
                options.to_tag = Some("v2".into());
            }
            if bit(6) {
                options.to_commit = Some("c2".into());
            }

            let froms = (0..4).filter(|n| bit(*n)).count();
            let tos = (4..7).filter(|n| bit(*n)).count();
            let result = options.validate();
            if froms > 1 || tos > 1 {
                assert!(
                    matches!(result, Err(Error::Config(_))),
                    "mask {mask:07b} should be rejected"
                );
            } else {
                assert!(result.is_ok(), "mask {mask:07b} should be accepted");
            }
        }
    }

    #[test]
    fn test_single_with_dates_rejected() {
        let options = MiningOptions::new().with_single("c1").with_to(date(5));
        assert!(matches!(options.validate(), Err(Error::Config(_))));
        let options = MiningOptions::new().with_single("c1").with_since(date(5));
        assert!(matches!(options.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_from_equals_to_collapses_to_single() {
        let backend = MockBackend::linear(5);
        backend.put_tag("v3", "c3");
        let options = MiningOptions::new()
            .with_from_commit("c3")
            .with_to_tag("v3");
        let filter = FilterResolver::new(&backend).resolve(&options).unwrap();
        assert_eq!(filter.single.as_deref(), Some("c3"));
        assert_eq!(filter.from_commit, None);
        assert_eq!(filter.to_commit, None);
        assert_eq!(filter.walk.starts, vec!["c3".to_string()]);
        assert_eq!(filter.walk.hidden, vec!["c2".to_string()]);
        assert_eq!(filter.predicates.max_count, Some(1));
    }

    #[test]
    fn test_reversed_range_is_swapped() {
        let backend = MockBackend::linear(5);
        let options = MiningOptions::new()
            .with_from_commit("c4")
            .with_to_commit("c2");
        let filter = FilterResolver::new(&backend).resolve(&options).unwrap();
        assert_eq!(filter.from_commit.as_deref(), Some("c2"));
        assert_eq!(filter.to_commit.as_deref(), Some("c4"));
        assert_eq!(filter.head, "c4");
        assert_eq!(filter.walk.hidden, vec!["c1".to_string()]);
        assert_eq!(filter.predicates.ancestry_path.as_deref(), Some("c2"));
    }

    #[test]
    fn test_unknown_tag_names_filter() {
        let backend = MockBackend::linear(2);
        let options = MiningOptions::new().with_from_tag("v9");
        let err = FilterResolver::new(&backend).resolve(&options).unwrap_err();
        match err {
            Error::Resolution { filter, value } => {
                assert_eq!(filter, "from_tag");
                assert_eq!(value, "v9");
            }
            other => panic!("unexpected error {other:?}"),
        }

        let options = MiningOptions::new().with_single("nope");
        let err = FilterResolver::new(&backend).resolve(&options).unwrap_err();
        assert!(err.to_string().contains("single 'nope'"));
    }

    #[test]
    fn test_dates_normalised_to_utc() {
        let backend = MockBackend::linear(2);
        let since = date(1_000);
        let options = MiningOptions::new().with_since(since);
        let filter = FilterResolver::new(&backend).resolve(&options).unwrap();
        let normalised = filter.since.unwrap();
        assert_eq!(normalised.timestamp(), since.timestamp());
        assert_eq!(normalised.offset(), &Utc);
        assert_eq!(filter.predicates.since, Some(normalised));
    }

    #[test]
    fn test_ancestry_restriction_shapes() {
        let root = revision("r", &[], 1);
        assert!(AncestryRestriction::for_revision(&root).hidden.is_empty());

        let child = revision("c", &["r"], 2);
        assert_eq!(AncestryRestriction::for_revision(&child).hidden, vec!["r"]);

        let merge = revision("m", &["a", "b"], 3);
        assert_eq!(AncestryRestriction::for_revision(&merge).hidden, vec!["a", "b"]);
    }

    #[test]
    fn test_predicates() {
        let rev = revision("c", &["p"], 2_000);
        let mut predicates = WalkPredicates::default();
        assert!(predicates.accepts(&rev));

        predicates.authors = Some(["Bob".to_string()].into_iter().collect());
        assert!(!predicates.accepts(&rev));
        predicates.authors = Some(["Alice".to_string()].into_iter().collect());
        assert!(predicates.accepts(&rev));

        predicates.since = Utc.timestamp_opt(2_001, 0).single();
        assert!(!predicates.accepts(&rev));
        predicates.since = Utc.timestamp_opt(2_000, 0).single();
        predicates.until = Utc.timestamp_opt(2_000, 0).single();
        assert!(predicates.accepts(&rev));

        predicates.no_merges = true;
        assert!(!predicates.accepts(&revision("m", &["a", "b"], 2_000)));
    }

    #[test]
    fn test_order_parsing() {
        assert_eq!("topo-order".parse::<Order>().unwrap(), Order::TopoOrder);
        assert_eq!("reverse".parse::<Order>().unwrap().sort_mode(), SortMode::Insertion);
        assert!("sideways".parse::<Order>().is_err());
        assert_eq!(Dispatch::from_workers(1).unwrap(), Dispatch::Sequential);
        assert_eq!(Dispatch::from_workers(4).unwrap().workers(), 4);
        assert!(Dispatch::from_workers(0).is_err());
    }
}
