//! Test utilities for histmine.
//!
//! Provides an in-memory backend, a provider around it and a line-based
//! analyzer for Python-like sources.

use crate::analysis::{FileAnalysis, SourceAnalyzer};
use crate::backend::{
    BackendProvider, BlameLine, ChangeEntry, DiffOptions, GitBackend, ObjectId, Revision,
    Signature, SortMode, Tag, WalkRequest,
};
use crate::context::RepoContext;
use crate::error::{Error, Result};
use crate::method::Method;
use chrono::{FixedOffset, TimeZone};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Build a revision authored and committed by Alice at `secs` (UTC+1).
pub fn revision(id: &str, parents: &[&str], secs: i64) -> Revision {
    let offset = FixedOffset::east_opt(3600).unwrap();
    let signature = Signature {
        name: "Alice".to_string(),
        email: "alice@example.com".to_string(),
        time: offset.timestamp_opt(secs, 0).unwrap(),
    };
    Revision {
        id: id.to_string(),
        parents: parents.iter().map(|p| p.to_string()).collect(),
        author: signature.clone(),
        committer: signature,
        message: format!("commit {id}\n"),
    }
}

/// Repository context over a mock backend.
pub fn repo_context(backend: MockBackend, analyzer: StubAnalyzer) -> RepoContext {
    RepoContext::new(Arc::new(backend), Arc::new(analyzer), "/repos/project")
}

pub fn context_with(backend: MockBackend, analyzer: StubAnalyzer) -> Arc<RepoContext> {
    Arc::new(repo_context(backend, analyzer))
}

/// Counts calls to the expensive backend operations.
#[derive(Debug, Default)]
pub struct CallCounters {
    tree_diff: AtomicUsize,
    file_bytes: AtomicUsize,
    blame: AtomicUsize,
    walk: AtomicUsize,
}

impl CallCounters {
    pub fn tree_diff(&self) -> usize {
        self.tree_diff.load(Ordering::SeqCst)
    }

    pub fn file_bytes(&self) -> usize {
        self.file_bytes.load(Ordering::SeqCst)
    }

    pub fn blame(&self) -> usize {
        self.blame.load(Ordering::SeqCst)
    }

    pub fn walk(&self) -> usize {
        self.walk.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct State {
    /// Insertion order is chronological order.
    revisions: Vec<Revision>,
    refs: HashMap<String, ObjectId>,
    diffs: HashMap<ObjectId, Vec<ChangeEntry>>,
    files: HashMap<(ObjectId, String), Vec<u8>>,
    blames: HashMap<(ObjectId, String), Vec<BlameLine>>,
    tags: Vec<Tag>,
    branches: HashMap<ObjectId, Vec<String>>,
    path_history: HashMap<String, Vec<ObjectId>>,
    main_branch: Option<String>,
}

/// In-memory [`GitBackend`].
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<State>,
    counters: Arc<CallCounters>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Linear history `c1 <- c2 <- ... <- cN` with HEAD at `cN`.
    pub fn linear(count: usize) -> Self {
        let backend = Self::new();
        for i in 1..=count {
            let id = format!("c{i}");
            let parent = format!("c{}", i - 1);
            let parents: Vec<&str> = if i == 1 { vec![] } else { vec![parent.as_str()] };
            backend.add_revision(revision(&id, &parents, 1_000 * i as i64));
        }
        backend.put_ref("HEAD", &format!("c{count}"));
        backend
    }

    pub fn counters(&self) -> Arc<CallCounters> {
        Arc::clone(&self.counters)
    }

    pub fn add_revision(&self, revision: Revision) {
        self.state.lock().unwrap().revisions.push(revision);
    }

    pub fn put_ref(&self, name: &str, id: &str) {
        self.state
            .lock()
            .unwrap()
            .refs
            .insert(name.to_string(), id.to_string());
    }

    pub fn put_diff(&self, commit: &str, entries: Vec<ChangeEntry>) {
        self.state
            .lock()
            .unwrap()
            .diffs
            .insert(commit.to_string(), entries);
    }

    pub fn put_file(&self, commit: &str, path: &str, content: &str) {
        self.state
            .lock()
            .unwrap()
            .files
            .insert((commit.to_string(), path.to_string()), content.as_bytes().to_vec());
    }

    /// Blame of `path` as of `commit`, one origin per line.
    pub fn put_blame(&self, commit: &str, path: &str, origins: &[&str]) {
        let lines = origins
            .iter()
            .map(|origin| BlameLine {
                origin: origin.to_string(),
                unblamable: false,
            })
            .collect();
        self.put_blame_lines(commit, path, lines);
    }

    pub fn put_blame_lines(&self, commit: &str, path: &str, lines: Vec<BlameLine>) {
        self.state
            .lock()
            .unwrap()
            .blames
            .insert((commit.to_string(), path.to_string()), lines);
    }

    pub fn put_tag(&self, name: &str, commit: &str) {
        self.state.lock().unwrap().tags.push(Tag {
            name: name.to_string(),
            commit: commit.to_string(),
        });
        self.put_ref(name, commit);
    }

    pub fn put_branches(&self, commit: &str, branches: &[&str]) {
        self.state.lock().unwrap().branches.insert(
            commit.to_string(),
            branches.iter().map(|b| b.to_string()).collect(),
        );
    }

    pub fn put_path_history(&self, path: &str, commits: &[&str]) {
        self.state.lock().unwrap().path_history.insert(
            path.to_string(),
            commits.iter().map(|c| c.to_string()).collect(),
        );
    }

    pub fn set_main_branch(&self, name: &str) {
        self.state.lock().unwrap().main_branch = Some(name.to_string());
    }

    fn ancestors(state: &State, starts: &[ObjectId]) -> HashSet<ObjectId> {
        let mut seen = HashSet::new();
        let mut stack: Vec<ObjectId> = starts.to_vec();
        while let Some(id) = stack.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            if let Some(rev) = state.revisions.iter().find(|r| r.id == id) {
                stack.extend(rev.parents.iter().cloned());
            }
        }
        seen
    }
}

impl GitBackend for MockBackend {
    fn resolve_ref(&self, name: &str) -> Result<ObjectId> {
        let state = self.state.lock().unwrap();
        if let Some(id) = state.refs.get(name) {
            return Ok(id.clone());
        }
        state
            .revisions
            .iter()
            .find(|r| r.id == name)
            .map(|r| r.id.clone())
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    fn revision(&self, id: &str) -> Result<Revision> {
        let state = self.state.lock().unwrap();
        state
            .revisions
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    fn walk(&self, request: &WalkRequest) -> Result<Vec<ObjectId>> {
        self.counters.walk.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        let reachable = Self::ancestors(&state, &request.starts);
        let hidden = Self::ancestors(&state, &request.hidden);
        let mut ids: Vec<ObjectId> = state
            .revisions
            .iter()
            .filter(|r| reachable.contains(&r.id) && !hidden.contains(&r.id))
            .map(|r| r.id.clone())
            .collect();
        if request.sort != SortMode::Reverse {
            ids.reverse();
        }
        Ok(ids)
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        let state = self.state.lock().unwrap();
        let parents = state
            .revisions
            .iter()
            .find(|r| r.id == descendant)
            .map(|r| r.parents.clone())
            .unwrap_or_default();
        Ok(Self::ancestors(&state, &parents).contains(ancestor))
    }

    fn tree_diff(
        &self,
        _old: Option<&str>,
        new: &str,
        _options: &DiffOptions,
    ) -> Result<Vec<ChangeEntry>> {
        self.counters.tree_diff.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        Ok(state.diffs.get(new).cloned().unwrap_or_default())
    }

    fn file_bytes(&self, commit: &str, path: &str) -> Result<Option<Vec<u8>>> {
        self.counters.file_bytes.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        Ok(state
            .files
            .get(&(commit.to_string(), path.to_string()))
            .cloned())
    }

    fn blame(&self, commit: &str, path: &str) -> Result<Vec<BlameLine>> {
        self.counters.blame.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        state
            .blames
            .get(&(commit.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("{path} at {commit}")))
    }

    fn path_history(&self, path: &str, _head: &str) -> Result<Vec<ObjectId>> {
        let state = self.state.lock().unwrap();
        Ok(state.path_history.get(path).cloned().unwrap_or_default())
    }

    fn list_tags(&self) -> Result<Vec<Tag>> {
        Ok(self.state.lock().unwrap().tags.clone())
    }

    fn branches_containing(&self, id: &str) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        Ok(state.branches.get(id).cloned().unwrap_or_default())
    }

    fn main_branch(&self) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().main_branch.clone())
    }
}

/// Hands out one shared [`MockBackend`] and records clones.
pub struct MockProvider {
    backend: Arc<MockBackend>,
    opened: Mutex<Vec<PathBuf>>,
    cloned: Mutex<Vec<(String, PathBuf)>>,
}

impl MockProvider {
    pub fn new(backend: MockBackend) -> Self {
        Self {
            backend: Arc::new(backend),
            opened: Mutex::new(Vec::new()),
            cloned: Mutex::new(Vec::new()),
        }
    }

    pub fn backend(&self) -> &MockBackend {
        &self.backend
    }

    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.lock().unwrap().clone()
    }

    pub fn cloned(&self) -> Vec<(String, PathBuf)> {
        self.cloned.lock().unwrap().clone()
    }
}

impl BackendProvider for MockProvider {
    fn open(&self, path: &Path) -> Result<Arc<dyn GitBackend>> {
        self.opened.lock().unwrap().push(path.to_path_buf());
        let backend: Arc<dyn GitBackend> = self.backend.clone();
        Ok(backend)
    }

    fn clone_repository(&self, url: &str, dest: &Path) -> Result<()> {
        std::fs::create_dir_all(dest)?;
        std::fs::write(dest.join("HEAD"), "ref: refs/heads/main\n")?;
        self.cloned
            .lock()
            .unwrap()
            .push((url.to_string(), dest.to_path_buf()));
        Ok(())
    }
}

/// Line-based analyzer: every `def name(params):` line starts a method that
/// runs until the next one, trailing blank lines excluded.
pub struct StubAnalyzer {
    extension: &'static str,
}

impl StubAnalyzer {
    pub fn python() -> Self {
        Self { extension: ".py" }
    }
}

impl SourceAnalyzer for StubAnalyzer {
    fn supports(&self, filename: &str) -> bool {
        filename.ends_with(self.extension)
    }

    fn analyze(&self, filename: &str, source: &str) -> Result<FileAnalysis> {
        let lines: Vec<&str> = source.lines().collect();
        let starts: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.starts_with("def "))
            .map(|(i, _)| i)
            .collect();

        let mut methods = Vec::new();
        for (k, &start) in starts.iter().enumerate() {
            let mut end = starts.get(k + 1).map(|n| n - 1).unwrap_or(lines.len() - 1);
            while end > start && lines[end].trim().is_empty() {
                end -= 1;
            }
            let header = lines[start];
            let name = header[4..].split('(').next().unwrap_or("").trim();
            let parameters: Vec<String> = header
                .split_once('(')
                .and_then(|(_, rest)| rest.split_once(')'))
                .map(|(params, _)| {
                    params
                        .split(',')
                        .map(str::trim)
                        .filter(|p| !p.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default();
            let body = &lines[start..=end];
            let nloc = body.iter().filter(|l| !l.trim().is_empty()).count();
            let complexity = 1 + body
                .iter()
                .filter(|l| l.trim_start().starts_with("if "))
                .count();

            let mut method = Method::new(name, parameters)
                .with_line_range(start + 1, end + 1)
                .with_metrics(nloc, complexity);
            method.filename = filename.to_string();
            methods.push(method);
        }

        Ok(FileAnalysis {
            nloc: lines.iter().filter(|l| !l.trim().is_empty()).count(),
            complexity: methods.iter().map(|m| m.complexity).sum(),
            token_count: source.split_whitespace().count(),
            methods,
        })
    }
}
