//! Builds small repositories with fixed signatures and timestamps.

#![allow(dead_code)]

use git2::{Oid, Repository, RepositoryInitOptions, Signature, Time};
use histmine_core::{MiningOptions, RepositoryMiner};
use histmine_git::Git2Provider;
use histmine_parser::MethodAnalyzer;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

pub const BASE_TIME: i64 = 1_600_000_000;

pub struct Fixture {
    pub dir: TempDir,
    pub repo: Repository,
    tick: i64,
}

impl Fixture {
    /// Empty repository whose HEAD points at `main`.
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(dir.path(), &opts).unwrap();
        Self { dir, repo, tick: 0 }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn location(&self) -> String {
        self.path().to_string_lossy().into_owned()
    }

    /// Commit time of the `n`-th commit made (1-based).
    pub fn time_of(n: i64) -> i64 {
        BASE_TIME + n * 60
    }

    /// Commit a full snapshot on HEAD.
    pub fn commit(&mut self, message: &str, files: &[(&str, &str)]) -> String {
        self.commit_as("Alice", message, files)
    }

    pub fn commit_as(&mut self, author: &str, message: &str, files: &[(&str, &str)]) -> String {
        let parents: Vec<Oid> = self
            .repo
            .head()
            .ok()
            .and_then(|h| h.target())
            .into_iter()
            .collect();
        self.commit_with(Some("HEAD"), author, &parents, message, files)
            .to_string()
    }

    /// Commit a full snapshot with explicit parents, moving `update_ref` if given.
    pub fn commit_with(
        &mut self,
        update_ref: Option<&str>,
        author: &str,
        parents: &[Oid],
        message: &str,
        files: &[(&str, &str)],
    ) -> Oid {
        self.tick += 1;
        let email = format!("{}@example.com", author.to_lowercase());
        let sig = Signature::new(author, &email, &Time::new(Self::time_of(self.tick), 0)).unwrap();

        let mut builder = self.repo.treebuilder(None).unwrap();
        for (name, content) in files {
            let blob = self.repo.blob(content.as_bytes()).unwrap();
            builder.insert(*name, blob, 0o100644).unwrap();
        }
        let tree = self.repo.find_tree(builder.write().unwrap()).unwrap();
        let parents: Vec<git2::Commit> = parents
            .iter()
            .map(|p| self.repo.find_commit(*p).unwrap())
            .collect();
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();

        self.repo
            .commit(update_ref, &sig, &sig, message, &tree, &parent_refs)
            .unwrap()
    }

    pub fn tag(&self, name: &str, commit: &str) {
        let object = self.repo.revparse_single(commit).unwrap();
        self.repo.tag_lightweight(name, &object, false).unwrap();
    }

    pub fn miner(&self, options: MiningOptions) -> RepositoryMiner {
        RepositoryMiner::new(
            [self.location()],
            options,
            Arc::new(Git2Provider::new()),
            Arc::new(MethodAnalyzer::new()),
        )
        .unwrap()
    }

    pub fn hashes(&self, options: MiningOptions) -> Vec<String> {
        self.miner(options)
            .traverse_commits()
            .map(|c| c.unwrap().hash().to_string())
            .collect()
    }
}

/// Fixture with `count` linear commits, each rewriting `file.txt`.
pub fn linear(count: usize) -> (Fixture, Vec<String>) {
    let mut fixture = Fixture::new();
    let hashes = (1..=count)
        .map(|i| {
            let content = format!("version {i}\n");
            fixture.commit(&format!("commit {i}"), &[("file.txt", content.as_str())])
        })
        .collect();
    (fixture, hashes)
}
