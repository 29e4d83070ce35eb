//! Commits command implementation.

use super::{mine, FilterArgs};
use anyhow::Result;
use colored::Colorize;
use histmine_core::Commit;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct CommitRow {
    hash: String,
    project: String,
    author: String,
    email: String,
    date: String,
    timezone: i32,
    merge: bool,
    msg: String,
    files: usize,
    insertions: usize,
    deletions: usize,
    branches: Vec<String>,
    in_main_branch: bool,
}

impl CommitRow {
    fn from_commit(commit: &Commit) -> Result<Self> {
        Ok(Self {
            hash: commit.hash().to_string(),
            project: commit.project_name(),
            author: commit.author().name.clone(),
            email: commit.author().email.clone(),
            date: commit.committer_date().to_rfc3339(),
            timezone: commit.committer_timezone(),
            merge: commit.merge(),
            msg: commit.msg().to_string(),
            files: commit.files()?,
            insertions: commit.insertions()?,
            deletions: commit.deletions()?,
            branches: commit.branches()?.to_vec(),
            in_main_branch: commit.in_main_branch()?,
        })
    }

    fn print(&self) {
        let summary = self.msg.lines().next().unwrap_or("");
        println!(
            "{} {} {}",
            self.hash[..7.min(self.hash.len())].magenta(),
            self.author.cyan(),
            summary
        );
        println!(
            "   {} file(s), {} {}{}",
            self.files,
            format!("+{}", self.insertions).green(),
            format!("-{}", self.deletions).red(),
            if self.merge { "  (merge)".dimmed().to_string() } else { String::new() }
        );
    }
}

/// Run the commits command.
pub async fn run(args: FilterArgs, json: bool) -> Result<()> {
    if !json {
        println!("{} Mining {}", "→".blue(), args.locations.join(", "));
        println!();
    }

    let count = mine(&args, CommitRow::from_commit, |row| {
        if json {
            match serde_json::to_string(&row) {
                Ok(line) => println!("{}", line),
                Err(e) => eprintln!("{} Could not serialize {}: {}", "✗".red(), row.hash, e),
            }
        } else {
            row.print();
        }
    })
    .await?;

    if !json {
        println!();
        println!("{} {} commit(s)", "✓".green(), count);
    }
    Ok(())
}
