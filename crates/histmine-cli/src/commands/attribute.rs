//! Attribute command implementation.

use anyhow::{anyhow, Result};
use colored::Colorize;
use histmine_core::{last_modified_lines, LastModifiedLines, MiningOptions, RepositoryMiner};
use histmine_git::Git2Provider;
use histmine_parser::MethodAnalyzer;
use std::sync::Arc;

/// Run the attribute command.
///
/// Lists the commits that last touched the lines `commit` deleted.
pub async fn run(location: String, commit: String, file: Option<String>, json: bool) -> Result<()> {
    if !json {
        println!("{} Attributing lines deleted by {}", "→".blue(), commit);
    }

    let target = commit.clone();
    let attribution = tokio::task::spawn_blocking(move || -> Result<LastModifiedLines> {
        let miner = RepositoryMiner::new(
            [location],
            MiningOptions::new().with_single(target.clone()),
            Arc::new(Git2Provider::new()),
            Arc::new(MethodAnalyzer::new()),
        )?;
        // The stream owns the checkout; keep it alive while the commit is read.
        let mut commits = miner.traverse_commits();
        let commit = commits
            .next()
            .ok_or_else(|| anyhow!("Commit {} not found", target))??;

        match file {
            Some(path) => {
                let modification = commit
                    .modified_files()?
                    .iter()
                    .find(|m| m.path() == path || m.old_path() == Some(path.as_str()))
                    .ok_or_else(|| anyhow!("{} was not modified by {}", path, target))?;
                Ok(last_modified_lines(&commit, Some(modification))?)
            }
            None => Ok(last_modified_lines(&commit, None)?),
        }
    })
    .await??;

    if json {
        println!("{}", serde_json::to_string_pretty(&attribution)?);
        return Ok(());
    }

    if attribution.is_empty() {
        println!("{} No deleted code lines to attribute", "⚠".yellow());
        return Ok(());
    }

    println!();
    for (path, commits) in &attribution {
        println!("  {}", path.bold());
        for hash in commits {
            println!("    {}", hash.magenta());
        }
    }
    println!();
    println!("{} {} file(s) attributed", "✓".green(), attribution.len());
    Ok(())
}
