//! Change-set command implementation.

use super::parse_date;
use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use clap::Args;
use colored::Colorize;
use histmine_core::{ChangeSet, MetricRange};
use histmine_git::Git2Provider;
use histmine_parser::MethodAnalyzer;
use serde_json::json;
use std::sync::Arc;

#[derive(Args, Debug, Clone)]
pub struct RangeArgs {
    /// Local paths or remote URLs
    #[arg(required = true)]
    pub locations: Vec<String>,

    /// Range start date
    #[arg(long, value_parser = parse_date)]
    pub since: Option<DateTime<FixedOffset>>,

    /// Range end date
    #[arg(long, value_parser = parse_date)]
    pub to: Option<DateTime<FixedOffset>>,

    /// Range start commit
    #[arg(long)]
    pub from_commit: Option<String>,

    /// Range end commit
    #[arg(long)]
    pub to_commit: Option<String>,
}

/// Run the changeset command.
pub async fn run(args: RangeArgs, json: bool) -> Result<()> {
    let range = MetricRange {
        since: args.since,
        to: args.to,
        from_commit: args.from_commit,
        to_commit: args.to_commit,
    };
    let locations = args.locations;

    let change_set = tokio::task::spawn_blocking(move || {
        ChangeSet::new(
            locations,
            &range,
            Arc::new(Git2Provider::new()),
            Arc::new(MethodAnalyzer::new()),
        )
    })
    .await??;

    if json {
        let report = json!({
            "sizes": change_set.sizes(),
            "max": change_set.max(),
            "avg": change_set.avg(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} Change set", "→".blue());
    println!();
    println!("  Commits: {}", change_set.sizes().len());
    println!("  Max files per commit: {}", change_set.max().to_string().green());
    println!("  Avg files per commit: {}", change_set.avg().to_string().green());
    Ok(())
}
