//! DMM command implementation.

use super::{mine, FilterArgs};
use anyhow::Result;
use colored::Colorize;
use histmine_core::Commit;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct DmmRow {
    hash: String,
    unit_size: Option<f64>,
    unit_complexity: Option<f64>,
    unit_interfacing: Option<f64>,
}

impl DmmRow {
    fn from_commit(commit: &Commit) -> Result<Self> {
        Ok(Self {
            hash: commit.hash().to_string(),
            unit_size: commit.dmm_unit_size(),
            unit_complexity: commit.dmm_unit_complexity(),
            unit_interfacing: commit.dmm_unit_interfacing(),
        })
    }
}

fn score(value: Option<f64>, width: usize) -> String {
    match value {
        Some(v) if v >= 0.5 => format!("{:>width$.2}", v).green().to_string(),
        Some(v) => format!("{:>width$.2}", v).yellow().to_string(),
        None => format!("{:>width$}", "-").dimmed().to_string(),
    }
}

/// Run the dmm command.
pub async fn run(args: FilterArgs, json: bool) -> Result<()> {
    if !json {
        println!("{} Delta maintainability for {}", "→".blue(), args.locations.join(", "));
        println!();
        println!("  {:<9} {:>6} {:>11} {:>12}", "commit", "size", "complexity", "interfacing");
    }

    let count = mine(&args, DmmRow::from_commit, |row| {
        if json {
            match serde_json::to_string(&row) {
                Ok(line) => println!("{}", line),
                Err(e) => eprintln!("{} Could not serialize {}: {}", "✗".red(), row.hash, e),
            }
        } else {
            let short = format!("{:<9}", &row.hash[..7.min(row.hash.len())]);
            println!(
                "  {} {} {} {}",
                short.magenta(),
                score(row.unit_size, 6),
                score(row.unit_complexity, 11),
                score(row.unit_interfacing, 12)
            );
        }
    })
    .await?;

    if !json {
        println!();
        println!("{} {} commit(s)", "✓".green(), count);
    }
    Ok(())
}
