//! Histmine CLI
//!
//! Command-line interface for the histmine repository mining engine.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::changeset::RangeArgs;
use commands::FilterArgs;

#[derive(Parser)]
#[command(name = "histmine")]
#[command(author, version, about = "Mine commits, diffs and metrics from git history", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the commits selected by the filters
    Commits {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Delta maintainability scores per commit
    Dmm {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Commits that last modified the lines a commit deleted
    Attribute {
        /// Local path or remote URL
        location: String,

        /// Commit whose deleted lines are attributed
        #[arg(short, long)]
        commit: String,

        /// Restrict to one modified file
        #[arg(short, long)]
        file: Option<String>,
    },

    /// Files committed together over a range
    Changeset {
        #[command(flatten)]
        range: RangeArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("histmine=debug")
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("histmine=info")
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Commits { filters } => {
            commands::commits::run(filters, cli.json).await?;
        }
        Commands::Dmm { filters } => {
            commands::dmm::run(filters, cli.json).await?;
        }
        Commands::Attribute {
            location,
            commit,
            file,
        } => {
            commands::attribute::run(location, commit, file, cli.json).await?;
        }
        Commands::Changeset { range } => {
            commands::changeset::run(range, cli.json).await?;
        }
    }

    Ok(())
}
