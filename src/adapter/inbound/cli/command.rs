//! Command-line interface definitions.
//!
//! Defines the CLI structure for followgraph using `clap`: read-only
//! analytics commands (`summary`, `classify`, `preview`) and the two
//! bulk mutation commands (`unfollow`, `follow`).

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

/// Follow-graph analytics and rate-limited bulk follow/unfollow for GitHub
#[derive(Parser, Debug)]
#[command(name = "followgraph")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file (defaults apply when missing)
    #[arg(short, long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Override the log level (e.g. debug, info, warn)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show follower/following counts, ratio and rate budget
    Summary,

    /// List mutuals, non-mutuals and follow-back candidates
    Classify(ClassifyArgs),

    /// Show which accounts an unfollow would touch, without changing anything
    Preview(PreviewArgs),

    /// Unfollow accounts that do not follow back
    Unfollow(UnfollowArgs),

    /// Follow back followers, or an explicit list of handles
    Follow(FollowArgs),
}

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Entries to print per partition
    #[arg(long, default_value_t = 20)]
    pub show: usize,
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Number of non-mutuals to list (all when omitted)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Order by handle before applying the limit
    #[arg(long)]
    pub sort: bool,
}

/// Options shared by the bulk commands.
#[derive(Args, Debug)]
pub struct BulkArgs {
    /// Order candidates by handle before applying the limit
    #[arg(long)]
    pub sort: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Write the batch report as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Re-read the following list afterwards to confirm the changes
    #[arg(long)]
    pub verify: bool,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("amount").required(true).args(["limit", "all"])))]
pub struct UnfollowArgs {
    /// Maximum number of accounts to unfollow
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Unfollow every non-mutual
    #[arg(long)]
    pub all: bool,

    #[command(flatten)]
    pub bulk: BulkArgs,
}

#[derive(Args, Debug)]
pub struct FollowArgs {
    /// Maximum number of accounts to follow (all candidates when omitted)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Comma-separated handles to follow instead of follow-back candidates
    #[arg(long)]
    pub handles: Option<String>,

    #[command(flatten)]
    pub bulk: BulkArgs,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn unfollow_requires_limit_or_all() {
        assert!(Cli::try_parse_from(["followgraph", "unfollow"]).is_err());
        assert!(Cli::try_parse_from(["followgraph", "unfollow", "--limit", "5", "--all"]).is_err());

        let cli = Cli::try_parse_from(["followgraph", "unfollow", "--all", "--yes"]).unwrap();
        match cli.command {
            Commands::Unfollow(args) => {
                assert!(args.all);
                assert!(args.bulk.yes);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["followgraph", "summary", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
    }
}
