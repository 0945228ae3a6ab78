use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cassandra-deploy")]
#[command(version)]
#[command(about = "Deploy the Cassandra network and instance stacks", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Settings shared by every stack command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Config file (a missing deploy.toml is ignored)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// CIDR allowed to reach the network stack
    #[arg(long, env = "ALLOW_IP", global = true, value_name = "CIDR")]
    pub allow_ip: Option<String>,

    /// AWS region
    #[arg(long, env = "AWS_REGION", global = true)]
    pub region: Option<String>,

    /// AWS named profile
    #[arg(long, env = "AWS_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Seconds between status polls while waiting
    #[arg(long, global = true, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// Seconds to wait for a stack operation before giving up
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Abort when an existence check fails instead of assuming absent
    #[arg(long, global = true)]
    pub fail_closed: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Reconcile the network stack, then every instance stack
    Apply {
        /// Show planned actions without changing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Show existence, status and drift of every stack
    Status {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Show template differences for stacks that are dirty
    Diff,

    /// Create stacks that do not exist yet
    Setup,

    /// Delete instance stacks, then the network stack
    Teardown {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
