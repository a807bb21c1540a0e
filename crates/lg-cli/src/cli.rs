//! CLI argument definitions using clap derive API

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};

/// lineagegraph - extract data lineage from SQL and query it
#[derive(Parser, Debug)]
#[command(name = "lg")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory searched for lineage.yml
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true, env = "LG_CONFIG")]
    pub config: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print extraction records for SQL files
    Analyze(AnalyzeArgs),

    /// Ingest SQL files and print lineage of an entity
    Lineage(LineageArgs),

    /// Ingest SQL files and print paths between two entities
    Path(PathArgs),
}

/// Arguments for the analyze command
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// SQL files or directories (searched for **/*.sql)
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Override SQL dialect
    #[arg(short, long)]
    pub dialect: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub output: AnalyzeOutput,
}

/// Analyze output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzeOutput {
    /// Extraction records as JSON
    Json,
    /// Human-readable summary
    Pretty,
}

/// Arguments for the lineage command
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("start").required(true).args(["entity", "table"])))]
pub struct LineageArgs {
    /// SQL files or directories (searched for **/*.sql)
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Entity id to start from
    #[arg(short, long)]
    pub entity: Option<String>,

    /// Table name or id to start from
    #[arg(short, long)]
    pub table: Option<String>,

    /// Column of --table to trace
    #[arg(long, requires = "table")]
    pub column: Option<String>,

    /// Which way to walk
    #[arg(long, value_enum, default_value = "both")]
    pub direction: LineageDirection,

    /// Maximum hops (defaults to traversal.max_depth)
    #[arg(long)]
    pub depth: Option<usize>,

    /// Include the transformation summary
    #[arg(long)]
    pub summary: bool,

    /// Include declared-type validation records
    #[arg(long)]
    pub validate: bool,

    /// Override SQL dialect
    #[arg(short, long)]
    pub dialect: Option<String>,
}

/// Lineage walk direction
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineageDirection {
    Upstream,
    Downstream,
    Both,
}

impl LineageDirection {
    pub fn includes_upstream(self) -> bool {
        matches!(self, LineageDirection::Upstream | LineageDirection::Both)
    }

    pub fn includes_downstream(self) -> bool {
        matches!(self, LineageDirection::Downstream | LineageDirection::Both)
    }
}

/// Arguments for the path command
#[derive(Args, Debug)]
pub struct PathArgs {
    /// SQL files or directories (searched for **/*.sql)
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Entity id the paths start at
    #[arg(long)]
    pub from: String,

    /// Entity id the paths end at
    #[arg(long)]
    pub to: String,

    /// Maximum hops (defaults to traversal.max_depth)
    #[arg(long)]
    pub depth: Option<usize>,

    /// Override SQL dialect
    #[arg(short, long)]
    pub dialect: Option<String>,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
