//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for council results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Full report: responses, consensus, stages and verdict
    Full,
    /// Decision and verdict only
    Summary,
    /// JSON output
    Json,
}

impl From<concord_domain::OutputFormat> for OutputFormat {
    fn from(format: concord_domain::OutputFormat) -> Self {
        match format {
            concord_domain::OutputFormat::Full => OutputFormat::Full,
            concord_domain::OutputFormat::Summary => OutputFormat::Summary,
            concord_domain::OutputFormat::Json => OutputFormat::Json,
        }
    }
}

/// CLI arguments for concord
#[derive(Parser, Debug)]
#[command(name = "concord")]
#[command(author, version, about = "Participant council with adaptive throttling and staged governance")]
#[command(long_about = r#"
Concord fans a task out to a pool of participants, merges their answers
into one consensus decision, and passes that decision through governance
stages before issuing a verdict.

The load throttle picks how many participants, debate rounds and calls a
task may use (minimal < standard < deep < swarm), downgrading under load.

Configuration files are loaded from (in priority order):
1. CONCORD_* environment variables
2. --config <path>          Explicit config file
3. ./concord.toml           Project-level config
4. ~/.config/concord/config.toml   Global config

Example:
  concord submit "Should we roll out the new cache?" --priority high
  concord submit "Rotate keys" --capability ops --safety 0.9 -o json
  concord metrics
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// Also write diagnostic logs to this file
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Submit a task to the council and print the verdict
    Submit(SubmitArgs),
    /// Show the throttle mode and load utilization
    Metrics,
    /// List participants with trust and agreement statistics
    Participants,
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// The task payload
    pub payload: String,

    /// Task id (generated when omitted)
    #[arg(long)]
    pub id: Option<String>,

    /// Capability participants must have (can be specified multiple times)
    #[arg(short = 'c', long = "capability", value_name = "TAG")]
    pub capabilities: Vec<String>,

    /// Task priority: low, normal, high, critical
    #[arg(short, long, default_value = "normal")]
    pub priority: String,

    /// Deadline in milliseconds from now
    #[arg(long, value_name = "MS")]
    pub deadline_ms: Option<u64>,

    /// Prior confidence that a cheap answer is good enough (0-1)
    #[arg(long, value_name = "0-1")]
    pub confidence: Option<f64>,

    /// How safety-sensitive the action is (0-1)
    #[arg(long, value_name = "0-1")]
    pub safety: Option<f64>,

    /// Estimated problem complexity (0-1)
    #[arg(long, value_name = "0-1")]
    pub complexity: Option<f64>,

    /// Force a throttle mode for this task: minimal, standard, deep, swarm
    #[arg(short, long, value_name = "MODE")]
    pub mode: Option<String>,

    /// Output format (defaults to the configured format, then summary)
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Run a single consensus round
    #[arg(long)]
    pub no_debate: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_submit() {
        let cli = Cli::parse_from([
            "concord",
            "-vv",
            "submit",
            "deploy?",
            "-c",
            "ops",
            "--capability",
            "review",
            "--priority",
            "high",
            "--safety",
            "0.9",
            "-o",
            "json",
        ]);
        assert_eq!(cli.verbose, 2);
        let Some(Command::Submit(args)) = cli.command else {
            panic!("expected submit");
        };
        assert_eq!(args.payload, "deploy?");
        assert_eq!(args.capabilities, vec!["ops", "review"]);
        assert_eq!(args.priority, "high");
        assert_eq!(args.safety, Some(0.9));
        assert_eq!(args.output, Some(OutputFormat::Json));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["concord", "metrics", "--no-config", "-q"]);
        assert!(matches!(cli.command, Some(Command::Metrics)));
        assert!(cli.no_config);
        assert!(cli.quiet);
    }

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
