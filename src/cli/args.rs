//! Top-level CLI argument definitions

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    completions::CompletionsArgs, export::ExportArgs, init::InitArgs, list::ListArgs,
    show::ShowArgs, stats::StatsArgs, submit::SubmitArgs, update::UpdateArgs,
    verify::VerifyArgs, whoami::WhoamiArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "casebook",
    version,
    about = "Incident case records with lifecycle rules and a tamper-evident audit trail",
    long_about = "Casebook keeps a shared table of incident reports consistent under \
                  concurrent whole-table reads and overwrites.\n\n\
                  Anyone may submit a report. Officers update findings and move cases \
                  through Pending, In Progress, Resolved and Cancelled; resolved cases \
                  need a supervisor unlock before further edits."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command
#[derive(clap::Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Config file (default: $CASEBOOK_CONFIG, ./casebook.yaml, then the user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', global = true, default_value = "auto")]
    pub output: OutputFormat,

    /// More log output (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only print what scripts need (ids, counts)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Table for lists, detail view for single cases
    #[default]
    Auto,
    Table,
    Json,
    Yaml,
    Csv,
    /// Case ids only, one per line
    Id,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter casebook.yaml
    Init(InitArgs),

    /// File a new incident report (no login needed)
    Submit(SubmitArgs),

    /// List cases with filtering
    List(ListArgs),

    /// Show one case with its audit trail
    Show(ShowArgs),

    /// Change a case's status, findings or evidence (officers only)
    Update(UpdateArgs),

    /// Render a case sheet
    Export(ExportArgs),

    /// Check audit trail hash chains
    Verify(VerifyArgs),

    /// Case counts by status and incident type
    Stats(StatsArgs),

    /// Show which account a secret belongs to
    Whoami(WhoamiArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}
