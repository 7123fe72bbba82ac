use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{config::Overrides, history::SessionId};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Profile CSV files and assess their data quality",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Analyze a CSV file: column types, statistics, quality metrics and recommendations
    Analyze(AnalyzeArgs),
    /// List saved analyses for a session, newest first
    History(HistoryArgs),
    /// Show the rows the parser keeps, or export them as clean CSV
    Preview(PreviewArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

#[derive(Debug, Args)]
pub struct SessionArgs {
    /// YAML settings file (defaults to $CSV_INSIGHT_CONFIG when set)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Directory holding saved analysis records
    #[arg(long = "history-dir")]
    pub history_dir: Option<PathBuf>,
    /// Session id (UUID) that scopes saved records
    #[arg(long)]
    pub session: Option<SessionId>,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Input CSV file (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Output file for the report (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Report format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Command that receives the insight prompt on stdin and prints a narrative
    #[arg(long = "insight-command")]
    pub insight_command: Option<String>,
    /// Seconds to wait for the insight command before giving up
    #[arg(long = "insight-timeout", value_name = "SECS")]
    pub insight_timeout: Option<u64>,
    /// Do not save this analysis to history
    #[arg(long = "no-save")]
    pub no_save: bool,
    #[command(flatten)]
    pub session: SessionArgs,
}

impl AnalyzeArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            history_dir: self.session.history_dir.clone(),
            session_id: self.session.session,
            insight_command: self.insight_command.clone(),
            insight_timeout_secs: self.insight_timeout,
            no_save: self.no_save,
        }
    }
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
    #[command(flatten)]
    pub session: SessionArgs,
}

impl HistoryArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            history_dir: self.session.history_dir.clone(),
            session_id: self.session.session,
            ..Overrides::default()
        }
    }
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Input CSV file to preview (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
    /// Write every retained row as CSV to this path instead of printing a table
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}
