//! # csv-insight
//!
//! Profiles a CSV file in one pass: parses it, infers a type per column,
//! computes descriptive statistics and data-quality metrics, and derives
//! plain-language recommendations.
//!
//! ```
//! let report = csv_insight::analysis::analyze("id,score\n1,10\n2,12\n3,\n", "scores.csv")
//!     .expect("valid csv");
//! assert_eq!(report.summary.total_rows, 3);
//! assert_eq!(report.column_profiles[1].missing_values, 1);
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod insight;
pub mod io_utils;
pub mod parser;
pub mod profile;
pub mod quality;
pub mod recommend;
pub mod render;
pub mod session;
pub mod table;
pub mod value;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    cli::{AnalyzeArgs, Cli, Commands, HistoryArgs, PreviewArgs},
    config::Settings,
    history::JsonHistoryStore,
    insight::CommandInsights,
    render::RenderedAnalysis,
    session::AnalysisSession,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_insight", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze(args) => handle_analyze(&args),
        Commands::History(args) => handle_history(&args),
        Commands::Preview(args) => handle_preview(&args),
    }
}

fn build_session(settings: &Settings) -> AnalysisSession {
    let session_id = settings.session_id.unwrap_or_default();
    let mut session = AnalysisSession::new(session_id);
    if let Some(provider) = CommandInsights::from_command_line(&settings.insight_command) {
        let provider = provider.with_timeout(settings.insight_timeout);
        session = session.with_insights(Box::new(provider));
    }
    if settings.save_history {
        session = session.with_store(Box::new(JsonHistoryStore::new(&settings.history_dir)));
    }
    session
}

fn handle_analyze(args: &AnalyzeArgs) -> Result<()> {
    let settings = Settings::resolve(args.session.config.as_deref(), &args.overrides())?;
    let session = build_session(&settings);
    info!("Session {}", session.session_id());

    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let text = io_utils::read_input(&args.input, encoding)?;
    let filename = io_utils::display_name(&args.input);
    let outcome = session
        .analyze(&text, &filename)
        .with_context(|| format!("Analyzing {:?}", args.input))?;
    if outcome.dropped_rows > 0 {
        info!(
            "Skipped {} line(s) in '{filename}' with a mismatched width or no values",
            outcome.dropped_rows
        );
    }

    let rendered = render::render_analysis(
        &RenderedAnalysis {
            filename: &filename,
            report: &outcome.report,
            insights: outcome.insights.as_deref(),
        },
        args.format,
    )?;
    io_utils::write_output(args.output.as_deref(), &rendered)?;
    if let Some(path) = &args.output {
        info!("Report for '{filename}' written to {path:?}");
    }
    Ok(())
}

fn handle_history(args: &HistoryArgs) -> Result<()> {
    let settings = Settings::resolve(args.session.config.as_deref(), &args.overrides())?;
    if settings.session_id.is_none() {
        return Err(anyhow!(
            "History is scoped to a session. \
             Supply --session, set {}, or add session_id to the config file",
            config::SESSION_ENV
        ));
    }
    let session = build_session(&Settings {
        save_history: true,
        ..settings
    });
    let records = session.history();
    let rendered = render::render_history(&records, args.format)?;
    io_utils::write_output(None, &rendered)?;
    info!("Listed {} saved analysis record(s)", records.len());
    Ok(())
}

fn handle_preview(args: &PreviewArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let text = io_utils::read_input(&args.input, encoding)?;
    let parsed = parser::parse_with_details(&text)
        .with_context(|| format!("Parsing {:?}", args.input))?;
    let data = &parsed.table;

    if let Some(path) = &args.output {
        let mut writer = io_utils::open_csv_writer(Some(path.as_path()))?;
        writer
            .write_record(data.headers())
            .context("Writing CSV header")?;
        for row in data.rows() {
            writer.write_record(row).context("Writing CSV row")?;
        }
        writer.flush().context("Flushing CSV output")?;
        info!(
            "Exported {} row(s) ({} skipped) to {path:?}",
            data.row_count(),
            parsed.dropped_rows
        );
        return Ok(());
    }

    let rows = data
        .rows()
        .iter()
        .take(args.rows)
        .cloned()
        .collect::<Vec<_>>();
    table::print_table(data.headers(), &rows);
    info!(
        "Displayed {} of {} row(s) from {:?}",
        rows.len(),
        data.row_count(),
        args.input
    );
    Ok(())
}
