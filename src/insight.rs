//! Insight collaborator: a narrow interface to an external text generator.
//!
//! The analysis core never depends on a provider succeeding. Every failure is
//! reported as [`CollaboratorError::InsightUnavailable`] and the caller keeps
//! the report it already has.

use std::{
    io::{Read, Write},
    process::{Child, Command, Stdio},
    sync::mpsc,
    thread,
    time::{Duration, Instant},
};

use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    analysis::AnalysisReport, error::CollaboratorError, parser::Table, profile::ColumnType,
};

/// Number of leading data rows shared with the insight service.
pub const PREVIEW_ROWS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightRequest {
    pub headers: Vec<String>,
    pub preview: Vec<Vec<String>>,
    pub total_rows: usize,
    pub missing_values: Vec<(String, usize)>,
    pub column_types: Vec<(String, ColumnType)>,
}

impl InsightRequest {
    pub fn new(table: &Table, report: &AnalysisReport) -> Self {
        Self {
            headers: table.headers().to_vec(),
            preview: table.rows().iter().take(PREVIEW_ROWS).cloned().collect(),
            total_rows: report.summary.total_rows,
            missing_values: report
                .summary
                .columns
                .iter()
                .map(|c| (c.name.clone(), c.missing_values))
                .collect(),
            column_types: report
                .summary
                .columns
                .iter()
                .map(|c| (c.name.clone(), c.column_type))
                .collect(),
        }
    }

    pub fn to_prompt(&self) -> String {
        let preview = self
            .preview
            .iter()
            .take(PREVIEW_ROWS)
            .map(|row| row.join(", "))
            .join("\n");
        let types = self
            .column_types
            .iter()
            .map(|(name, ty)| format!("- {name}: {ty}"))
            .join("\n");
        let missing = self
            .missing_values
            .iter()
            .map(|(name, count)| format!("- {name}: {count}"))
            .join("\n");
        format!(
            "Analyze this CSV data and provide insights:\n\
             Headers: {headers}\n\
             Preview Data (First {PREVIEW_ROWS} rows):\n\
             {preview}\n\n\
             Summary:\n\
             Total Rows: {total}\n\
             Column Types:\n\
             {types}\n\n\
             Missing Values:\n\
             {missing}\n\n\
             Please provide:\n\
             1. Data Quality Assessment\n\
             2. Potential Insights\n\
             3. Recommended Analysis Steps\n\
             4. Possible Data Transformations",
            headers = self.headers.join(", "),
            total = self.total_rows,
        )
    }
}

pub trait InsightProvider: Send + Sync {
    fn fetch_insights(&self, request: &InsightRequest) -> Result<String, CollaboratorError>;
}

/// Provider used when no insight service is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledInsights;

impl InsightProvider for DisabledInsights {
    fn fetch_insights(&self, _request: &InsightRequest) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::InsightUnavailable(
            "no insight command configured".to_string(),
        ))
    }
}

/// Default bound on how long an insight command may run.
pub const DEFAULT_INSIGHT_TIMEOUT: Duration = Duration::from_secs(60);

const MAX_INSIGHT_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Pipes the prompt into an external program and reads the narrative from stdout.
///
/// The prompt is written on a background thread while stdout is drained on
/// another, so a child that answers before it has consumed its input cannot
/// stall either side. A child still running after `timeout` is killed.
#[derive(Debug, Clone)]
pub struct CommandInsights {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandInsights {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: DEFAULT_INSIGHT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds a provider from `[program, arg, ...]`; `None` when empty.
    pub fn from_command_line(parts: &[String]) -> Option<Self> {
        let (program, args) = parts.split_first()?;
        if program.trim().is_empty() {
            return None;
        }
        Some(Self::new(program.clone(), args.to_vec()))
    }

    fn timed_out(&self, child: &mut Child) -> CollaboratorError {
        if let Err(err) = child.kill() {
            debug!("Killing '{}' failed: {err}", self.program);
        }
        let _ = child.wait();
        CollaboratorError::InsightUnavailable(format!(
            "'{}' did not finish within {:?}",
            self.program, self.timeout
        ))
    }
}

impl InsightProvider for CommandInsights {
    fn fetch_insights(&self, request: &InsightRequest) -> Result<String, CollaboratorError> {
        let unavailable = |message: String| CollaboratorError::InsightUnavailable(message);
        debug!("Requesting insights from '{}'", self.program);
        let deadline = Instant::now() + self.timeout.min(MAX_INSIGHT_TIMEOUT);
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| unavailable(format!("failed to spawn '{}': {err}", self.program)))?;

        // Both pipe threads are detached: a killed child may leave a
        // grandchild holding the pipes open.
        if let Some(mut stdin) = child.stdin.take() {
            let prompt = request.to_prompt();
            thread::spawn(move || {
                if let Err(err) = stdin.write_all(prompt.as_bytes()) {
                    debug!("Insight command stopped reading the prompt: {err}");
                }
            });
        }
        let (sender, receiver) = mpsc::channel();
        if let Some(mut stdout) = child.stdout.take() {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = sender.send(stdout.read_to_end(&mut buf).map(|_| buf));
            });
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        let stdout = match receiver.recv_timeout(remaining) {
            Ok(Ok(buf)) => buf,
            Ok(Err(err)) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(unavailable(format!("failed to read output: {err}")));
            }
            Err(_) => return Err(self.timed_out(&mut child)),
        };

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() < deadline => thread::sleep(EXIT_POLL_INTERVAL),
                Ok(None) => return Err(self.timed_out(&mut child)),
                Err(err) => return Err(unavailable(format!("failed to wait for child: {err}"))),
            }
        };
        if !status.success() {
            return Err(unavailable(format!(
                "'{}' exited with status {status}",
                self.program
            )));
        }
        let text = clean_insight_text(&String::from_utf8_lossy(&stdout));
        if text.is_empty() {
            return Err(unavailable(format!("'{}' returned no text", self.program)));
        }
        Ok(text)
    }
}

/// Strips markdown bold and heading markers from generated text.
pub fn clean_insight_text(raw: &str) -> String {
    raw.replace("**", "").replace("##", "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze_table;
    use crate::parser::parse;

    fn request() -> InsightRequest {
        let mut text = String::from("city,temp\n");
        for i in 0..8 {
            text.push_str(&format!("c{i},{i}\n"));
        }
        let table = parse(&text).expect("parse");
        let report = analyze_table(&table, "weather.csv");
        InsightRequest::new(&table, &report)
    }

    #[test]
    fn request_limits_preview_rows() {
        let request = request();
        assert_eq!(request.preview.len(), PREVIEW_ROWS);
        assert_eq!(request.total_rows, 8);
        assert_eq!(request.column_types[1], ("temp".to_string(), ColumnType::Number));
    }

    #[test]
    fn prompt_lists_headers_types_and_missing_counts() {
        let prompt = request().to_prompt();
        assert!(prompt.starts_with("Analyze this CSV data and provide insights:"));
        assert!(prompt.contains("Headers: city, temp"));
        assert!(prompt.contains("c4, 4"));
        assert!(!prompt.contains("c5, 5"));
        assert!(prompt.contains("- temp: number"));
        assert!(prompt.contains("- city: 0"));
        assert!(prompt.ends_with("4. Possible Data Transformations"));
    }

    #[test]
    fn clean_text_removes_markdown_markers() {
        assert_eq!(
            clean_insight_text("## Summary\n**Bold** text\n"),
            "Summary\nBold text"
        );
    }

    #[test]
    fn disabled_provider_reports_unavailable() {
        let err = DisabledInsights.fetch_insights(&request()).unwrap_err();
        assert!(matches!(err, CollaboratorError::InsightUnavailable(_)));
    }

    #[test]
    fn missing_program_reports_unavailable() {
        let provider = CommandInsights::new("csv-insight-no-such-program", Vec::new());
        let err = provider.fetch_insights(&request()).unwrap_err();
        assert!(matches!(err, CollaboratorError::InsightUnavailable(_)));
    }

    #[test]
    fn from_command_line_requires_program() {
        assert!(CommandInsights::from_command_line(&[]).is_none());
        let provider =
            CommandInsights::from_command_line(&["llm".to_string(), "--quiet".to_string()])
                .expect("provider");
        assert_eq!(provider.program, "llm");
        assert_eq!(provider.args, vec!["--quiet".to_string()]);
        assert_eq!(provider.timeout, DEFAULT_INSIGHT_TIMEOUT);
    }

    fn large_request() -> InsightRequest {
        let cell = "v".repeat(20_000);
        InsightRequest {
            headers: vec!["payload".to_string()],
            preview: vec![vec![cell]; PREVIEW_ROWS],
            total_rows: PREVIEW_ROWS,
            missing_values: vec![("payload".to_string(), 0)],
            column_types: vec![("payload".to_string(), ColumnType::String)],
        }
    }

    fn shell(script: &str) -> CommandInsights {
        CommandInsights::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[cfg(unix)]
    #[test]
    fn large_prompt_does_not_block_an_eager_writer() {
        let request = large_request();
        assert!(request.to_prompt().len() > 100_000);
        let provider = shell("head -c 200000 /dev/zero | tr '\\0' y; cat >/dev/null")
            .with_timeout(Duration::from_secs(20));
        let text = provider.fetch_insights(&request).expect("insights");
        assert_eq!(text.len(), 200_000);
        assert!(text.chars().all(|c| c == 'y'));
    }

    #[cfg(unix)]
    #[test]
    fn child_that_ignores_the_prompt_still_answers() {
        let text = shell("echo summary")
            .fetch_insights(&large_request())
            .expect("insights");
        assert_eq!(text, "summary");
    }

    #[cfg(unix)]
    #[test]
    fn slow_command_times_out() {
        let started = Instant::now();
        let err = shell("sleep 10")
            .with_timeout(Duration::from_millis(300))
            .fetch_insights(&request())
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::InsightUnavailable(_)));
        assert!(err.to_string().contains("did not finish"));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_reports_unavailable() {
        let err = shell("exit 3").fetch_insights(&request()).unwrap_err();
        assert!(matches!(err, CollaboratorError::InsightUnavailable(_)));
        assert!(err.to_string().contains("exited with status"));
    }
}
