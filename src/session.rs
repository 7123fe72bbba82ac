//! Orchestrating layer above the analysis core.
//!
//! An [`AnalysisSession`] holds the identity key for its lifetime and the two
//! collaborators. Collaborator failures are logged and returned alongside the
//! report; they never turn a successful analysis into an error.

use log::{info, warn};

use crate::{
    analysis::{self, AnalysisReport},
    error::{AnalysisError, CollaboratorError},
    history::{AnalysisRecord, HistoryStore, SessionId},
    insight::{DisabledInsights, InsightProvider, InsightRequest},
    parser::{self, Table},
};

#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub table: Table,
    pub report: AnalysisReport,
    pub insights: Option<String>,
    /// Rows discarded by the parser for width or blankness.
    pub dropped_rows: usize,
    pub persistence_error: Option<CollaboratorError>,
}

pub struct AnalysisSession {
    session_id: SessionId,
    insights: Box<dyn InsightProvider>,
    store: Option<Box<dyn HistoryStore>>,
}

impl AnalysisSession {
    /// A session with no insight service and no persistence.
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            insights: Box::new(DisabledInsights),
            store: None,
        }
    }

    pub fn with_insights(mut self, provider: Box<dyn InsightProvider>) -> Self {
        self.insights = provider;
        self
    }

    pub fn with_store(mut self, store: Box<dyn HistoryStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn analyze(&self, raw_text: &str, filename: &str) -> Result<SessionOutcome, AnalysisError> {
        let parsed = parser::parse_with_details(raw_text)?;
        let report = analysis::analyze_table(&parsed.table, filename);

        let request = InsightRequest::new(&parsed.table, &report);
        let insights = match self.insights.fetch_insights(&request) {
            Ok(text) => Some(text),
            Err(err) => {
                warn!("Continuing without insights for '{filename}': {err}");
                None
            }
        };

        let persistence_error = match &self.store {
            Some(store) => match store.save(
                &self.session_id,
                filename,
                &parsed.table,
                &report,
                insights.as_deref(),
            ) {
                Ok(()) => {
                    info!("Saved analysis of '{filename}' to history");
                    None
                }
                Err(err) => {
                    warn!("Failed to save analysis of '{filename}': {err}");
                    Some(err)
                }
            },
            None => None,
        };

        Ok(SessionOutcome {
            table: parsed.table,
            report,
            insights,
            dropped_rows: parsed.dropped_rows,
            persistence_error,
        })
    }

    /// Saved records for this session; failures degrade to an empty list.
    pub fn history(&self) -> Vec<AnalysisRecord> {
        let Some(store) = &self.store else {
            return Vec::new();
        };
        match store.list_history(&self.session_id) {
            Ok(records) => records,
            Err(err) => {
                warn!("Failed to load analysis history: {err}");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::{error::ParseError, history::MemoryHistoryStore};

    struct FixedInsights(&'static str);

    impl InsightProvider for FixedInsights {
        fn fetch_insights(&self, request: &InsightRequest) -> Result<String, CollaboratorError> {
            Ok(format!("{} ({} rows)", self.0, request.total_rows))
        }
    }

    struct FailingStore {
        calls: Arc<AtomicUsize>,
    }

    impl HistoryStore for FailingStore {
        fn save(
            &self,
            _identity: &SessionId,
            _filename: &str,
            _table: &Table,
            _report: &AnalysisReport,
            _insights: Option<&str>,
        ) -> Result<(), CollaboratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CollaboratorError::PersistenceUnavailable("offline".to_string()))
        }

        fn list_history(
            &self,
            _identity: &SessionId,
        ) -> Result<Vec<AnalysisRecord>, CollaboratorError> {
            Err(CollaboratorError::PersistenceUnavailable("offline".to_string()))
        }
    }

    const CSV: &str = "id,value\n1,10\n2,20\n";

    #[test]
    fn report_survives_both_collaborators_failing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let session = AnalysisSession::new(SessionId::new()).with_store(Box::new(FailingStore {
            calls: Arc::clone(&calls),
        }));
        let outcome = session.analyze(CSV, "data.csv").expect("analysis succeeds");
        assert_eq!(outcome.report.summary.total_rows, 2);
        assert!(outcome.insights.is_none());
        assert_eq!(
            outcome.persistence_error,
            Some(CollaboratorError::PersistenceUnavailable("offline".to_string()))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(session.history().is_empty());
    }

    #[test]
    fn insights_and_history_flow_through_session() {
        let session = AnalysisSession::new(SessionId::new())
            .with_insights(Box::new(FixedInsights("steady")))
            .with_store(Box::new(MemoryHistoryStore::new()));
        let outcome = session.analyze(CSV, "data.csv").expect("analysis");
        assert_eq!(outcome.insights.as_deref(), Some("steady (2 rows)"));
        assert!(outcome.persistence_error.is_none());

        let history = session.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].filename, "data.csv");
        assert_eq!(history[0].session_id, session.session_id());
        assert_eq!(history[0].insights.as_deref(), Some("steady (2 rows)"));
    }

    #[test]
    fn parse_errors_are_returned_without_touching_collaborators() {
        let calls = Arc::new(AtomicUsize::new(0));
        let session = AnalysisSession::new(SessionId::new()).with_store(Box::new(FailingStore {
            calls: Arc::clone(&calls),
        }));
        let err = session.analyze("", "empty.csv").unwrap_err();
        assert_eq!(err, AnalysisError::Parse(ParseError::EmptyInput));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
