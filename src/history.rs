//! Persistence collaborator: saved analyses keyed by an explicit session id.
//!
//! Stores never own the in-memory report; a failed save leaves the caller's
//! report untouched and surfaces as [`CollaboratorError::PersistenceUnavailable`].

use std::{
    fmt,
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    str::FromStr,
    sync::Mutex,
};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{analysis::AnalysisReport, error::CollaboratorError, parser::Table};

/// Maximum number of records returned by [`HistoryStore::list_history`].
pub const HISTORY_PAGE_SIZE: usize = 50;

const RECORD_EXTENSION: &str = "json";

/// Identity key that scopes saved records to one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub session_id: SessionId,
    pub filename: String,
    pub table: Table,
    pub report: AnalysisReport,
    pub insights: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn new(
        session_id: SessionId,
        filename: &str,
        table: &Table,
        report: &AnalysisReport,
        insights: Option<&str>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            filename: filename.to_string(),
            table: table.clone(),
            report: report.clone(),
            insights: insights.map(str::to_string),
            created_at: Utc::now(),
        }
    }
}

pub trait HistoryStore: Send + Sync {
    fn save(
        &self,
        identity: &SessionId,
        filename: &str,
        table: &Table,
        report: &AnalysisReport,
        insights: Option<&str>,
    ) -> Result<(), CollaboratorError>;

    /// Records for `identity`, newest first, at most [`HISTORY_PAGE_SIZE`].
    fn list_history(&self, identity: &SessionId) -> Result<Vec<AnalysisRecord>, CollaboratorError>;
}

fn newest_page(mut records: Vec<AnalysisRecord>) -> Vec<AnalysisRecord> {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    records.truncate(HISTORY_PAGE_SIZE);
    records
}

fn unavailable(message: String) -> CollaboratorError {
    CollaboratorError::PersistenceUnavailable(message)
}

/// One pretty-printed JSON file per record inside a directory.
#[derive(Debug, Clone)]
pub struct JsonHistoryStore {
    dir: PathBuf,
}

impl JsonHistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, record: &AnalysisRecord) -> PathBuf {
        self.dir.join(format!(
            "{}-{}.{RECORD_EXTENSION}",
            record.created_at.timestamp_millis(),
            record.id
        ))
    }

    fn load_record(path: &Path) -> Result<AnalysisRecord, String> {
        let file = File::open(path).map_err(|err| format!("opening {path:?}: {err}"))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|err| format!("parsing {path:?}: {err}"))
    }
}

impl HistoryStore for JsonHistoryStore {
    fn save(
        &self,
        identity: &SessionId,
        filename: &str,
        table: &Table,
        report: &AnalysisReport,
        insights: Option<&str>,
    ) -> Result<(), CollaboratorError> {
        fs::create_dir_all(&self.dir).map_err(|err| {
            unavailable(format!("creating history directory {:?}: {err}", self.dir))
        })?;
        let record = AnalysisRecord::new(*identity, filename, table, report, insights);
        let path = self.record_path(&record);
        let file = File::create(&path)
            .map_err(|err| unavailable(format!("creating record {path:?}: {err}")))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &record)
            .map_err(|err| unavailable(format!("writing record {path:?}: {err}")))?;
        writer
            .flush()
            .map_err(|err| unavailable(format!("flushing record {path:?}: {err}")))?;
        debug!("Saved analysis record {} to {:?}", record.id, path);
        Ok(())
    }

    fn list_history(
        &self,
        identity: &SessionId,
    ) -> Result<Vec<AnalysisRecord>, CollaboratorError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.dir).map_err(|err| {
            unavailable(format!("reading history directory {:?}: {err}", self.dir))
        })?;
        let mut records = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|err| unavailable(format!("reading history entry: {err}")))?
                .path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            match Self::load_record(&path) {
                Ok(record) if record.session_id == *identity => records.push(record),
                Ok(_) => {}
                Err(message) => warn!("Skipping unreadable history record: {message}"),
            }
        }
        Ok(newest_page(records))
    }
}

/// Process-local store, mainly for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    records: Mutex<Vec<AnalysisRecord>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn save(
        &self,
        identity: &SessionId,
        filename: &str,
        table: &Table,
        report: &AnalysisReport,
        insights: Option<&str>,
    ) -> Result<(), CollaboratorError> {
        let record = AnalysisRecord::new(*identity, filename, table, report, insights);
        self.records
            .lock()
            .map_err(|_| unavailable("history lock poisoned".to_string()))?
            .push(record);
        Ok(())
    }

    fn list_history(&self, identity: &SessionId) -> Result<Vec<AnalysisRecord>, CollaboratorError> {
        let records = self
            .records
            .lock()
            .map_err(|_| unavailable("history lock poisoned".to_string()))?;
        Ok(newest_page(
            records
                .iter()
                .rev()
                .filter(|record| record.session_id == *identity)
                .cloned()
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze_table;
    use crate::parser::parse;
    use tempfile::tempdir;

    fn sample() -> (Table, AnalysisReport) {
        let table = parse("a,b\n1,x\n2,y\n").expect("parse");
        let report = analyze_table(&table, "sample.csv");
        (table, report)
    }

    #[test]
    fn session_id_parses_and_displays() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().expect("parse session id");
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<SessionId>().is_err());
    }

    #[test]
    fn memory_store_scopes_by_session_and_orders_newest_first() {
        let (table, report) = sample();
        let store = MemoryHistoryStore::new();
        let mine = SessionId::new();
        let other = SessionId::new();
        store.save(&mine, "first.csv", &table, &report, None).unwrap();
        store.save(&other, "theirs.csv", &table, &report, None).unwrap();
        store
            .save(&mine, "second.csv", &table, &report, Some("notes"))
            .unwrap();

        let history = store.list_history(&mine).unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].created_at >= history[1].created_at);
        assert!(history.iter().all(|r| r.session_id == mine));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn list_history_is_bounded_to_page_size() {
        let (table, report) = sample();
        let store = MemoryHistoryStore::new();
        let id = SessionId::new();
        for i in 0..HISTORY_PAGE_SIZE + 5 {
            store
                .save(&id, &format!("{i}.csv"), &table, &report, None)
                .unwrap();
        }
        assert_eq!(store.list_history(&id).unwrap().len(), HISTORY_PAGE_SIZE);
    }

    #[test]
    fn json_store_round_trips_records() {
        let temp = tempdir().expect("temp dir");
        let store = JsonHistoryStore::new(temp.path().join("history"));
        let (table, report) = sample();
        let id = SessionId::new();

        assert!(store.list_history(&id).unwrap().is_empty());
        store
            .save(&id, "sample.csv", &table, &report, Some("looks fine"))
            .expect("save");
        fs::write(store.dir().join("garbage.json"), "{").expect("write garbage");

        let history = store.list_history(&id).expect("list");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].filename, "sample.csv");
        assert_eq!(history[0].table, table);
        assert_eq!(history[0].insights.as_deref(), Some("looks fine"));
        assert!(store.list_history(&SessionId::new()).unwrap().is_empty());
    }

    #[test]
    fn json_store_keeps_records_with_extreme_statistics() {
        let temp = tempdir().expect("temp dir");
        let store = JsonHistoryStore::new(temp.path());
        let table = parse("v\n1e308\n1.5e308\n").expect("parse");
        let report = analyze_table(&table, "huge.csv");
        let id = SessionId::new();
        store
            .save(&id, "huge.csv", &table, &report, None)
            .expect("save");

        let history = store.list_history(&id).expect("list");
        assert_eq!(history.len(), 1);
        let stats = history[0].report.column_profiles[0]
            .statistics
            .as_ref()
            .expect("numeric statistics");
        assert!(stats.mean.is_finite());
        assert!(stats.standard_deviation.is_finite());
    }

    #[test]
    fn json_store_reports_unwritable_directory() {
        let temp = tempdir().expect("temp dir");
        let blocker = temp.path().join("file");
        fs::write(&blocker, "x").expect("write blocker");
        let store = JsonHistoryStore::new(blocker.join("history"));
        let (table, report) = sample();
        let err = store
            .save(&SessionId::new(), "s.csv", &table, &report, None)
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::PersistenceUnavailable(_)));
    }
}
