//! Hand-off of finished sessions to storage.

use crate::error::{check_file_name, StoreError};
use crate::session::{OutcomeEntry, SessionId, TypingSession};
use crate::stats::SessionStatistics;
use chrono::{DateTime, Local};
use itertools::Itertools;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Files written for one session; both empty for sinks that keep nothing on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistedFiles {
    pub events: Option<PathBuf>,
    pub summary: Option<PathBuf>,
}

impl PersistedFiles {
    pub fn refs(&self) -> Vec<String> {
        [&self.events, &self.summary]
            .into_iter()
            .flatten()
            .map(|p| p.display().to_string())
            .collect()
    }
}

/// Receives every session the registry finishes, exactly once.
pub trait SessionSink: Send + Sync {
    fn persist(
        &self,
        session: &TypingSession,
        statistics: &SessionStatistics,
    ) -> Result<PersistedFiles, StoreError>;
}

#[derive(Serialize)]
struct EventRow {
    timestamp_ms: u64,
    kind: &'static str,
    expected: String,
    typed: String,
    correct: bool,
}

impl From<&OutcomeEntry> for EventRow {
    fn from(e: &OutcomeEntry) -> Self {
        Self {
            timestamp_ms: e.timestamp_ms,
            kind: if e.is_backspace { "backspace" } else { "key" },
            expected: e.expected.map(String::from).unwrap_or_default(),
            typed: e.typed.map(String::from).unwrap_or_default(),
            correct: e.is_correct,
        }
    }
}

fn summary_rows(session: &TypingSession, s: &SessionStatistics) -> Vec<(&'static str, String)> {
    vec![
        ("session_id", session.id().to_string()),
        ("target_text", session.target_text().to_string()),
        ("target_phonetic", session.target_phonetic().iter().collect()),
        ("started_at", session.started_at().to_rfc3339()),
        ("status", s.status.to_string()),
        ("cursor", s.cursor.to_string()),
        ("target_len", s.target_len.to_string()),
        ("total_duration_ms", s.total_duration_ms.to_string()),
        ("total_key_count", s.total_key_count.to_string()),
        ("correct_count", s.correct_count.to_string()),
        ("incorrect_count", s.incorrect_count.to_string()),
        ("backspace_count", s.backspace_count.to_string()),
        ("accuracy_percent", format!("{:.2}", s.accuracy_percent)),
        ("wpm_correct", format!("{:.2}", s.wpm_correct)),
        ("cpm_correct", format!("{:.2}", s.cpm_correct)),
        ("wpm_total", format!("{:.2}", s.wpm_total)),
        ("cpm_total", format!("{:.2}", s.cpm_total)),
        ("min_interval_ms", s.min_interval_ms.to_string()),
        ("avg_interval_ms", format!("{:.2}", s.avg_interval_ms)),
        ("max_interval_ms", s.max_interval_ms.to_string()),
        ("interval_std_dev_ms", format!("{:.2}", s.interval_std_dev_ms)),
    ]
}

/// Writes `typing_events_<stamp>.csv` and `typing_summary_<stamp>.csv` per session.
#[derive(Debug, Clone)]
pub struct CsvLogger {
    dir: PathBuf,
}

impl CsvLogger {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn stamp(now: DateTime<Local>) -> String {
        now.format("%Y%m%d_%H%M%S_%6f").to_string()
    }

    fn write_events(&self, path: &Path, log: &[OutcomeEntry]) -> Result<(), StoreError> {
        let mut wtr = csv::Writer::from_path(path)?;
        if log.is_empty() {
            wtr.write_record(["timestamp_ms", "kind", "expected", "typed", "correct"])?;
        }
        for entry in log {
            wtr.serialize(EventRow::from(entry))?;
        }
        wtr.flush().map_err(|e| StoreError::io(path, e))
    }

    fn write_summary(
        &self,
        path: &Path,
        session: &TypingSession,
        statistics: &SessionStatistics,
    ) -> Result<(), StoreError> {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record(["metric", "value"])?;
        for (metric, value) in summary_rows(session, statistics) {
            wtr.write_record([metric, value.as_str()])?;
        }
        wtr.flush().map_err(|e| StoreError::io(path, e))
    }
}

impl SessionSink for CsvLogger {
    fn persist(
        &self,
        session: &TypingSession,
        statistics: &SessionStatistics,
    ) -> Result<PersistedFiles, StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;

        let stamp = Self::stamp(Local::now());
        let events = self.dir.join(format!("typing_events_{stamp}.csv"));
        let summary = self.dir.join(format!("{SUMMARY_PREFIX}{stamp}.csv"));

        self.write_events(&events, session.log())?;
        self.write_summary(&summary, session, statistics)?;

        info!(
            session = %session.id(),
            events = %events.display(),
            summary = %summary.display(),
            "session logs written"
        );

        Ok(PersistedFiles {
            events: Some(events),
            summary: Some(summary),
        })
    }
}

/// Everything a [`MemorySink`] captured for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedRecord {
    pub session_id: SessionId,
    pub target_text: String,
    pub events: Vec<OutcomeEntry>,
    pub statistics: SessionStatistics,
}

/// Keeps finished sessions in memory; for tests and headless runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<PersistedRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<PersistedRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl SessionSink for MemorySink {
    fn persist(
        &self,
        session: &TypingSession,
        statistics: &SessionStatistics,
    ) -> Result<PersistedFiles, StoreError> {
        self.records.lock().push(PersistedRecord {
            session_id: session.id(),
            target_text: session.target_text().to_string(),
            events: session.log().to_vec(),
            statistics: statistics.clone(),
        });
        Ok(PersistedFiles::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Events,
    Summary,
    Unknown,
}

impl LogKind {
    fn of(name: &str) -> Self {
        if name.contains("events") {
            LogKind::Events
        } else if name.contains("summary") {
            LogKind::Summary
        } else {
            LogKind::Unknown
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogFileInfo {
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Local>,
    pub kind: LogKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogContents {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Metrics of one `typing_summary_*` file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub name: String,
    pub modified: DateTime<Local>,
    pub metrics: BTreeMap<String, String>,
}

/// Totals over the output directory plus the newest session summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogSummary {
    pub total_files: usize,
    pub events_files: usize,
    pub summary_files: usize,
    pub total_size_bytes: u64,
    pub latest: Option<SummaryMetrics>,
}

/// Every session summary keyed by the stamp in its file name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogExport {
    pub total_sessions: usize,
    pub sessions: BTreeMap<String, SummaryMetrics>,
}

const SUMMARY_PREFIX: &str = "typing_summary_";

/// Read side of the CSV output directory.
#[derive(Debug, Clone)]
pub struct LogIndex {
    dir: PathBuf,
}

impl LogIndex {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// CSV files newest first.
    pub fn list(&self) -> Result<Vec<LogFileInfo>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };

        let mut files = Vec::new();
        for entry in entries.filter_map(|e| e.ok()) {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !name.ends_with(".csv") {
                continue;
            }
            let meta = entry.metadata().map_err(|e| StoreError::io(&entry.path(), e))?;
            let modified = meta
                .modified()
                .map(DateTime::<Local>::from)
                .unwrap_or_else(|_| Local::now());
            files.push(LogFileInfo {
                kind: LogKind::of(&name),
                name,
                size: meta.len(),
                modified,
            });
        }

        Ok(files
            .into_iter()
            .sorted_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.name.cmp(&a.name)))
            .collect())
    }

    pub fn read(&self, name: &str) -> Result<LogContents, StoreError> {
        check_file_name(name)?;
        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(StoreError::NotFound(name.to_string()));
        }

        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_path(&path)?;
        let headers = rdr.headers()?.iter().map(str::to_string).collect();
        let rows = rdr
            .records()
            .map(|r| r.map(|rec| rec.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, csv::Error>>()?;

        Ok(LogContents { headers, rows })
    }

    pub fn delete(&self, name: &str) -> Result<(), StoreError> {
        check_file_name(name)?;
        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        fs::remove_file(&path).map_err(|e| StoreError::io(&path, e))?;
        info!(file = %path.display(), "log deleted");
        Ok(())
    }

    fn metrics_of(&self, file: &LogFileInfo) -> Result<SummaryMetrics, StoreError> {
        let contents = self.read(&file.name)?;
        let metrics = contents
            .rows
            .into_iter()
            .filter(|row| row.len() >= 2)
            .map(|mut row| {
                let value = row.swap_remove(1);
                (row.swap_remove(0), value)
            })
            .collect();
        Ok(SummaryMetrics {
            name: file.name.clone(),
            modified: file.modified,
            metrics,
        })
    }

    pub fn summary(&self) -> Result<LogSummary, StoreError> {
        let files = self.list()?;
        let count = |kind: LogKind| files.iter().filter(|f| f.kind == kind).count();

        let latest = files
            .iter()
            .find(|f| f.kind == LogKind::Summary)
            .map(|f| self.metrics_of(f))
            .transpose()?;

        Ok(LogSummary {
            total_files: files.len(),
            events_files: count(LogKind::Events),
            summary_files: count(LogKind::Summary),
            total_size_bytes: files.iter().map(|f| f.size).sum(),
            latest,
        })
    }

    pub fn export(&self) -> Result<LogExport, StoreError> {
        let mut sessions = BTreeMap::new();
        for file in self.list()? {
            let Some(stamp) = file
                .name
                .strip_prefix(SUMMARY_PREFIX)
                .and_then(|rest| rest.strip_suffix(".csv"))
            else {
                continue;
            };
            sessions.insert(stamp.to_string(), self.metrics_of(&file)?);
        }

        Ok(LogExport {
            total_sessions: sessions.len(),
            sessions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    fn finished_session() -> (TypingSession, SessionStatistics) {
        let mut s = TypingSession::start("あ", "ab").unwrap();
        s.judge('x', 0).unwrap();
        s.judge('a', 120).unwrap();
        s.apply_backspace(200).unwrap();
        s.judge('a', 260).unwrap();
        s.judge('b', 400).unwrap();
        let stats = s.complete().unwrap();
        (s, stats)
    }

    #[test]
    fn csv_logger_writes_events_and_summary() {
        let dir = tempdir().unwrap();
        let logger = CsvLogger::new(dir.path().join("out"));
        let (session, stats) = finished_session();

        let files = logger.persist(&session, &stats).unwrap();
        assert_eq!(files.refs().len(), 2);

        let index = LogIndex::new(logger.dir());
        let events_name = files.events.unwrap().file_name().unwrap().to_string_lossy().to_string();
        assert!(events_name.starts_with("typing_events_"));

        let events = index.read(&events_name).unwrap();
        assert_eq!(
            events.headers,
            vec!["timestamp_ms", "kind", "expected", "typed", "correct"]
        );
        assert_eq!(events.rows.len(), session.log().len());
        assert_eq!(events.rows[0], vec!["0", "key", "a", "x", "false"]);
        assert_eq!(events.rows[2], vec!["200", "backspace", "a", "", "false"]);

        let summary_name = files.summary.unwrap().file_name().unwrap().to_string_lossy().to_string();
        let summary = index.read(&summary_name).unwrap();
        assert_eq!(summary.headers, vec!["metric", "value"]);
        assert!(summary
            .rows
            .iter()
            .any(|r| r[0] == "status" && r[1] == "Completed"));
        assert!(summary
            .rows
            .iter()
            .any(|r| r[0] == "total_duration_ms" && r[1] == "400"));
    }

    #[test]
    fn log_index_lists_kinds() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("typing_events_1.csv"), "a\n1\n").unwrap();
        fs::write(dir.path().join("typing_summary_1.csv"), "metric,value\n").unwrap();
        fs::write(dir.path().join("misc.csv"), "x\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let files = LogIndex::new(dir.path()).list().unwrap();
        assert_eq!(files.len(), 3);
        let kind_of = |n: &str| files.iter().find(|f| f.name == n).map(|f| f.kind);
        assert_eq!(kind_of("typing_events_1.csv"), Some(LogKind::Events));
        assert_eq!(kind_of("typing_summary_1.csv"), Some(LogKind::Summary));
        assert_eq!(kind_of("misc.csv"), Some(LogKind::Unknown));
    }

    #[test]
    fn log_index_missing_dir_and_file() {
        let dir = tempdir().unwrap();
        let index = LogIndex::new(dir.path().join("none"));
        assert!(index.list().unwrap().is_empty());
        assert_matches!(index.read("x.csv"), Err(StoreError::NotFound(_)));
        assert_matches!(index.read("../x.csv"), Err(StoreError::InvalidName(_)));
    }

    #[test]
    fn log_index_deletes_only_inside_dir() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("typing_events_1.csv"), "a\n1\n").unwrap();
        let index = LogIndex::new(dir.path());

        index.delete("typing_events_1.csv").unwrap();
        assert!(index.list().unwrap().is_empty());
        assert_matches!(
            index.delete("typing_events_1.csv"),
            Err(StoreError::NotFound(_))
        );
        assert_matches!(index.delete("../outside.csv"), Err(StoreError::InvalidName(_)));
    }

    #[test]
    fn log_index_summary_and_export() {
        let dir = tempdir().unwrap();
        let logger = CsvLogger::new(dir.path());
        let (session, stats) = finished_session();
        logger.persist(&session, &stats).unwrap();
        fs::write(
            dir.path().join("typing_summary_20200101_000000_000000.csv"),
            "metric,value\nstatus,Abandoned\n",
        )
        .unwrap();
        fs::write(dir.path().join("misc.csv"), "x\n").unwrap();

        let index = LogIndex::new(dir.path());
        let summary = index.summary().unwrap();
        assert_eq!(summary.total_files, 4);
        assert_eq!(summary.events_files, 1);
        assert_eq!(summary.summary_files, 2);
        let on_disk: u64 = index.list().unwrap().iter().map(|f| f.size).sum();
        assert_eq!(summary.total_size_bytes, on_disk);
        assert!(summary.latest.is_some());

        let export = index.export().unwrap();
        assert_eq!(export.total_sessions, 2);
        let old = &export.sessions["20200101_000000_000000"];
        assert_eq!(old.metrics["status"], "Abandoned");
        let (_, newest) = export
            .sessions
            .iter()
            .find(|(stamp, _)| stamp.as_str() != "20200101_000000_000000")
            .unwrap();
        assert_eq!(newest.metrics["total_duration_ms"], "400");
        assert_eq!(newest.metrics["status"], "Completed");
    }

    #[test]
    fn empty_dir_summary() {
        let dir = tempdir().unwrap();
        let summary = LogIndex::new(dir.path().join("none")).summary().unwrap();
        assert_eq!(summary.total_files, 0);
        assert_eq!(summary.latest, None);
    }

    #[test]
    fn memory_sink_keeps_records() {
        let sink = MemorySink::new();
        let (session, stats) = finished_session();

        let files = sink.persist(&session, &stats).unwrap();
        assert!(files.refs().is_empty());
        assert_eq!(sink.len(), 1);
        let rec = &sink.records()[0];
        assert_eq!(rec.session_id, session.id());
        assert_eq!(rec.events.len(), 5);
        assert_eq!(rec.statistics, stats);
    }
}
