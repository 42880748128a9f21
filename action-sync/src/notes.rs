//! Meeting-note corpus for a trailing window of days.
//!
//! Notes are exported files whose names begin with the meeting date
//! (`2026-03-04 Weekly planning.md`). A run reads every file dated today or
//! within `lookback_days` before it. The file name tags each document with
//! its meeting when rendered.

use crate::config::NotesConfig;
use crate::error::{SyncError, SyncResult};
use chrono::{Days, NaiveDate};
use std::path::{Path, PathBuf};
use tracing::debug;

const DATE_PREFIX_LEN: usize = "YYYY-MM-DD".len();
const DOCUMENT_SEPARATOR: &str = "\n\n---\n\n";

pub trait NoteSource: Send + Sync {
    /// Notes dated within `lookback_days` of `today`. Empty is not an error.
    fn load(&self, today: NaiveDate, lookback_days: u32) -> SyncResult<NoteCorpus>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDocument {
    pub file_name: String,
    pub body: String
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteCorpus {
    pub documents: Vec<NoteDocument>
}

impl NoteCorpus {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Concatenated text, each document headed by its file name.
    pub fn render(&self) -> String {
        self.documents
            .iter()
            .map(|doc| format!("## {}\n\n{}", doc.file_name, doc.body))
            .collect::<Vec<_>>()
            .join(DOCUMENT_SEPARATOR)
    }
}

/// Earliest date in the window. Clamps to the calendar's start.
pub fn window_start(today: NaiveDate, lookback_days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(lookback_days)))
        .unwrap_or(NaiveDate::MIN)
}

/// Date encoded in a file name's `YYYY-MM-DD` prefix.
pub fn file_date(file_name: &str) -> Option<NaiveDate> {
    let prefix = file_name.get(..DATE_PREFIX_LEN)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

pub struct DirectoryNoteSource {
    directory: PathBuf,
    extension: String
}

impl DirectoryNoteSource {
    pub fn new(directory: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            extension: extension.into().trim_start_matches('.').to_string()
        }
    }

    pub fn from_config(config: &NotesConfig) -> Self {
        Self::new(config.directory.clone(), config.extension.clone())
    }

    fn unavailable(&self, source: std::io::Error) -> SyncError {
        SyncError::NotesUnavailable {
            path: self.directory.display().to_string(),
            source
        }
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
    }
}

impl NoteSource for DirectoryNoteSource {
    fn load(&self, today: NaiveDate, lookback_days: u32) -> SyncResult<NoteCorpus> {
        let earliest = window_start(today, lookback_days);

        let mut matches = Vec::new();
        for entry in std::fs::read_dir(&self.directory).map_err(|e| self.unavailable(e))? {
            let entry = entry.map_err(|e| self.unavailable(e))?;
            let path = entry.path();
            if !path.is_file() || !self.has_extension(&path) {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if file_date(file_name).is_some_and(|date| date >= earliest && date <= today) {
                matches.push((file_name.to_string(), path.clone()));
            }
        }
        matches.sort_by(|a, b| a.0.cmp(&b.0));

        let mut documents = Vec::with_capacity(matches.len());
        for (file_name, path) in matches {
            let bytes = std::fs::read(&path).map_err(|e| self.unavailable(e))?;
            debug!(file = %file_name, bytes = bytes.len(), "Loaded meeting note");
            documents.push(NoteDocument {
                file_name,
                body: String::from_utf8_lossy(&bytes).into_owned()
            });
        }

        Ok(NoteCorpus { documents })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_window_start() {
        let today = date(2026, 3, 1);
        assert_eq!(window_start(today, 0), today);
        assert_eq!(window_start(today, 2), date(2026, 2, 27));
        assert_eq!(window_start(today, u32::MAX), NaiveDate::MIN);
    }

    #[test]
    fn test_file_date() {
        assert_eq!(file_date("2026-03-04 Weekly planning.md"), Some(date(2026, 3, 4)));
        assert_eq!(file_date("2026-03-04.md"), Some(date(2026, 3, 4)));
        assert_eq!(file_date("2026-02-30 Bad day.md"), None);
        assert_eq!(file_date("README.md"), None);
        assert_eq!(file_date("é"), None);
    }

    #[test]
    fn test_loads_window_in_filename_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("2026-03-04 Standup.md"), "Ship the release").unwrap();
        fs::write(dir.path().join("2026-03-03 Client call.md"), "Send proposal").unwrap();
        fs::write(dir.path().join("2026-03-01 Old meeting.md"), "Ancient history").unwrap();
        fs::write(dir.path().join("2026-03-04 Standup.txt"), "Wrong extension").unwrap();
        fs::write(dir.path().join("README.md"), "No date").unwrap();

        let source = DirectoryNoteSource::new(dir.path(), "md");
        let corpus = source.load(date(2026, 3, 4), 1).unwrap();

        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.documents[0].file_name, "2026-03-03 Client call.md");
        assert_eq!(corpus.documents[1].file_name, "2026-03-04 Standup.md");

        assert_eq!(
            corpus.render(),
            "## 2026-03-03 Client call.md\n\nSend proposal\n\n---\n\n## 2026-03-04 Standup.md\n\nShip the release"
        );
    }

    #[test]
    fn test_empty_window_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("2025-12-31 Retro.md"), "notes").unwrap();

        let corpus = DirectoryNoteSource::new(dir.path(), ".md")
            .load(date(2026, 3, 4), 1)
            .unwrap();

        assert!(corpus.is_empty());
        assert_eq!(corpus.render(), "");
    }

    #[test]
    fn test_huge_lookback_reads_everything_dated() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("1999-12-31 Millennium.md"), "old").unwrap();
        fs::write(dir.path().join("2026-03-04 Standup.md"), "new").unwrap();
        fs::write(dir.path().join("2026-03-05 Tomorrow.md"), "future").unwrap();

        let corpus = DirectoryNoteSource::new(dir.path(), "md")
            .load(date(2026, 3, 4), u32::MAX)
            .unwrap();

        let names: Vec<&str> = corpus.documents.iter().map(|d| d.file_name.as_str()).collect();
        assert_eq!(names, vec!["1999-12-31 Millennium.md", "2026-03-04 Standup.md"]);
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectoryNoteSource::new(dir.path().join("missing"), "md");

        let result = source.load(date(2026, 3, 4), 1);
        assert!(matches!(result, Err(SyncError::NotesUnavailable { .. })));
    }
}
