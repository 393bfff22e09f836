//! Loading the personal record from disk.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{RagError, Result};
use crate::record::PersonalRecord;

/// Default file name of the JSON record.
pub const DEFAULT_RECORD_FILE: &str = "personal_data.json";

/// A source of the personal record.
///
/// `load` never fails: sources fall back to [`PersonalRecord::default`] so the
/// rest of the pipeline always receives a complete record.
pub trait RecordSource: Send + Sync {
    fn load(&self) -> PersonalRecord;
}

/// A fixed in-memory record.
impl RecordSource for PersonalRecord {
    fn load(&self) -> PersonalRecord {
        self.clone()
    }
}

/// Reads the record from a JSON file.
///
/// # Example
///
/// ```rust,ignore
/// use persona_rag::JsonRecordLoader;
///
/// let loader = JsonRecordLoader::new("personal_data.json");
/// let record = loader.load();
/// ```
#[derive(Debug, Clone)]
pub struct JsonRecordLoader {
    path: PathBuf,
}

impl JsonRecordLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record, distinguishing a missing file from a broken one.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::MalformedRecord`] if the file exists but cannot be
    /// read or is not valid record JSON.
    pub fn try_load(&self) -> Result<Option<PersonalRecord>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(RagError::MalformedRecord {
                    path: self.path.clone(),
                    message: e.to_string(),
                });
            }
        };

        let record = serde_json::from_str(&content).map_err(|e| RagError::MalformedRecord {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        Ok(Some(record))
    }
}

impl RecordSource for JsonRecordLoader {
    fn load(&self) -> PersonalRecord {
        match self.try_load() {
            Ok(Some(record)) => {
                debug!(path = %self.path.display(), "loaded personal record");
                record
            }
            Ok(None) => {
                warn!(path = %self.path.display(), "record file not found, using default record");
                PersonalRecord::default()
            }
            Err(e) => {
                warn!(error = %e, "unreadable record, using default record");
                PersonalRecord::default()
            }
        }
    }
}

/// Read the record on the blocking thread pool.
///
/// # Errors
///
/// Returns [`RagError::TaskFailed`] if the load panicked.
pub async fn load_in_background(source: Arc<dyn RecordSource>) -> Result<PersonalRecord> {
    tokio::task::spawn_blocking(move || source.load())
        .await
        .map_err(|e| RagError::TaskFailed(format!("record load: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_default_record() {
        let temp = tempfile::tempdir().unwrap();
        let loader = JsonRecordLoader::new(temp.path().join("absent.json"));
        assert!(loader.try_load().unwrap().is_none());
        assert_eq!(loader.load(), PersonalRecord::default());
    }

    #[test]
    fn reads_record_from_json_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join(DEFAULT_RECORD_FILE);
        fs::write(&path, r#"{"basic":{"name":"Ada","title":"Engineer"},"interests":["Chess"]}"#)
            .unwrap();

        let record = JsonRecordLoader::new(&path).load();
        assert_eq!(record.basic.name, "Ada");
        assert_eq!(record.interests, vec!["Chess"]);
    }

    #[test]
    fn malformed_file_is_reported_by_try_load_and_defaulted_by_load() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let loader = JsonRecordLoader::new(&path);
        assert!(matches!(loader.try_load(), Err(RagError::MalformedRecord { .. })));
        assert_eq!(loader.load(), PersonalRecord::default());
    }

    struct SlowSource;

    impl RecordSource for SlowSource {
        fn load(&self) -> PersonalRecord {
            std::thread::sleep(std::time::Duration::from_millis(200));
            PersonalRecord::default()
        }
    }

    #[tokio::test]
    async fn slow_sources_do_not_stall_the_runtime() {
        let ticker = tokio::spawn(async {
            for _ in 0..5 {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        });
        let record = load_in_background(Arc::new(SlowSource)).await.unwrap();
        assert_eq!(record, PersonalRecord::default());
        assert!(ticker.is_finished());
    }

    struct BrokenSource;

    impl RecordSource for BrokenSource {
        fn load(&self) -> PersonalRecord {
            panic!("disk gone")
        }
    }

    #[tokio::test]
    async fn panicking_source_is_reported() {
        let err = load_in_background(Arc::new(BrokenSource)).await.unwrap_err();
        assert!(matches!(err, RagError::TaskFailed(ref m) if m.starts_with("record load")));
        assert!(!err.is_retryable());
    }
}
