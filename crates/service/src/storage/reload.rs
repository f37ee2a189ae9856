//! Demo data loading from newline-delimited JSON.
//!
//! One JSON object per line; blank lines are skipped. Any `_id` in the file
//! is discarded so the backend assigns fresh identifiers.

use std::future::Future;
use std::path::{Path, PathBuf};

use models::{Document, Value, ID_FIELD};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tracing::{error, info};

use crate::errors::StorageError;

pub struct NdjsonReader {
    lines: Lines<BufReader<File>>,
    path: PathBuf,
    line_no: usize,
}

impl NdjsonReader {
    pub async fn open(path: &Path) -> Result<Self, StorageError> {
        let file = File::open(path)
            .await
            .map_err(|e| StorageError::Reload(format!("cannot open {}: {e}", path.display())))?;
        Ok(Self { lines: BufReader::new(file).lines(), path: path.to_path_buf(), line_no: 0 })
    }

    /// Next record from the file, or `None` at end of file.
    pub async fn next_document(&mut self) -> Result<Option<Document>, StorageError> {
        loop {
            let line = self
                .lines
                .next_line()
                .await
                .map_err(|e| self.error(format!("read error: {e}")))?;
            let Some(line) = line else { return Ok(None) };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let parsed: serde_json::Value =
                serde_json::from_str(&line).map_err(|e| self.error(format!("invalid JSON: {e}")))?;
            let serde_json::Value::Object(mut obj) = parsed else {
                return Err(self.error("expected a JSON object".to_string()));
            };
            obj.remove(ID_FIELD);
            let doc = obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect();
            return Ok(Some(doc));
        }
    }

    fn error(&self, msg: String) -> StorageError {
        StorageError::Reload(format!("{}:{}: {msg}", self.path.display(), self.line_no))
    }
}

/// Stream every record in `path` into `insert`, stopping at the first failure.
///
/// Failures are logged, not returned: records inserted before the failure
/// stay in the store. Returns how many records were inserted.
pub async fn load_into<F, Fut>(path: &Path, mut insert: F) -> u64
where
    F: FnMut(Document) -> Fut,
    Fut: Future<Output = Result<(), StorageError>>,
{
    let mut reader = match NdjsonReader::open(path).await {
        Ok(r) => r,
        Err(e) => {
            error!(path = %path.display(), error = %e, "unable to load demo data file");
            return 0;
        }
    };
    let mut loaded = 0u64;
    loop {
        let doc = match reader.next_document().await {
            Ok(Some(doc)) => doc,
            Ok(None) => break,
            Err(e) => {
                error!(path = %path.display(), loaded, error = %e, "demo data load stopped");
                return loaded;
            }
        };
        if let Err(e) = insert(doc).await {
            error!(path = %path.display(), loaded, error = %e, "demo data insert failed");
            return loaded;
        }
        loaded += 1;
    }
    info!(path = %path.display(), loaded, "loaded demo data");
    loaded
}
