//! Append-only JSON-lines event store.
//!
//! One record per line. A batch is written with a single `write_all`
//! followed by `sync_data`, so a crash leaves at most one torn trailing
//! line. Scans skip it, and the next write starts on a fresh line so the
//! fragment never swallows an acknowledged record.

use async_trait::async_trait;
use engine_core::{Error, EventRecord, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use telemetry::metrics;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::store::{EventFilter, EventStore};

pub struct FileEventStore {
    path: PathBuf,
    /// Writers take this exclusively; scans share it so they never observe
    /// a half-written batch.
    log: RwLock<LogFile>,
    max_id: AtomicU64,
}

struct LogFile {
    file: File,
    /// Set while a write is in flight and left set if it fails or is
    /// dropped, since the tail may then end mid-line.
    tail_unterminated: bool,
}

impl FileEventStore {
    /// Opens (or creates) the log at `path` and finds the highest stored id.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| unavailable(&path, "create directory", e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| unavailable(&path, "open", e))?;

        let contents = read_log(&path).await?;
        if contents.last().is_some_and(|b| *b != b'\n') {
            warn!(path = %path.display(), "Terminating torn trailing record");
            write_durably(&mut file, b"\n")
                .await
                .map_err(|e| unavailable(&path, "terminate tail", e))?;
        }

        let existing = parse_records(&path, &contents);
        let max_id = existing.iter().map(|r| r.id).max().unwrap_or(0);

        info!(
            path = %path.display(),
            records = existing.len(),
            max_id,
            "Opened file event store"
        );

        Ok(Self {
            path,
            log: RwLock::new(LogFile {
                file,
                tail_unterminated: false,
            }),
            max_id: AtomicU64::new(max_id),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl EventStore for FileEventStore {
    async fn append_batch(&self, records: &[EventRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut buf = Vec::with_capacity(records.len() * 512 + 1);
        for record in records {
            serde_json::to_writer(&mut buf, record)?;
            buf.push(b'\n');
        }

        let mut log = self.log.write().await;
        if log.tail_unterminated {
            // an empty line is harmless if the earlier write did complete
            buf.insert(0, b'\n');
        }

        log.tail_unterminated = true;
        if let Err(e) = write_durably(&mut log.file, &buf).await {
            error!(path = %self.path.display(), error = %e, "Event store append failed");
            return Err(unavailable(&self.path, "append", e));
        }
        log.tail_unterminated = false;

        if let Some(max) = records.iter().map(|r| r.id).max() {
            self.max_id.fetch_max(max, Ordering::SeqCst);
        }
        debug!(count = records.len(), "Appended records");
        Ok(())
    }

    async fn scan(&self, filter: &EventFilter) -> Result<Vec<EventRecord>> {
        let _guard = self.log.read().await;
        let records = parse_records(&self.path, &read_log(&self.path).await?);
        Ok(records.into_iter().filter(|r| filter.matches(r)).collect())
    }

    async fn max_id(&self) -> Result<u64> {
        Ok(self.max_id.load(Ordering::SeqCst))
    }

    async fn ping(&self) -> Result<()> {
        fs::metadata(&self.path)
            .await
            .map(|_| ())
            .map_err(|e| unavailable(&self.path, "stat", e))
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}

async fn write_durably(file: &mut File, buf: &[u8]) -> std::io::Result<()> {
    file.write_all(buf).await?;
    file.flush().await?;
    file.sync_data().await
}

/// Raw log bytes; a missing file is an empty log.
async fn read_log(path: &Path) -> Result<Vec<u8>> {
    match fs::read(path).await {
        Ok(contents) => Ok(contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(unavailable(path, "read", e)),
    }
}

/// Parses every readable record. Corrupt lines, including ones that are not
/// valid UTF-8, are logged and skipped.
fn parse_records(path: &Path, contents: &[u8]) -> Vec<EventRecord> {
    let mut records = Vec::new();
    for (idx, line) in contents.split(|b| *b == b'\n').enumerate() {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice::<EventRecord>(line) {
            Ok(record) => records.push(record),
            Err(e) => {
                metrics().corrupt_records_skipped.inc();
                warn!(
                    path = %path.display(),
                    line = idx + 1,
                    error = %e,
                    "Skipping corrupt stored record"
                );
            }
        }
    }
    records
}

fn unavailable(path: &Path, op: &str, e: std::io::Error) -> Error {
    Error::store_unavailable(format!("{} {}: {}", op, path.display(), e))
}
