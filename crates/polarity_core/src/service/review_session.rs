//! Review session use-case service.
//!
//! # Responsibility
//! - Load a store from its baseline snapshot and audit log.
//! - Run reviewer edits against the store and append each one to the log.
//!
//! # Invariants
//! - The audit log is append-only once bootstrapped; lines written by earlier
//!   sessions are never rewritten.
//! - Every successful edit, undo or redo appends exactly one entry: the
//!   forward entry for edits and redos, the inverse entry for undos.
//! - Replaying the snapshot plus the whole log yields the live record set.
//! - A session is the single writer of its files.

use crate::codec::audit::{apply_audit_log, write_entries};
use crate::codec::snapshot::{read_raw_tensors, write_raw_tensors};
use crate::codec::{CodecError, CodecResult};
use crate::model::detection::Detection;
use crate::model::entry::AuditEntry;
use crate::model::tensor::{CellId, Point, TensorId};
use crate::store::tensor_store::{HistoryStep, TensorStore};
use crate::store::StoreError;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;

/// Default baseline snapshot file name inside a review directory.
pub const SNAPSHOT_FILE_NAME: &str = "raw_tensors.txt";
/// Default audit log file name inside a review directory.
pub const AUDIT_LOG_FILE_NAME: &str = "audit_log.txt";

pub type SessionResult<T> = Result<T, SessionError>;

/// File locations for one review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub snapshot_path: PathBuf,
    pub audit_log_path: PathBuf,
}

impl SessionConfig {
    pub fn new(snapshot_path: impl Into<PathBuf>, audit_log_path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
            audit_log_path: audit_log_path.into(),
        }
    }

    /// Uses the default file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(SNAPSHOT_FILE_NAME), dir.join(AUDIT_LOG_FILE_NAME))
    }
}

/// Errors from review session operations.
#[derive(Debug)]
pub enum SessionError {
    /// Edit referenced an unknown id.
    Store(StoreError),
    /// Snapshot or audit log could not be read or written.
    Codec(CodecError),
    /// File could not be opened or replaced.
    Io(std::io::Error),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Codec(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Codec(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<CodecError> for SessionError {
    fn from(value: CodecError) -> Self {
        Self::Codec(value)
    }
}

impl From<std::io::Error> for SessionError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// A store bound to its snapshot and audit log files.
#[derive(Debug)]
pub struct ReviewSession {
    config: SessionConfig,
    store: TensorStore,
    pending: Vec<AuditEntry>,
}

impl ReviewSession {
    /// Reconstructs the store from the snapshot and, when present, the log.
    ///
    /// A missing audit log means no edits were made yet. Edits from earlier
    /// sessions are part of the records but not of the undo history.
    pub fn open(config: SessionConfig) -> SessionResult<Self> {
        let started_at = Instant::now();
        info!("event=session_open module=service status=start");

        match load_store(&config) {
            Ok((store, replayed)) => {
                info!(
                    "event=session_open module=service status=ok duration_ms={} tensors={} replayed={}",
                    started_at.elapsed().as_millis(),
                    store.len(),
                    replayed
                );
                Ok(Self::with_store(config, store))
            }
            Err(err) => {
                error!(
                    "event=session_open module=service status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Starts a review from segmentation output.
    ///
    /// Writes the baseline snapshot and an empty audit log, replacing any
    /// previous review in the same files.
    pub fn bootstrap<I>(config: SessionConfig, detections: I) -> SessionResult<Self>
    where
        I: IntoIterator<Item = Detection>,
    {
        let store = TensorStore::from_detections(detections);
        replace_file(&config.snapshot_path, |writer| {
            write_raw_tensors(&store, writer)
        })?;
        replace_file(&config.audit_log_path, |_| Ok(0))?;
        info!(
            "event=session_bootstrap module=service status=ok tensors={}",
            store.len()
        );
        Ok(Self::with_store(config, store))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &TensorStore {
        &self.store
    }

    /// Entries recorded in memory but not yet appended to the log.
    pub fn pending(&self) -> &[AuditEntry] {
        &self.pending
    }

    /// Adds a manual tensor and appends its `create` entry.
    pub fn add(
        &mut self,
        cell_id: CellId,
        centroid: Point,
        marker: Point,
    ) -> SessionResult<TensorId> {
        let id = self.store.add(cell_id, centroid, marker)?;
        self.record_last()?;
        Ok(id)
    }

    pub fn deactivate(&mut self, id: TensorId) -> SessionResult<()> {
        self.store.deactivate(id)?;
        self.record_last()
    }

    pub fn update_centroid(&mut self, id: TensorId, position: Point) -> SessionResult<()> {
        self.store.update_centroid(id, position)?;
        self.record_last()
    }

    pub fn update_marker(&mut self, id: TensorId, position: Point) -> SessionResult<()> {
        self.store.update_marker(id, position)?;
        self.record_last()
    }

    /// Undoes one edit and appends the inverse entry.
    ///
    /// Nothing is written when there is nothing to undo.
    pub fn undo(&mut self) -> SessionResult<Option<HistoryStep>> {
        let step = self.store.undo()?;
        self.record_step(step.as_ref())?;
        Ok(step)
    }

    /// Redoes one edit and appends the re-derived forward entry.
    ///
    /// Nothing is written when the cursor is already at the head.
    pub fn redo(&mut self) -> SessionResult<Option<HistoryStep>> {
        let step = self.store.redo()?;
        self.record_step(step.as_ref())?;
        Ok(step)
    }

    /// Appends pending entries to the audit log and syncs it.
    ///
    /// Entries stay pending when the write fails, so calling `flush` again
    /// retries them. Returns the number of entries appended.
    pub fn flush(&mut self) -> SessionResult<usize> {
        if self.pending.is_empty() {
            return Ok(0);
        }
        let written = append_entries(&self.config.audit_log_path, &self.pending).inspect_err(
            |err| {
                error!(
                    "event=audit_flush module=service status=error pending={} error={err}",
                    self.pending.len()
                );
            },
        )?;
        self.pending.clear();
        info!(
            "event=audit_flush module=service status=ok entries={} cursor={}",
            written,
            self.store.cursor()
        );
        Ok(written)
    }

    fn with_store(config: SessionConfig, store: TensorStore) -> Self {
        Self {
            config,
            store,
            pending: Vec::new(),
        }
    }

    fn record_last(&mut self) -> SessionResult<()> {
        if let Some(entry) = self.store.last_entry() {
            self.pending.push(entry.clone());
        }
        self.flush()?;
        Ok(())
    }

    fn record_step(&mut self, step: Option<&HistoryStep>) -> SessionResult<()> {
        if let Some(step) = step {
            self.pending.push(step.entry.clone());
            self.flush()?;
        }
        Ok(())
    }
}

fn load_store(config: &SessionConfig) -> SessionResult<(TensorStore, usize)> {
    let snapshot = File::open(&config.snapshot_path)?;
    let mut store = read_raw_tensors(BufReader::new(snapshot))?;

    let replayed = match File::open(&config.audit_log_path) {
        Ok(log) => apply_audit_log(&mut store, BufReader::new(log))?,
        Err(err) if err.kind() == ErrorKind::NotFound => 0,
        Err(err) => return Err(err.into()),
    };
    Ok((store, replayed))
}

fn append_entries(path: &Path, entries: &[AuditEntry]) -> SessionResult<usize> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let written = write_entries(entries, BufWriter::new(&mut file))?;
    file.sync_data()?;
    Ok(written)
}

/// Writes a whole file through a temporary sibling, then renames it over
/// `path`, so readers see either the old or the new content.
///
/// Returns whatever `write` reports as written.
pub fn replace_file<F>(path: &Path, write: F) -> SessionResult<usize>
where
    F: FnOnce(&mut BufWriter<&mut File>) -> CodecResult<usize>,
{
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    let written = {
        let mut writer = BufWriter::new(temp.as_file_mut());
        write(&mut writer)?
    };
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| SessionError::Io(err.error))?;
    Ok(written)
}
