//! Artifact storage between pipeline stages.
//!
//! Each stage writes its output in full through an [`ArtifactStore`]
//! handle and the next stage reads it back in full. Writes go to a
//! temporary file in the same directory and are renamed into place, so a
//! reader never observes a half-written artifact.

use crate::error::{PipelineError, Result};
use crate::models::{IdentifierList, ItemRecord, ItemTable, WordFrequencyMap};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

const IDS_FILE: &str = "topstory_ids.json";
const TABLE_FILE: &str = "topstories.csv";
const WORDS_FILE: &str = "most_frequent_words.json";
const CHART_FILE: &str = "most_frequent_words.svg";
const SUMMARY_FILE: &str = "run_summary.md";
const LOCK_FILE: &str = ".pipeline.lock";

/// The artifacts a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Ids,
    Table,
    Words,
    Chart,
    Summary,
}

impl Artifact {
    pub fn file_name(&self) -> &'static str {
        match self {
            Artifact::Ids => IDS_FILE,
            Artifact::Table => TABLE_FILE,
            Artifact::Words => WORDS_FILE,
            Artifact::Chart => CHART_FILE,
            Artifact::Summary => SUMMARY_FILE,
        }
    }
}

/// Directory-backed handle to one run's artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Store writing directly into `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { dir: root.into() }
    }

    /// Store isolated under `root/runs/<run_id>`.
    pub fn run_scoped(root: impl AsRef<Path>, run_id: &str) -> Self {
        Self {
            dir: root.as_ref().join("runs").join(run_id),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, artifact: Artifact) -> PathBuf {
        self.dir.join(artifact.file_name())
    }

    /// Take the single-writer lock for this store.
    ///
    /// A lock left behind by a process that no longer exists is taken
    /// over. Fails with [`PipelineError::Locked`] while a live run holds it.
    pub fn lock(&self) -> Result<RunLock> {
        fs::create_dir_all(&self.dir)?;
        let path = self.lock_path();

        match create_lock_file(&path) {
            Err(PipelineError::Locked { path }) if lock_is_stale(&path) => {
                warn!("Removing stale run lock {}", path.display());
                remove_if_exists(&path)?;
                create_lock_file(&path)
            }
            other => other,
        }
    }

    /// Remove the run lock regardless of who holds it.
    ///
    /// Returns whether a lock file was present.
    pub fn force_unlock(&self) -> Result<bool> {
        let path = self.lock_path();
        let existed = path.exists();
        remove_if_exists(&path)?;
        if existed {
            warn!("Forcibly removed run lock {}", path.display());
        }
        Ok(existed)
    }

    fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE)
    }

    pub fn write_ids(&self, ids: &IdentifierList) -> Result<PathBuf> {
        self.write_json(Artifact::Ids, ids)
    }

    pub fn read_ids(&self) -> Result<IdentifierList> {
        self.read_json(Artifact::Ids)
    }

    pub fn write_words(&self, words: &WordFrequencyMap) -> Result<PathBuf> {
        self.write_json(Artifact::Words, words)
    }

    #[cfg(test)]
    pub fn read_words(&self) -> Result<WordFrequencyMap> {
        self.read_json(Artifact::Words)
    }

    pub fn write_chart(&self, svg: &str) -> Result<PathBuf> {
        self.write_bytes(Artifact::Chart, svg.as_bytes())
    }

    pub fn write_summary(&self, markdown: &str) -> Result<PathBuf> {
        self.write_bytes(Artifact::Summary, markdown.as_bytes())
    }

    /// Persist the table as CSV: header row of all columns, one row per item.
    pub fn write_table(&self, table: &ItemTable) -> Result<PathBuf> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        if !table.columns().is_empty() {
            writer.write_record(table.columns())?;
        }
        for row in table.rows() {
            writer.write_record(table.columns().iter().map(|c| cell_text(row.get(c))))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| PipelineError::Io(e.into_error()))?;
        self.write_bytes(Artifact::Table, &bytes)
    }

    /// Read the table back. Non-empty cells become string values;
    /// empty cells are treated as absent fields.
    pub fn read_table(&self) -> Result<ItemTable> {
        let path = self.path(Artifact::Table);
        let bytes = self.read_bytes(&path)?;

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(bytes.as_slice());
        let headers = reader.headers()?.clone();

        let mut table = ItemTable::new();
        for record in reader.records() {
            let record = record?;
            let row: ItemRecord = headers
                .iter()
                .zip(record.iter())
                .filter(|(_, cell)| !cell.is_empty())
                .map(|(name, cell)| (name.to_string(), Value::String(cell.to_string())))
                .collect();
            table.push(row);
        }

        Ok(table)
    }

    fn write_json<T: Serialize + ?Sized>(&self, artifact: Artifact, value: &T) -> Result<PathBuf> {
        let bytes = serde_json::to_vec(value)?;
        self.write_bytes(artifact, &bytes)
    }

    fn read_json<T: DeserializeOwned>(&self, artifact: Artifact) -> Result<T> {
        let path = self.path(artifact);
        let bytes = self.read_bytes(&path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| {
            warn!("Cannot read {}: {}", path.display(), e);
            PipelineError::MissingArtifact {
                path: path.to_path_buf(),
            }
        })
    }

    fn write_bytes(&self, artifact: Artifact, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(artifact);

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        tmp.persist(&path).map_err(|e| PipelineError::Io(e.error))?;

        debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }
}

fn create_lock_file(path: &Path) -> Result<RunLock> {
    match OpenOptions::new().create_new(true).write(true).open(path) {
        Ok(mut file) => {
            writeln!(file, "{}", std::process::id())?;
            debug!("Acquired run lock {}", path.display());
            Ok(RunLock {
                path: path.to_path_buf(),
            })
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(PipelineError::Locked {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(e.into()),
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// A lock is stale when it names a process that is no longer running.
/// Unreadable or foreign content is treated as held.
fn lock_is_stale(path: &Path) -> bool {
    let Ok(content) = fs::read_to_string(path) else {
        return false;
    };
    match content.trim().parse::<u32>() {
        Ok(pid) if pid != std::process::id() => !process_alive(pid),
        _ => false,
    }
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

// No portable liveness check elsewhere; use --force-unlock.
#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    true
}

/// CSV cell text for an optional JSON value.
fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Held for the duration of a run; removes the lock file on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to release run lock {}: {}", self.path.display(), e);
        }
    }
}
