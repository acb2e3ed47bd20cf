//! Experiment snapshot persistence.
//!
//! A snapshot is the full ordered list of Run Results of one batch, written
//! once as a pretty JSON array to
//! `<dir>/experiment_results_<YYYYMMDD_HHMMSS>.json`, with a companion
//! `.digest` file holding the SHA-256 of the JSON bytes for integrity checks.
//!
//! Snapshots are never overwritten: a second batch finishing within the same
//! second gets a `_<n>` suffix. Both files land via temp file + rename; a
//! snapshot whose digest cannot be written is removed again.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::domain::{BenchError, Result, RunResult};

const PREFIX: &str = "experiment_results_";
const EXTENSION: &str = "json";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Location and creation time of one snapshot on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRef {
    /// File name, e.g. `experiment_results_20260101_120000.json`.
    pub name: String,
    pub path: PathBuf,
    /// Capture time encoded in the name (second precision).
    pub created_at: DateTime<Utc>,
    /// Collision suffix; `0` when the name carries none.
    pub sequence: u32,
}

impl SnapshotRef {
    /// Parse a snapshot file name; `None` for unrelated files.
    fn parse(path: PathBuf) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_string();
        let stem = name
            .strip_prefix(PREFIX)?
            .strip_suffix(&format!(".{}", EXTENSION))?;

        // "YYYYMMDD_HHMMSS" is 15 chars; anything after is "_<n>".
        if stem.len() < 15 {
            return None;
        }
        let (ts, rest) = stem.split_at(15);
        let naive = NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT).ok()?;
        let sequence = match rest {
            "" => 0,
            _ => rest.strip_prefix('_')?.parse().ok()?,
        };

        Some(Self {
            name,
            path,
            created_at: Utc.from_utc_datetime(&naive),
            sequence,
        })
    }

    fn digest_path(&self) -> PathBuf {
        digest_path_for(&self.path)
    }
}

/// Result of persisting a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSnapshot {
    pub snapshot: SnapshotRef,
    /// SHA-256 hex digest of the JSON bytes written.
    pub digest: String,
    pub runs: usize,
}

/// Directory-backed snapshot store. The directory is fixed at construction.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist `results` as a new snapshot named after the current time.
    pub fn write(&self, results: &[RunResult]) -> Result<PersistedSnapshot> {
        self.write_at(results, Utc::now())
    }

    /// Persist `results` as a new snapshot named after `captured_at`.
    pub fn write_at(
        &self,
        results: &[RunResult],
        captured_at: DateTime<Utc>,
    ) -> Result<PersistedSnapshot> {
        fs::create_dir_all(&self.dir)?;

        let json = serde_json::to_vec_pretty(results)?;
        let digest = sha256_hex(&json);
        let stamp = captured_at.format(TIMESTAMP_FORMAT).to_string();

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&json)?;
        tmp.flush()?;

        let mut sequence = 0u32;
        let path = loop {
            let name = match sequence {
                0 => format!("{}{}.{}", PREFIX, stamp, EXTENSION),
                n => format!("{}{}_{}.{}", PREFIX, stamp, n, EXTENSION),
            };
            let candidate = self.dir.join(name);
            match tmp.persist_noclobber(&candidate) {
                Ok(_) => break candidate,
                Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                    tmp = e.file;
                    sequence += 1;
                }
                Err(e) => return Err(BenchError::Io(e.error)),
            }
        };

        if let Err(e) = self.write_digest(&path, &digest) {
            if let Err(cleanup) = fs::remove_file(&path) {
                tracing::warn!(
                    path = %path.display(),
                    error = %cleanup,
                    "orphan snapshot left behind"
                );
            }
            return Err(e);
        }

        let snapshot = SnapshotRef::parse(path.clone())
            .ok_or_else(|| BenchError::Config(format!("unparseable snapshot name {:?}", path)))?;

        crate::metrics::METRICS.inc_snapshots();
        crate::obs::emit_snapshot_written(&path.display().to_string(), results.len(), &digest);

        Ok(PersistedSnapshot {
            snapshot,
            digest,
            runs: results.len(),
        })
    }

    fn write_digest(&self, snapshot: &Path, digest: &str) -> Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(digest.as_bytes())?;
        tmp.flush()?;
        tmp.persist(digest_path_for(snapshot))
            .map_err(|e| BenchError::Io(e.error))?;
        Ok(())
    }

    /// All snapshots in the directory, newest first. A missing directory
    /// simply has no snapshots.
    pub fn list(&self) -> Result<Vec<SnapshotRef>> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BenchError::Io(e)),
        };

        let mut snapshots = Vec::new();
        for entry in read_dir {
            let entry = entry?;
            if let Some(snapshot) = SnapshotRef::parse(entry.path()) {
                snapshots.push(snapshot);
            }
        }
        snapshots.sort_by(|a, b| {
            (b.created_at, b.sequence).cmp(&(a.created_at, a.sequence))
        });
        Ok(snapshots)
    }

    /// Newest snapshot, if any.
    pub fn latest(&self) -> Result<Option<SnapshotRef>> {
        Ok(self.list()?.into_iter().next())
    }

    /// Read `path`, or the newest snapshot when `path` is `None`.
    pub fn load(&self, path: Option<&Path>) -> Result<(PathBuf, Vec<RunResult>)> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => self
                .latest()?
                .map(|s| s.path)
                .ok_or_else(|| BenchError::NoSnapshots(self.dir.clone()))?,
        };
        let results = read_snapshot(&path)?;
        Ok((path, results))
    }

    /// Digest recorded next to a snapshot, if the companion file exists.
    pub fn recorded_digest(&self, snapshot: &SnapshotRef) -> Result<Option<String>> {
        read_digest(&snapshot.digest_path())
    }
}

/// Read and validate a snapshot file.
///
/// When a companion `.digest` file exists the content digest is verified
/// first (`BenchError::DigestMismatch`). Every row is then checked against
/// the Run Result invariants.
pub fn read_snapshot(path: &Path) -> Result<Vec<RunResult>> {
    let bytes = fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            BenchError::SnapshotNotFound(path.to_path_buf())
        } else {
            BenchError::Io(e)
        }
    })?;

    if let Some(expected) = read_digest(&digest_path_for(path))? {
        let actual = sha256_hex(&bytes);
        if actual != expected {
            return Err(BenchError::DigestMismatch { expected, actual });
        }
    }

    let results: Vec<RunResult> = serde_json::from_slice(&bytes)?;
    for result in &results {
        result.validate()?;
    }
    Ok(results)
}

fn read_digest(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(Some(s.trim().to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(BenchError::Io(e)),
    }
}

fn digest_path_for(path: &Path) -> PathBuf {
    path.with_extension("digest")
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
