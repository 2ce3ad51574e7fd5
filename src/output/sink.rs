//! Component persistence
//!
//! Two artifacts live in the output directory:
//!
//! - `components.json`: the full collection, a pretty-printed JSON array in
//!   save order. It is rewritten on every save through a temporary file and a
//!   rename, so readers only ever see a complete array.
//! - `components.txt`: an append-only transcript for reading by eye.
//!
//! A save writes the temporary collection first, appends the transcript
//! second and renames last. A failure at any step leaves the existing
//! collection as it was.

use super::transcript::format_entry;
use crate::record::ComponentRecord;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const COLLECTION_FILE: &str = "components.json";
pub const TRANSCRIPT_FILE: &str = "components.txt";

/// Errors raised while persisting records
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to create output directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("Failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("{path} does not hold a component list: {source}")]
    CorruptCollection {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to serialize collection: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Single-owner writer for the collection and transcript
///
/// The collection is held in memory only for the duration of a `save`.
#[derive(Debug)]
pub struct ComponentSink {
    dir: PathBuf,
    collection_path: PathBuf,
    transcript_path: PathBuf,
}

impl ComponentSink {
    /// Opens a sink over `dir`, creating the directory if needed
    ///
    /// # Returns
    ///
    /// * `Ok(ComponentSink)` - The directory exists and is usable
    /// * `Err(SinkError::CreateDir)` - The directory could not be created
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let dir = dir.into();
        create_dir(&dir)?;

        Ok(Self {
            collection_path: dir.join(COLLECTION_FILE),
            transcript_path: dir.join(TRANSCRIPT_FILE),
            dir,
        })
    }

    /// Appends one record to both artifacts
    ///
    /// Records are never deduplicated: saving the same record twice stores
    /// it twice.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The record is in the collection and the transcript
    /// * `Err(SinkError::CorruptCollection)` - The existing collection could
    ///   not be parsed; it has not been touched
    /// * `Err(SinkError)` - Any other I/O failure; nothing observable changed
    pub fn save(&mut self, record: &ComponentRecord) -> Result<(), SinkError> {
        create_dir(&self.dir)?;

        let mut collection = load_collection(&self.collection_path)?;
        collection.push(record.clone());
        let serialized = serde_json::to_string_pretty(&collection)?;

        let temp_path = self.temp_path();
        if let Err(e) = write_file(&temp_path, serialized.as_bytes()) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        if let Err(e) = self.append_transcript(record) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        fs::rename(&temp_path, &self.collection_path).map_err(|source| {
            let _ = fs::remove_file(&temp_path);
            SinkError::Write {
                path: self.collection_path.clone(),
                source,
            }
        })?;

        tracing::debug!(
            "Collection now holds {} records ({})",
            collection.len(),
            self.collection_path.display()
        );
        Ok(())
    }

    /// Reads back every saved record in save order
    pub fn load(&self) -> Result<Vec<ComponentRecord>, SinkError> {
        load_collection(&self.collection_path)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn collection_path(&self) -> &Path {
        &self.collection_path
    }

    pub fn transcript_path(&self) -> &Path {
        &self.transcript_path
    }

    fn temp_path(&self) -> PathBuf {
        self.dir.join(format!(".{}.tmp", COLLECTION_FILE))
    }

    fn append_transcript(&self, record: &ComponentRecord) -> Result<(), SinkError> {
        let map_err = |source| SinkError::Write {
            path: self.transcript_path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.transcript_path)
            .map_err(map_err)?;
        file.write_all(format_entry(record).as_bytes())
            .map_err(map_err)?;
        file.flush().map_err(map_err)
    }
}

/// Loads a collection file
///
/// A missing file is an empty collection.
///
/// # Returns
///
/// * `Ok(Vec<ComponentRecord>)` - The records in save order
/// * `Err(SinkError::CorruptCollection)` - The file is not a JSON record list
/// * `Err(SinkError::Read)` - The file exists but could not be read
pub fn load_collection(path: &Path) -> Result<Vec<ComponentRecord>, SinkError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(SinkError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_str(&content).map_err(|source| SinkError::CorruptCollection {
        path: path.to_path_buf(),
        source,
    })
}

fn create_dir(dir: &Path) -> Result<(), SinkError> {
    fs::create_dir_all(dir).map_err(|source| SinkError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), SinkError> {
    let map_err = |source| SinkError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::create(path).map_err(map_err)?;
    file.write_all(contents).map_err(map_err)?;
    file.sync_all().map_err(map_err)
}
