//! Append-only record sink.
//!
//! One output file per run, named from the query. Every append is flushed and
//! synced before the crawler moves to the next index, so an abrupt
//! termination loses at most the record in flight. Existing files are never
//! overwritten: a name collision shifts the old file aside with a numeric
//! suffix.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use thiserror::Error;
use tracing::info;

use crate::domain::job::JobPosting;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("sink I/O failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("record serialization failed: {reason}")]
    Serialize { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Jsonl,
    Csv,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jsonl => "jsonl",
            Self::Csv => "csv",
        }
    }

    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "jsonl" | "json" => Some(Self::Jsonl),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

enum SinkWriter {
    Jsonl(BufWriter<File>),
    Csv(csv::Writer<File>),
}

/// Crash-safe, append-only record sink for one run.
pub struct RecordSink {
    writer: SinkWriter,
    /// Second handle onto the same file, kept for fsync after each append.
    sync_handle: File,
    path: PathBuf,
    written: u64,
}

impl RecordSink {
    /// Open a sink at `dir/stem.ext`. An existing file of that name (and any
    /// numbered siblings) is shifted aside first: `stem.ext` becomes
    /// `stem (1).ext`, `stem (1).ext` becomes `stem (2).ext`, and so on.
    pub fn create(dir: &Path, stem: &str, format: OutputFormat) -> Result<Self, SinkError> {
        fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
        shift_aside(dir, stem, format.extension())?;

        let path = dir.join(format!("{stem}.{}", format.extension()));
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| io_error(&path, e))?;
        let sync_handle = file.try_clone().map_err(|e| io_error(&path, e))?;

        let writer = match format {
            OutputFormat::Jsonl => SinkWriter::Jsonl(BufWriter::new(file)),
            OutputFormat::Csv => SinkWriter::Csv(csv::Writer::from_writer(file)),
        };

        info!("Writing records to {}", path.display());
        Ok(Self {
            writer,
            sync_handle,
            path,
            written: 0,
        })
    }

    /// Append one record and persist it to stable storage before returning.
    pub fn append(&mut self, record: &JobPosting) -> Result<(), SinkError> {
        match &mut self.writer {
            SinkWriter::Jsonl(writer) => {
                serde_json::to_writer(&mut *writer, record).map_err(|e| SinkError::Serialize {
                    reason: e.to_string(),
                })?;
                writer.write_all(b"\n").map_err(|e| io_error(&self.path, e))?;
                writer.flush().map_err(|e| io_error(&self.path, e))?;
            }
            SinkWriter::Csv(writer) => {
                writer.serialize(record).map_err(|e| SinkError::Serialize {
                    reason: e.to_string(),
                })?;
                writer.flush().map_err(|e| io_error(&self.path, e))?;
            }
        }

        self.sync_handle
            .sync_data()
            .map_err(|e| io_error(&self.path, e))?;
        self.written += 1;
        Ok(())
    }

    pub fn records_written(&self) -> u64 {
        self.written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Shift an existing `stem.ext` (and numbered siblings) one suffix up so the
/// base name becomes free without anything being overwritten.
fn shift_aside(dir: &Path, stem: &str, ext: &str) -> Result<(), SinkError> {
    let base = dir.join(format!("{stem}.{ext}"));
    if !base.exists() {
        return Ok(());
    }

    let numbered = |n: u32| dir.join(format!("{stem} ({n}).{ext}"));

    let mut free = 1;
    while numbered(free).exists() {
        free += 1;
    }

    for n in (1..free).rev() {
        fs::rename(numbered(n), numbered(n + 1)).map_err(|e| io_error(dir, e))?;
    }
    fs::rename(&base, numbered(1)).map_err(|e| io_error(&base, e))?;

    info!(
        "Existing output {} moved aside to {}",
        base.display(),
        numbered(1).display()
    );
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> SinkError {
    SinkError::Io {
        path: path.to_path_buf(),
        source,
    }
}
