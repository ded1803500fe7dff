//! Append-only, human-readable log files: the master log and the
//! per-worker measurement logs.

use std::fs::{File, OpenOptions};
use std::io::{self, LineWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::errors::WardenResult;

/// `Thu Oct 15 14:02:11 2026`
const TIMESTAMP_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

pub fn timestamp(at: DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug)]
pub struct Logbook {
    path: PathBuf,
    writer: LineWriter<File>,
}

impl Logbook {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> WardenResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| io::Error::new(e.kind(), format!("cannot open {}: {e}", path.display())))?;
        Ok(Self {
            path,
            writer: LineWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `"<timestamp>, <event>"` and return the written line.
    pub fn record(&mut self, event: impl AsRef<str>) -> WardenResult<String> {
        let line = format!("{}, {}", timestamp(Local::now()), event.as_ref());
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;
        Ok(line)
    }
}
