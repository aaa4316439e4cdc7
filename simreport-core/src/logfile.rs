//! Append-only run logfile.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};

use crate::error::ReportError;
use crate::record::Record;

/// One timestamped line per record, flushed as it is written so the file is
/// complete even when the process terminates abruptly.
pub struct Logfile {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl Logfile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| ReportError::Logfile {
                path: path.clone(),
                source,
            })?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, record: &Record) -> Result<(), ReportError> {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        writeln!(self.writer, "{timestamp} [{}] {}", record.tag(), record.text())
            .and_then(|_| self.writer.flush())
            .map_err(|source| ReportError::Logfile {
                path: self.path.clone(),
                source,
            })
    }
}
