//! CSV event log backend.
//!
//! Appends to `robot_events.csv` in the configured directory.  The header
//! row is written only when the file is new or empty, so successive runs
//! accumulate into one log.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use csv::{Writer, WriterBuilder};

use crate::writer::EventWriter;
use crate::{EventRow, OutputResult};

pub const CSV_FILE_NAME: &str = "robot_events.csv";

/// Appends robot events to a CSV file.
pub struct CsvWriter {
    path:     PathBuf,
    out:      Writer<File>,
    finished: bool,
}

impl CsvWriter {
    /// Open (or create) `robot_events.csv` in `dir` for appending.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let path = dir.join(CSV_FILE_NAME);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let fresh = file.metadata()?.len() == 0;

        let mut out = WriterBuilder::new().has_headers(false).from_writer(file);
        if fresh {
            out.write_record(EventRow::HEADER)?;
        }

        Ok(Self { path, out, finished: false })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventWriter for CsvWriter {
    fn write_event(&mut self, row: &EventRow) -> OutputResult<()> {
        self.finished = false;
        self.out.write_record(&[
            row.unix_ms.to_string(),
            row.robot.clone(),
            row.action.to_string(),
            row.status.to_string(),
            row.vertex.map(|v| v.to_string()).unwrap_or_default(),
            row.detail.clone(),
        ])?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.out.flush()?;
        Ok(())
    }
}
