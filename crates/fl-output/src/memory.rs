//! In-memory event sink.

use crate::writer::EventWriter;
use crate::{EventRow, OutputResult};

/// Keeps every row in a `Vec`.  Useful for tests and for collaborators that
/// render the log themselves.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    rows: Vec<EventRow>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[EventRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<EventRow> {
        self.rows
    }
}

impl EventWriter for MemoryWriter {
    fn write_event(&mut self, row: &EventRow) -> OutputResult<()> {
        self.rows.push(row.clone());
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        Ok(())
    }
}
