//! The `EventWriter` trait implemented by all backends.

use crate::{EventRow, OutputResult};

/// Trait implemented by the memory, CSV, and SQLite event writers.
///
/// Writers are driven from many worker threads through
/// [`EventLogObserver`](crate::EventLogObserver), which serializes access,
/// so implementations only need to be `Send`.
pub trait EventWriter: Send {
    /// Append one event.
    fn write_event(&mut self, row: &EventRow) -> OutputResult<()>;

    /// Flush everything to durable storage.
    ///
    /// Calling it again after success is a no-op.
    fn finish(&mut self) -> OutputResult<()>;
}
