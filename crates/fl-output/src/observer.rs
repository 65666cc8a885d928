//! `EventLogObserver<W>`: bridges `FleetObserver` to an `EventWriter`.

use log::warn;
use parking_lot::Mutex;

use fl_fleet::{FleetEvent, FleetObserver};

use crate::row::EventRow;
use crate::writer::EventWriter;
use crate::{OutputError, OutputResult};

struct LogState<W> {
    writer:     W,
    last_error: Option<OutputError>,
}

/// A [`FleetObserver`] that appends every [`FleetEvent`] to an
/// [`EventWriter`] backend (memory, CSV, SQLite, …).
///
/// Observer callbacks have no return value, so write errors are stored
/// internally.  Check for them with [`take_error`][Self::take_error] once
/// the fleet has gone idle.  Only the first error is kept.
pub struct EventLogObserver<W: EventWriter> {
    state: Mutex<LogState<W>>,
}

impl<W: EventWriter> EventLogObserver<W> {
    pub fn new(writer: W) -> Self {
        Self {
            state: Mutex::new(LogState { writer, last_error: None }),
        }
    }

    /// Take the stored write error (if any).
    ///
    /// Returns `None` if all writes succeeded.
    pub fn take_error(&self) -> Option<OutputError> {
        self.state.lock().last_error.take()
    }

    /// Flush the backend.
    pub fn finish(&self) -> OutputResult<()> {
        self.state.lock().writer.finish()
    }

    /// Run `f` against the inner writer (e.g. to read a `MemoryWriter`).
    pub fn with_writer<R>(&self, f: impl FnOnce(&W) -> R) -> R {
        f(&self.state.lock().writer)
    }

    /// Unwrap the inner writer.
    pub fn into_writer(self) -> W {
        self.state.into_inner().writer
    }
}

impl<W: EventWriter> FleetObserver for EventLogObserver<W> {
    fn on_event(&self, event: &FleetEvent) {
        let row = EventRow::from(event);
        let mut st = self.state.lock();
        if let Err(e) = st.writer.write_event(&row) {
            if st.last_error.is_none() {
                warn!("event log write failed: {e}");
                st.last_error = Some(e);
            }
        }
    }
}
