//! `fl-output`: append-only robot event log for the fleet traffic framework.
//!
//! Backends:
//!
//! | Feature   | Backend  | Storage                                  |
//! |-----------|----------|------------------------------------------|
//! | *(none)*  | Memory   | `Vec<EventRow>`                          |
//! | *(none)*  | CSV      | `robot_events.csv` (appended, one header) |
//! | `sqlite`  | SQLite   | `robot_events.db`, table `robot_events`  |
//!
//! All backends implement [`EventWriter`] and are driven by
//! [`EventLogObserver`], which implements `fl_fleet::FleetObserver`.  The
//! log is write-only: nothing in the fleet reads it back.
//!
//! # Usage
//!
//! ```rust,ignore
//! use fl_output::{CsvWriter, EventLogObserver};
//!
//! let log = Arc::new(EventLogObserver::new(CsvWriter::new(Path::new("./logs"))?));
//! let fleet = FleetBuilder::new(graph).event_log(log.clone()).build()?;
//! // … run …
//! log.finish()?;
//! log.take_error().map(|e| eprintln!("event log error: {e}"));
//! ```

pub mod csv;
pub mod error;
pub mod memory;
pub mod observer;
pub mod row;
pub mod writer;

#[cfg(feature = "sqlite")]
pub mod sqlite;


pub use self::csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use memory::MemoryWriter;
pub use observer::EventLogObserver;
pub use row::EventRow;
pub use writer::EventWriter;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteWriter;
