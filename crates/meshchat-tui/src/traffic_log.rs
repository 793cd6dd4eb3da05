//! Raw radio traffic log.
//!
//! With `--traffic-log`, every transport event the radio reports is appended
//! to a file as one JSON object per line.

use std::{
    fs::{File, OpenOptions},
    io::{self, BufWriter, Write},
    path::Path,
};

use chrono::{DateTime, Utc};
use meshchat_core::{Timestamp, TransportEvent};
use serde::Serialize;

/// Default log file name, relative to the working directory.
pub const TRAFFIC_LOG_FILE: &str = "radio_messages.json";

#[derive(Serialize)]
struct Record<'a> {
    received_at: String,
    kind: &'static str,
    event: &'a TransportEvent,
}

/// Append-only JSON lines writer.
pub struct TrafficLog {
    writer: BufWriter<File>,
}

impl TrafficLog {
    /// Open `path` for appending, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { writer: BufWriter::new(file) })
    }

    /// Append one event and flush.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn record(&mut self, event: &TransportEvent, now: Timestamp) -> io::Result<()> {
        let record = Record { received_at: rfc3339(now), kind: event.kind(), event };
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

fn rfc3339(at: Timestamp) -> String {
    i64::try_from(at.as_millis())
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map_or_else(|| at.as_millis().to_string(), |time| time.to_rfc3339())
}
