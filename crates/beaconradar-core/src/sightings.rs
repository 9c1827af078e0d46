//! Append-only sighting log.
//!
//! One CSV line per accepted RSSI reading:
//!
//! ```text
//! timestamp,source,address,rssi,name
//! 2026-02-15T01:30:00.123Z,A,AA:BB:CC:DD:EE:01,-50
//! 2026-02-15T01:30:00.456Z,B,11:22:33:44:55:66,-71,Tile
//! ```
//!
//! The header is written only when the file is new or empty. Every record is
//! flushed before `append` returns, so a crash loses at most the record in
//! flight.

use std::borrow::Cow;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::store::Sighting;

pub const HEADER: &str = "timestamp,source,address,rssi,name";

pub struct SightingLogger {
    writer: Box<dyn Write + Send>,
    path: Option<PathBuf>,
    records_written: u64,
}

impl SightingLogger {
    /// Open `path` for appending, creating it (and writing the header) if
    /// needed.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let is_new = file.metadata()?.len() == 0;
        let mut logger = Self::from_writer(BufWriter::new(file), is_new)?;
        logger.path = Some(path.to_path_buf());
        Ok(logger)
    }

    /// Log into an arbitrary writer.
    pub fn from_writer(writer: impl Write + Send + 'static, write_header: bool) -> io::Result<Self> {
        let mut writer: Box<dyn Write + Send> = Box::new(writer);
        if write_header {
            writeln!(writer, "{HEADER}")?;
            writer.flush()?;
        }
        Ok(Self {
            writer,
            path: None,
            records_written: 0,
        })
    }

    /// Append and flush one record.
    pub fn append(&mut self, sighting: &Sighting) -> io::Result<()> {
        writeln!(self.writer, "{}", format_record(sighting))?;
        self.writer.flush()?;
        self.records_written += 1;
        Ok(())
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Render one CSV line (without the newline).
pub fn format_record(s: &Sighting) -> String {
    let mut line = format!(
        "{},{},{},{}",
        format_timestamp(s.timestamp),
        s.source,
        s.address,
        s.rssi
    );
    if let Some(name) = &s.name {
        line.push(',');
        line.push_str(&csv_field(name));
    }
    line
}

/// Quote a field if it contains a separator or a quote.
fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// `2026-02-15T01:30:00.123Z` style UTC timestamp.
pub fn format_timestamp(since_epoch: Duration) -> String {
    let secs = since_epoch.as_secs();
    let (year, month, day) = civil_date(secs / 86_400);
    let time_of_day = secs % 86_400;
    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}.{:03}Z",
        time_of_day / 3600,
        time_of_day / 60 % 60,
        time_of_day % 60,
        since_epoch.subsec_millis()
    )
}

/// Proleptic Gregorian (year, month, day) for a count of days since
/// 1970-01-01, computed in 400-year eras starting each March.
fn civil_date(days: u64) -> (u64, u64, u64) {
    // 1970-01-01 is day 719_468 counted from 0000-03-01.
    let z = days + 719_468;
    let era = z / 146_097;
    let day_of_era = z % 146_097;
    let year_of_era =
        (day_of_era - day_of_era / 1460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    let shifted_month = (5 * day_of_year + 2) / 153;
    let day = day_of_year - (153 * shifted_month + 2) / 5 + 1;
    let month = if shifted_month < 10 { shifted_month + 3 } else { shifted_month - 9 };
    let year = era * 400 + year_of_era + u64::from(month <= 2);
    (year, month, day)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
