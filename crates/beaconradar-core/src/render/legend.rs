//! Ranked device legend with per-device trend sparklines.

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;

use crate::address::{DeviceAddress, SightingKey, SourceTag};
use crate::config::LegendLayout;
use crate::store::DeviceRecord;

/// Eight-level glyph ramp, lowest first.
pub const SPARK_RAMP: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

const NAME_WIDTH: usize = 16;

/// One legend entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendRow {
    pub address: DeviceAddress,
    pub source: SourceTag,
    pub rssi: i32,
    pub age_secs: f64,
    pub name: Option<String>,
    pub sparkline: String,
}

/// Render `history` as a right-aligned sparkline `width` glyphs wide.
///
/// Values are min–max normalized per device. A flat history sits on the
/// lowest glyph; positions with no sample yet are blank; an empty history is
/// an empty string.
pub fn sparkline(history: &VecDeque<i32>, width: usize) -> String {
    if history.is_empty() {
        return String::new();
    }
    let lo = f64::from(history.iter().copied().min().unwrap_or(0));
    let hi = f64::from(history.iter().copied().max().unwrap_or(0));
    let span = hi - lo;
    let top = (SPARK_RAMP.len() - 1) as f64;

    let mut out = String::with_capacity(width.max(history.len()) * 3);
    for _ in history.len()..width {
        out.push(' ');
    }
    for &v in history {
        let level = if span > 0.0 {
            ((f64::from(v) - lo) / span * top).round() as usize
        } else {
            0
        };
        out.push(SPARK_RAMP[level.min(SPARK_RAMP.len() - 1)]);
    }
    out
}

/// Live records ranked by descending RSSI, truncated to `top_k`.
///
/// Ties are ordered by key so the ranking is stable between frames. Records
/// older than `max_age` are never included.
pub fn rank<'a>(
    records: impl Iterator<Item = (&'a SightingKey, &'a DeviceRecord)>,
    now: Duration,
    max_age: Duration,
    top_k: usize,
    spark_width: usize,
) -> Vec<LegendRow> {
    let mut live: Vec<(&SightingKey, &DeviceRecord)> = records
        .filter(|(_, record)| !record.is_stale(now, max_age))
        .collect();
    live.sort_by(|a, b| b.1.last_rssi.cmp(&a.1.last_rssi).then_with(|| a.0.cmp(b.0)));

    live.into_iter()
        .take(top_k)
        .map(|(key, record)| LegendRow {
            address: key.address,
            source: key.source,
            rssi: record.last_rssi,
            age_secs: record.age(now).as_secs_f64(),
            name: record.name.clone(),
            sparkline: sparkline(&record.history, spark_width),
        })
        .collect()
}

/// Legend panel contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub layout: LegendLayout,
    pub rows: Vec<LegendRow>,
    pub spark_width: usize,
}

impl Legend {
    fn trend_width(&self) -> usize {
        self.spark_width.max("TREND".len())
    }

    pub fn header(&self) -> String {
        match self.layout {
            LegendLayout::Full => format!(
                "{:<17} {:>4} {:<3} {:>6} {:<nw$} {:<sw$}",
                "ADDRESS",
                "RSSI",
                "SRC",
                "AGE",
                "NAME",
                "TREND",
                nw = NAME_WIDTH,
                sw = self.trend_width()
            ),
            LegendLayout::Compact => format!(
                "{:<17} {:>4} {:<3} {:>6} {:<sw$}",
                "ADDRESS",
                "RSSI",
                "SRC",
                "AGE",
                "TREND",
                sw = self.trend_width()
            ),
        }
    }

    pub fn format_row(&self, row: &LegendRow) -> String {
        let age = format!("{:.1}s", row.age_secs);
        match self.layout {
            LegendLayout::Full => format!(
                "{:<17} {:>4} {:<3} {:>6} {:<nw$} {:>sw$}",
                row.address.to_string(),
                row.rssi,
                row.source.marker(),
                age,
                truncate_name(row.name.as_deref().unwrap_or("-"), NAME_WIDTH),
                row.sparkline,
                nw = NAME_WIDTH,
                sw = self.trend_width()
            ),
            LegendLayout::Compact => format!(
                "{:<17} {:>4} {:<3} {:>6} {:>sw$}",
                row.address.to_string(),
                row.rssi,
                row.source.marker(),
                age,
                row.sparkline,
                sw = self.trend_width()
            ),
        }
    }

    /// Header followed by one line per row.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        lines.push(self.header());
        lines.extend(self.rows.iter().map(|row| self.format_row(row)));
        lines
    }
}

fn truncate_name(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        return name.to_string();
    }
    let mut out: String = name.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}
