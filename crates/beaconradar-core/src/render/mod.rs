//! Frame renderer: radar grid plus ranked legend, composited per redraw.
//!
//! Draw order is background, sweep beam, then device markers. Markers that
//! land on the same cell overwrite each other in key order; the last one
//! written is the one shown. Collisions are not resolved.

pub mod grid;
pub mod legend;

use std::time::Duration;

use crate::config::{LegendLayout, RadarConfig};
use crate::engine::IngestStats;
use crate::projection::{Geometry, RssiScale, project};
use crate::store::DeviceStore;

pub use grid::{Grid, Sweep};
pub use legend::{Legend, LegendRow, sparkline};

/// Columns between the grid and the legend.
const GUTTER: usize = 2;

/// One complete redraw.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub grid: Grid,
    pub legend: Legend,
    pub status: String,
    pub sweep_angle: f64,
    pub live_devices: usize,
}

impl Frame {
    /// Grid rows with the status line and legend alongside, each padded to
    /// the same width so a frame fully overwrites the previous one.
    pub fn lines(&self) -> Vec<String> {
        let mut side = Vec::with_capacity(self.legend.rows.len() + 2);
        side.push(self.status.clone());
        side.extend(self.legend.lines());

        let side_width = side.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let rows = self.grid.height().max(side.len());
        let blank_grid = " ".repeat(self.grid.width());

        (0..rows)
            .map(|i| {
                let mut line = if i < self.grid.height() {
                    self.grid.row_string(i)
                } else {
                    blank_grid.clone()
                };
                line.push_str(&" ".repeat(GUTTER));
                let text = side.get(i).map(String::as_str).unwrap_or("");
                line.push_str(text);
                for _ in text.chars().count()..side_width {
                    line.push(' ');
                }
                line
            })
            .collect()
    }
}

pub struct Renderer {
    geometry: Geometry,
    scale: RssiScale,
    background: Grid,
    sweep: Sweep,
    sweep_speed: f64,
    sweep_width: f64,
    top_k: usize,
    layout: LegendLayout,
    spark_width: usize,
    last_render: Option<Duration>,
}

impl Renderer {
    pub fn new(config: &RadarConfig) -> Self {
        let geometry = Geometry::new(config.grid_width, config.grid_height);
        let mut background = Grid::new(config.grid_width, config.grid_height);
        grid::draw_background(&mut background, &geometry);
        Self {
            geometry,
            scale: RssiScale::new(config.rssi_min, config.rssi_max),
            background,
            sweep: Sweep::default(),
            sweep_speed: config.sweep_speed_deg_per_sec,
            sweep_width: config.sweep_width_deg,
            top_k: config.legend_top_k,
            layout: config.legend_layout,
            spark_width: config.history_len,
            last_render: None,
        }
    }

    pub fn sweep_angle(&self) -> f64 {
        self.sweep.angle()
    }

    /// Build a frame from the live records in `store`.
    pub fn render(
        &mut self,
        store: &DeviceStore,
        now: Duration,
        max_age: Duration,
        stats: &IngestStats,
    ) -> Frame {
        let elapsed = self
            .last_render
            .map_or(Duration::ZERO, |last| now.saturating_sub(last));
        self.sweep.advance(self.sweep_speed, elapsed.as_secs_f64());
        self.last_render = Some(now);

        let mut grid = self.background.clone();
        self.sweep.draw(&mut grid, &self.geometry, self.sweep_width);

        let mut live: Vec<_> = store
            .records()
            .filter(|(_, record)| !record.is_stale(now, max_age))
            .collect();
        live.sort_by_key(|(key, _)| **key);
        for (key, record) in &live {
            let (row, col) = project(&self.geometry, &self.scale, &key.address, record.last_rssi);
            grid.set(row, col, key.source.marker());
        }

        let legend = Legend {
            layout: self.layout,
            rows: legend::rank(store.records(), now, max_age, self.top_k, self.spark_width),
            spark_width: self.spark_width,
        };

        let status = format!(
            "devices {:>3}  sweep {:>3.0}°  lines {}  accepted {}  unresolved {}  filtered {}  ignored {}",
            live.len(),
            self.sweep.angle(),
            stats.lines,
            stats.accepted,
            stats.unresolved,
            stats.filtered,
            stats.ignored,
        );

        Frame {
            grid,
            legend,
            status,
            sweep_angle: self.sweep.angle(),
            live_devices: live.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{DeviceAddress, SourceTag};

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn store_with(entries: &[(&str, SourceTag, i32, f64)]) -> DeviceStore {
        let mut store = DeviceStore::new(8, Duration::from_secs(2), Vec::new());
        for &(addr, source, rssi, t) in entries {
            let address: DeviceAddress = addr.parse().unwrap();
            store.record_address(source, address, secs(t));
            store.record_signal(source, rssi, secs(t));
        }
        store
    }

    #[test]
    fn markers_are_drawn_per_source() {
        let config = RadarConfig::default();
        let mut renderer = Renderer::new(&config);
        let store = store_with(&[
            ("AA:BB:CC:DD:EE:00", SourceTag::A, -40, 10.0),
            ("AA:BB:CC:DD:EE:80", SourceTag::B, -40, 10.0),
        ]);
        let frame = renderer.render(&store, secs(10.0), config.max_age(), &IngestStats::default());
        assert_eq!(frame.grid.count('A'), 1);
        assert_eq!(frame.grid.count('B'), 1);
        assert_eq!(frame.live_devices, 2);
    }

    #[test]
    fn stale_records_are_not_rendered() {
        let config = RadarConfig::default();
        let mut renderer = Renderer::new(&config);
        let store = store_with(&[
            ("AA:BB:CC:DD:EE:00", SourceTag::A, -40, 0.0),
            ("AA:BB:CC:DD:EE:40", SourceTag::A, -50, 30.0),
        ]);
        let frame = renderer.render(&store, secs(31.0), config.max_age(), &IngestStats::default());
        assert_eq!(frame.grid.count('A'), 1);
        assert_eq!(frame.legend.rows.len(), 1);
        assert_eq!(frame.legend.rows[0].rssi, -50);
    }

    #[test]
    fn shared_cell_shows_one_marker() {
        let config = RadarConfig::default();
        let mut renderer = Renderer::new(&config);
        // Same low byte and RSSI on both sources land on the same cell.
        let store = store_with(&[
            ("AA:BB:CC:DD:EE:10", SourceTag::A, -60, 1.0),
            ("AA:BB:CC:DD:EE:10", SourceTag::B, -60, 1.0),
        ]);
        let frame = renderer.render(&store, secs(1.0), config.max_age(), &IngestStats::default());
        assert_eq!(frame.grid.count('A') + frame.grid.count('B'), 1);
        assert_eq!(frame.grid.count('B'), 1);
        assert_eq!(frame.legend.rows.len(), 2);
    }

    #[test]
    fn sweep_advances_with_elapsed_time() {
        let config = RadarConfig {
            sweep_speed_deg_per_sec: 90.0,
            ..Default::default()
        };
        let mut renderer = Renderer::new(&config);
        let store = DeviceStore::new(8, Duration::from_secs(2), Vec::new());
        let stats = IngestStats::default();
        renderer.render(&store, secs(100.0), config.max_age(), &stats);
        assert_eq!(renderer.sweep_angle(), 0.0);
        renderer.render(&store, secs(101.0), config.max_age(), &stats);
        assert!((renderer.sweep_angle() - 90.0).abs() < 1e-9);
        let frame = renderer.render(&store, secs(104.5), config.max_age(), &stats);
        assert!((frame.sweep_angle - 45.0).abs() < 1e-9);
    }

    #[test]
    fn frame_lines_have_constant_width() {
        let config = RadarConfig::default();
        let mut renderer = Renderer::new(&config);
        let store = store_with(&[("AA:BB:CC:DD:EE:01", SourceTag::A, -50, 1.0)]);
        let frame = renderer.render(&store, secs(1.0), config.max_age(), &IngestStats::default());
        let lines = frame.lines();
        assert_eq!(lines.len(), config.grid_height);
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|l| l.chars().count() == width));
        assert!(lines[0].contains("devices   1"));
        assert!(lines[2].contains("AA:BB:CC:DD:EE:01"));
    }

    #[test]
    fn legend_taller_than_grid_extends_frame() {
        let config = RadarConfig {
            grid_width: 21,
            grid_height: 7,
            legend_top_k: 10,
            ..Default::default()
        };
        let mut renderer = Renderer::new(&config);
        let entries: Vec<(String, SourceTag, i32, f64)> = (0..10)
            .map(|i| (format!("AA:BB:CC:DD:EE:{i:02X}"), SourceTag::A, -40 - i, 1.0))
            .collect();
        let borrowed: Vec<(&str, SourceTag, i32, f64)> = entries
            .iter()
            .map(|(a, s, r, t)| (a.as_str(), *s, *r, *t))
            .collect();
        let store = store_with(&borrowed);
        let frame = renderer.render(&store, secs(1.0), config.max_age(), &IngestStats::default());
        assert_eq!(frame.lines().len(), 12);
    }
}
