//! Polar projection from (address, RSSI) to grid cells.
//!
//! The angle is a pseudo-bearing derived from the address's low byte; it is
//! stable across redraws but says nothing about real direction. The radius
//! encodes signal strength: strong signals sit near the centre.

use crate::address::DeviceAddress;

/// Terminal cells are roughly twice as tall as they are wide.
pub const CELL_ASPECT: f64 = 2.0;

/// Innermost marker radius as a fraction of the outer radius.
pub const INNER_FRACTION: f64 = 0.05;
/// Outermost marker radius as a fraction of the outer radius.
pub const OUTER_FRACTION: f64 = 0.95;

/// Pseudo-bearing in degrees, in `[0, 360)`.
pub fn angle_degrees(address: &DeviceAddress) -> f64 {
    f64::from(address.low_byte()) / 256.0 * 360.0
}

/// Dimensions of the radar grid and the derived polar frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub width: usize,
    pub height: usize,
}

impl Geometry {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Centre as (column, row).
    pub fn center(&self) -> (f64, f64) {
        (
            (self.width.saturating_sub(1)) as f64 / 2.0,
            (self.height.saturating_sub(1)) as f64 / 2.0,
        )
    }

    /// Outer ring radius, in row units.
    pub fn outer_radius(&self) -> f64 {
        let (cx, cy) = self.center();
        (cx / CELL_ASPECT).min(cy)
    }

    /// Cell for a polar point. Angle 0° is up, increasing clockwise. The
    /// result is rounded and clamped into the grid.
    pub fn cell(&self, angle_deg: f64, radius: f64) -> (usize, usize) {
        let (cx, cy) = self.center();
        let theta = angle_deg.to_radians();
        let col = cx + radius * CELL_ASPECT * theta.sin();
        let row = cy - radius * theta.cos();
        (
            clamp_round(row, self.height),
            clamp_round(col, self.width),
        )
    }
}

fn clamp_round(v: f64, len: usize) -> usize {
    let max = len.saturating_sub(1) as f64;
    v.round().clamp(0.0, max) as usize
}

/// Maps RSSI readings onto radii inside a fixed clamp window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RssiScale {
    pub min: i32,
    pub max: i32,
}

impl RssiScale {
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// 0.0 for the weakest clamped reading, 1.0 for the strongest.
    pub fn strength(&self, rssi: i32) -> f64 {
        let lo = f64::from(self.min);
        let span = (f64::from(self.max) - lo).max(1.0);
        let clamped = rssi.clamp(self.min, self.max.max(self.min));
        (f64::from(clamped) - lo) / span
    }

    /// Radius for `rssi` given the grid's outer radius.
    pub fn radius(&self, rssi: i32, outer_radius: f64) -> f64 {
        let weakness = 1.0 - self.strength(rssi);
        outer_radius * (INNER_FRACTION + (OUTER_FRACTION - INNER_FRACTION) * weakness)
    }
}

/// Grid cell (row, column) for a device reading.
pub fn project(
    geometry: &Geometry,
    scale: &RssiScale,
    address: &DeviceAddress,
    rssi: i32,
) -> (usize, usize) {
    let radius = scale.radius(rssi, geometry.outer_radius());
    geometry.cell(angle_degrees(address), radius)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr_with_low(b: u8) -> DeviceAddress {
        DeviceAddress::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, b])
    }

    #[test]
    fn angle_from_low_byte() {
        assert_eq!(angle_degrees(&addr_with_low(0)), 0.0);
        assert_eq!(angle_degrees(&addr_with_low(64)), 90.0);
        assert_eq!(angle_degrees(&addr_with_low(128)), 180.0);
        assert!(angle_degrees(&addr_with_low(255)) < 360.0);
    }

    #[test]
    fn angle_ignores_other_bytes() {
        let a = DeviceAddress::new([1, 2, 3, 4, 5, 0x42]);
        let b = DeviceAddress::new([9, 9, 9, 9, 9, 0x42]);
        assert_eq!(angle_degrees(&a), angle_degrees(&b));
    }

    #[test]
    fn strength_is_clamped() {
        let scale = RssiScale::new(-92, -30);
        assert_eq!(scale.strength(-120), 0.0);
        assert_eq!(scale.strength(-92), 0.0);
        assert_eq!(scale.strength(-30), 1.0);
        assert_eq!(scale.strength(0), 1.0);
    }

    #[test]
    fn strength_spans_the_full_i32_range() {
        let scale = RssiScale::new(i32::MIN, i32::MAX);
        assert_eq!(scale.strength(i32::MIN), 0.0);
        assert_eq!(scale.strength(i32::MAX), 1.0);
        assert!((scale.strength(0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn stronger_signal_is_closer() {
        let scale = RssiScale::new(-92, -30);
        let outer = 15.0;
        assert!(scale.radius(-40, outer) < scale.radius(-80, outer));
        assert!((scale.radius(-30, outer) - 0.75).abs() < 1e-9);
        assert!((scale.radius(-92, outer) - 14.25).abs() < 1e-9);
    }

    #[test]
    fn geometry_center_and_radius() {
        let g = Geometry::new(61, 31);
        assert_eq!(g.center(), (30.0, 15.0));
        assert_eq!(g.outer_radius(), 15.0);
    }

    #[test]
    fn cell_orientation() {
        let g = Geometry::new(61, 31);
        // Up, right, down, left.
        assert_eq!(g.cell(0.0, 10.0), (5, 30));
        assert_eq!(g.cell(90.0, 10.0), (15, 50));
        assert_eq!(g.cell(180.0, 10.0), (25, 30));
        assert_eq!(g.cell(270.0, 10.0), (15, 10));
    }

    #[test]
    fn cell_is_clamped_to_grid() {
        let g = Geometry::new(21, 11);
        assert_eq!(g.cell(0.0, 100.0), (0, 10));
        assert_eq!(g.cell(90.0, 100.0), (5, 20));
    }

    #[test]
    fn markers_never_touch_the_edge() {
        let g = Geometry::new(61, 31);
        let scale = RssiScale::new(-92, -30);
        for low in 0..=255u8 {
            let (row, col) = project(&g, &scale, &addr_with_low(low), -120);
            assert!(row > 0 && row < g.height - 1, "row {row} for {low}");
            assert!(col > 0 && col < g.width - 1, "col {col} for {low}");
        }
    }
}
