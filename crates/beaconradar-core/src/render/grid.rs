//! Character grid and the rasterizers that draw into it.

use crate::projection::Geometry;

pub const BLANK: char = ' ';
pub const RING: char = '·';
pub const CROSS_H: char = '─';
pub const CROSS_V: char = '│';
pub const CENTER: char = '+';
pub const SWEEP: char = '░';

/// Fixed-size 2-D character buffer indexed by (row, column).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<char>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![BLANK; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, row: usize, col: usize) -> Option<char> {
        if row < self.height && col < self.width {
            Some(self.cells[row * self.width + col])
        } else {
            None
        }
    }

    /// Write one cell. Out-of-range writes are dropped.
    pub fn set(&mut self, row: usize, col: usize, ch: char) {
        if row < self.height && col < self.width {
            self.cells[row * self.width + col] = ch;
        }
    }

    pub fn row(&self, row: usize) -> &[char] {
        let start = row * self.width;
        &self.cells[start..start + self.width]
    }

    pub fn row_string(&self, row: usize) -> String {
        self.row(row).iter().collect()
    }

    /// Number of cells holding `ch`.
    pub fn count(&self, ch: char) -> usize {
        self.cells.iter().filter(|&&c| c == ch).count()
    }
}

/// Draw rings at 1/3, 2/3 and 3/3 of the outer radius plus a dashed
/// crosshair through the centre.
pub fn draw_background(grid: &mut Grid, geometry: &Geometry) {
    let (cx, cy) = geometry.center();
    let center_row = cy.round() as usize;
    let center_col = cx.round() as usize;

    for col in (0..grid.width()).step_by(2) {
        grid.set(center_row, col, CROSS_H);
    }
    for row in (0..grid.height()).step_by(2) {
        grid.set(row, center_col, CROSS_V);
    }

    let outer = geometry.outer_radius();
    for ring in 1..=3 {
        let radius = outer * f64::from(ring) / 3.0;
        for deg in 0..360 {
            let (row, col) = geometry.cell(f64::from(deg), radius);
            grid.set(row, col, RING);
        }
    }

    grid.set(center_row, center_col, CENTER);
}

/// Rotating beam state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sweep {
    angle: f64,
}

impl Sweep {
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Advance by `speed_deg_per_sec × elapsed_secs`, wrapped to `[0, 360)`.
    pub fn advance(&mut self, speed_deg_per_sec: f64, elapsed_secs: f64) {
        self.angle = (self.angle + speed_deg_per_sec * elapsed_secs).rem_euclid(360.0);
    }

    /// Fill the wedge trailing the current angle by `width_deg`.
    pub fn draw(&self, grid: &mut Grid, geometry: &Geometry, width_deg: f64) {
        let outer = geometry.outer_radius();
        let angle_steps = (width_deg.max(0.0) * 2.0).ceil().max(1.0) as usize;
        let radius_steps = (outer * 2.0).ceil().max(1.0) as usize;
        for a in 0..=angle_steps {
            let angle = self.angle - width_deg * a as f64 / angle_steps as f64;
            for r in 1..=radius_steps {
                let radius = outer * r as f64 / radius_steps as f64;
                let (row, col) = geometry.cell(angle, radius);
                grid.set(row, col, SWEEP);
            }
        }
    }
}
