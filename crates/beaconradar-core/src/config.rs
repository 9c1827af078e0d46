//! Radar configuration.
//!
//! Every field has a default; a JSON file may override any subset of them.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::address::normalize_prefix;

/// Smallest grid that still fits three distinguishable rings.
pub const MIN_GRID_WIDTH: usize = 11;
pub const MIN_GRID_HEIGHT: usize = 7;
pub const MAX_GRID_SIDE: usize = 1000;
pub const MAX_HISTORY_LEN: usize = 4096;
pub const MAX_SWEEP_WIDTH_DEG: f64 = 360.0;
pub const MAX_SWEEP_SPEED_DEG_PER_SEC: f64 = 36_000.0;

/// Column layout of the legend panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegendLayout {
    /// Address, RSSI, source, age, name, trend.
    #[default]
    Full,
    /// Address, RSSI, source, age, trend.
    Compact,
}

impl fmt::Display for LegendLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Compact => write!(f, "compact"),
        }
    }
}

/// Complete configuration of the radar engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarConfig {
    pub grid_width: usize,
    pub grid_height: usize,
    /// Minimum seconds between redraws (fractional allowed).
    pub draw_interval_secs: f64,
    /// Records older than this are evicted.
    pub max_age_secs: f64,
    pub sweep_speed_deg_per_sec: f64,
    pub sweep_width_deg: f64,
    /// Readings kept per device for the trend sparkline.
    pub history_len: usize,
    /// Address prefixes to track; empty tracks everything.
    pub prefix_allow: Vec<String>,
    pub rssi_min: i32,
    pub rssi_max: i32,
    pub legend_top_k: usize,
    pub legend_layout: LegendLayout,
    /// How long an address stays valid context for a following RSSI line.
    pub association_window_secs: f64,
    /// Idle wake-up period so redraws continue without input.
    pub idle_tick_secs: f64,
    /// Bracketed label of source A.
    pub source_a_label: String,
    /// Bracketed label of source B.
    pub source_b_label: String,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            grid_width: 61,
            grid_height: 31,
            draw_interval_secs: 0.2,
            max_age_secs: 30.0,
            sweep_speed_deg_per_sec: 90.0,
            sweep_width_deg: 24.0,
            history_len: 24,
            prefix_allow: Vec::new(),
            rssi_min: -92,
            rssi_max: -30,
            legend_top_k: 12,
            legend_layout: LegendLayout::Full,
            association_window_secs: 2.0,
            idle_tick_secs: 0.05,
            source_a_label: "A".to_string(),
            source_b_label: "B".to_string(),
        }
    }
}

/// Reasons a configuration cannot be used.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "cannot read config: {e}"),
            Self::Parse(e) => write!(f, "cannot parse config: {e}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}

impl RadarConfig {
    /// Load a (possibly partial) JSON config file over the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        Ok(config)
    }

    /// Check ranges and normalize the prefix allow-list to uppercase.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.grid_width < MIN_GRID_WIDTH || self.grid_height < MIN_GRID_HEIGHT {
            return Err(ConfigError::Invalid(format!(
                "grid must be at least {MIN_GRID_WIDTH}x{MIN_GRID_HEIGHT}, got {}x{}",
                self.grid_width, self.grid_height
            )));
        }
        if self.grid_width > MAX_GRID_SIDE || self.grid_height > MAX_GRID_SIDE {
            return Err(ConfigError::Invalid(format!(
                "grid sides must be at most {MAX_GRID_SIDE}, got {}x{}",
                self.grid_width, self.grid_height
            )));
        }
        seconds("draw_interval_secs", self.draw_interval_secs, false)?;
        seconds("idle_tick_secs", self.idle_tick_secs, false)?;
        seconds("max_age_secs", self.max_age_secs, true)?;
        seconds("association_window_secs", self.association_window_secs, true)?;
        if !(0.0..=MAX_SWEEP_WIDTH_DEG).contains(&self.sweep_width_deg) {
            return Err(ConfigError::Invalid(format!(
                "sweep_width_deg must be within 0..={MAX_SWEEP_WIDTH_DEG}"
            )));
        }
        if !(self.sweep_speed_deg_per_sec.abs() <= MAX_SWEEP_SPEED_DEG_PER_SEC) {
            return Err(ConfigError::Invalid(format!(
                "sweep_speed_deg_per_sec must be within ±{MAX_SWEEP_SPEED_DEG_PER_SEC}"
            )));
        }
        if self.history_len > MAX_HISTORY_LEN {
            return Err(ConfigError::Invalid(format!(
                "history_len must be at most {MAX_HISTORY_LEN}"
            )));
        }
        if self.rssi_min >= self.rssi_max {
            return Err(ConfigError::Invalid(format!(
                "rssi_min ({}) must be below rssi_max ({})",
                self.rssi_min, self.rssi_max
            )));
        }
        if self.legend_top_k == 0 {
            return Err(ConfigError::Invalid("legend_top_k must be >= 1".into()));
        }
        let mut prefixes = Vec::with_capacity(self.prefix_allow.len());
        for raw in &self.prefix_allow {
            match normalize_prefix(raw) {
                Some(p) => prefixes.push(p),
                None => {
                    return Err(ConfigError::Invalid(format!(
                        "prefix '{raw}' is not colon-separated hex bytes"
                    )));
                }
            }
        }
        self.prefix_allow = prefixes;
        Ok(self)
    }

    // The accessors saturate so an unvalidated config cannot panic.

    pub fn draw_interval(&self) -> Duration {
        saturating_secs(self.draw_interval_secs)
    }

    pub fn max_age(&self) -> Duration {
        saturating_secs(self.max_age_secs)
    }

    pub fn association_window(&self) -> Duration {
        saturating_secs(self.association_window_secs)
    }

    pub fn idle_tick(&self) -> Duration {
        saturating_secs(self.idle_tick_secs)
    }
}

/// Reject `value` unless it converts to a `Duration` (and is non-zero when
/// `allow_zero` is false).
fn seconds(name: &str, value: f64, allow_zero: bool) -> Result<Duration, ConfigError> {
    let duration = Duration::try_from_secs_f64(value)
        .map_err(|e| ConfigError::Invalid(format!("{name} = {value}: {e}")))?;
    if !allow_zero && duration.is_zero() {
        return Err(ConfigError::Invalid(format!("{name} must be positive")));
    }
    Ok(duration)
}

fn saturating_secs(value: f64) -> Duration {
    if value.is_nan() {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::MAX)
}
