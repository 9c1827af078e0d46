pub mod classify;
pub mod replay;
pub mod watch;

use std::path::{Path, PathBuf};

use clap::Args;

use beaconradar_core::{ConfigError, LegendLayout, RadarConfig, SightingLogger};

/// Radar settings shared by `watch` and `replay`. Flags override the config
/// file, which overrides the built-in defaults.
#[derive(Args, Debug, Default, Clone)]
pub struct RadarArgs {
    /// JSON config file (any subset of fields)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Radar grid width in columns
    #[arg(long)]
    pub width: Option<usize>,

    /// Radar grid height in rows
    #[arg(long)]
    pub height: Option<usize>,

    /// Seconds between redraws (fractional allowed)
    #[arg(long)]
    pub interval: Option<f64>,

    /// Drop devices not heard from for this many seconds
    #[arg(long)]
    pub max_age: Option<f64>,

    /// Sweep beam speed in degrees per second
    #[arg(long, allow_negative_numbers = true)]
    pub sweep_speed: Option<f64>,

    /// Sweep beam width in degrees
    #[arg(long)]
    pub sweep_width: Option<f64>,

    /// Readings kept per device for the trend sparkline
    #[arg(long)]
    pub history: Option<usize>,

    /// Only track addresses starting with this prefix (repeatable, e.g. AA:BB:CC)
    #[arg(long = "prefix", value_name = "PREFIX")]
    pub prefixes: Vec<String>,

    /// Weakest RSSI on the scale; weaker readings sit on the outer ring
    #[arg(long, allow_negative_numbers = true)]
    pub rssi_min: Option<i32>,

    /// Strongest RSSI on the scale; stronger readings sit at the centre
    #[arg(long, allow_negative_numbers = true)]
    pub rssi_max: Option<i32>,

    /// Number of devices shown in the legend
    #[arg(long)]
    pub top: Option<usize>,

    /// Legend layout
    #[arg(long, value_parser = ["full", "compact"])]
    pub layout: Option<String>,

    /// Seconds an address stays associated with following RSSI lines
    #[arg(long)]
    pub window: Option<f64>,

    /// Label identifying source A
    #[arg(long)]
    pub label_a: Option<String>,

    /// Label identifying source B
    #[arg(long)]
    pub label_b: Option<String>,
}

impl RadarArgs {
    /// Defaults, then the config file, then flags; validated.
    pub fn resolve(&self) -> Result<RadarConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => RadarConfig::load(path)?,
            None => RadarConfig::default(),
        };

        if let Some(v) = self.width {
            config.grid_width = v;
        }
        if let Some(v) = self.height {
            config.grid_height = v;
        }
        if let Some(v) = self.interval {
            config.draw_interval_secs = v;
        }
        if let Some(v) = self.max_age {
            config.max_age_secs = v;
        }
        if let Some(v) = self.sweep_speed {
            config.sweep_speed_deg_per_sec = v;
        }
        if let Some(v) = self.sweep_width {
            config.sweep_width_deg = v;
        }
        if let Some(v) = self.history {
            config.history_len = v;
        }
        if !self.prefixes.is_empty() {
            config.prefix_allow = self.prefixes.clone();
        }
        if let Some(v) = self.rssi_min {
            config.rssi_min = v;
        }
        if let Some(v) = self.rssi_max {
            config.rssi_max = v;
        }
        if let Some(v) = self.top {
            config.legend_top_k = v;
        }
        if let Some(layout) = &self.layout {
            config.legend_layout = match layout.as_str() {
                "compact" => LegendLayout::Compact,
                _ => LegendLayout::Full,
            };
        }
        if let Some(v) = self.window {
            config.association_window_secs = v;
        }
        if let Some(v) = &self.label_a {
            config.source_a_label = v.clone();
        }
        if let Some(v) = &self.label_b {
            config.source_b_label = v.clone();
        }

        config.validate()
    }
}

/// Resolve the radar config or exit with a message.
pub fn load_config(args: &RadarArgs) -> RadarConfig {
    match args.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Open the sighting log or exit with a message.
pub fn open_log(path: &Path) -> SightingLogger {
    match SightingLogger::open(path) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Error: cannot open sighting log {}: {e}", path.display());
            std::process::exit(1);
        }
    }
}

/// One-line counter summary printed when a run ends.
pub fn summary_line(engine: &beaconradar_core::Engine) -> String {
    let s = engine.stats();
    format!(
        "lines {}  accepted {}  unresolved {}  filtered {}  ignored {}  evicted {}  devices {}",
        s.lines,
        s.accepted,
        s.unresolved,
        s.filtered,
        s.ignored,
        s.evicted,
        engine.store().len()
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_gives_defaults() {
        let config = RadarArgs::default().resolve().unwrap();
        assert_eq!(config, RadarConfig::default());
    }

    #[test]
    fn flags_override_config_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("radar.json");
        std::fs::write(&path, r#"{"grid_width": 41, "history_len": 8, "legend_layout": "compact"}"#)
            .unwrap();

        let args = RadarArgs {
            config: Some(path),
            history: Some(3),
            prefixes: vec!["aa:bb".into()],
            rssi_min: Some(-100),
            ..Default::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.grid_width, 41);
        assert_eq!(config.history_len, 3);
        assert_eq!(config.legend_layout, LegendLayout::Compact);
        assert_eq!(config.prefix_allow, vec!["AA:BB".to_string()]);
        assert_eq!(config.rssi_min, -100);
    }

    #[test]
    fn invalid_flags_are_rejected() {
        let args = RadarArgs {
            rssi_min: Some(-30),
            rssi_max: Some(-40),
            ..Default::default()
        };
        assert!(matches!(args.resolve(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_config_file_is_an_io_error() {
        let args = RadarArgs {
            config: Some(PathBuf::from("/nonexistent/radar.json")),
            ..Default::default()
        };
        assert!(matches!(args.resolve(), Err(ConfigError::Io(_))));
    }
}
