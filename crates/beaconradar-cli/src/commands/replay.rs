//! Deterministic offline run over a captured trace.
//!
//! The clock starts at `start` and advances a fixed step after every line, so
//! the same trace always produces the same sighting log and final frame.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::time::Duration;

use beaconradar_core::{Engine, ManualClock};

use super::RadarArgs;
use crate::feed::lossy_lines;

pub struct ReplayCommandConfig<'a> {
    pub input: &'a str,
    pub radar: &'a RadarArgs,
    pub start_secs: u64,
    pub step_ms: u64,
    pub log_path: Option<&'a Path>,
    pub print_frame: bool,
}

pub fn run(cfg: ReplayCommandConfig<'_>) {
    let config = super::load_config(cfg.radar);
    let reader = match open_input(cfg.input) {
        Ok(reader) => reader,
        Err(e) => {
            eprintln!("Error: cannot open {}: {e}", cfg.input);
            std::process::exit(1);
        }
    };

    let clock = ManualClock::starting_at(Duration::from_secs(cfg.start_secs));
    let logger = cfg.log_path.map(super::open_log);
    let mut engine = Engine::new(config, Box::new(clock.clone()), logger);

    if let Err(e) = replay(&mut engine, &clock, reader, Duration::from_millis(cfg.step_ms)) {
        eprintln!("Error: read failed: {e}");
        std::process::exit(1);
    }

    if cfg.print_frame {
        for line in engine.render_now().lines() {
            println!("{}", line.trim_end());
        }
        println!();
    }
    println!("{}", super::summary_line(&engine));
    if let Some(path) = cfg.log_path {
        println!("Sightings logged to {}", path.display());
    }
}

/// `-` reads stdin.
pub fn open_input(input: &str) -> io::Result<Box<dyn BufRead>> {
    if input == "-" {
        Ok(Box::new(BufReader::new(io::stdin())))
    } else {
        Ok(Box::new(BufReader::new(File::open(input)?)))
    }
}

/// Feed every line to `engine`, checking the redraw schedule after each one
/// and then moving the clock on by `step`.
pub fn replay<R: BufRead>(
    engine: &mut Engine,
    clock: &ManualClock,
    reader: R,
    step: Duration,
) -> io::Result<()> {
    for line in lossy_lines(reader) {
        engine.ingest(&line?);
        let _ = engine.poll_redraw();
        clock.advance(step);
    }
    Ok(())
}
