use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use beaconradar_core::{Engine, SystemClock};

use super::RadarArgs;
use crate::feed::{FeedSet, FeedSpec};

pub struct WatchCommandConfig<'a> {
    pub radar: &'a RadarArgs,
    pub exec: &'a [String],
    pub read_stdin: bool,
    pub label: Option<&'a str>,
    pub log_path: Option<&'a Path>,
    pub display: &'a str,
    pub exit_on_eof: bool,
}

pub fn run(cfg: WatchCommandConfig<'_>) {
    let config = super::load_config(cfg.radar);

    let mut specs = Vec::with_capacity(cfg.exec.len() + 1);
    for arg in cfg.exec {
        match FeedSpec::parse_exec(arg) {
            Ok(spec) => specs.push(spec),
            Err(e) => {
                eprintln!("Error: --exec {e}");
                std::process::exit(1);
            }
        }
    }
    if cfg.read_stdin {
        specs.push(FeedSpec::Stdin {
            label: cfg.label.map(str::to_string),
        });
    }
    if specs.is_empty() {
        eprintln!("Error: no input (give --exec LABEL=CMD or drop --no-stdin)");
        std::process::exit(1);
    }

    let logger = cfg.log_path.map(super::open_log);
    let engine = Engine::new(config, Box::new(SystemClock), logger);

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        if let Err(e) = ctrlc::set_handler(move || shutdown.store(true, Ordering::Relaxed)) {
            log::warn!("cannot install Ctrl-C handler: {e}");
        }
    }

    // Command feeds only run once when the run should end with its input.
    let respawn = !cfg.exit_on_eof;
    let feeds = match FeedSet::spawn(specs, respawn, Arc::clone(&shutdown)) {
        Ok(feeds) => feeds,
        Err(e) => {
            eprintln!("Error: cannot start input feeds: {e}");
            std::process::exit(1);
        }
    };

    let (result, summary) = if cfg.display == "tui" {
        let mut app = crate::tui::app::App::new(engine, feeds, Arc::clone(&shutdown), cfg.exit_on_eof);
        let result = app.run();
        (result, super::summary_line(app.engine()))
    } else {
        let mut engine = engine;
        let mut feeds = feeds;
        let result = crate::display::run(&mut engine, &mut feeds, &shutdown, cfg.exit_on_eof);
        (result, super::summary_line(&engine))
    };
    shutdown.store(true, Ordering::Relaxed);

    if let Err(e) = result {
        eprintln!("Display error: {e}");
        std::process::exit(1);
    }
    eprintln!("{summary}");
    if let Some(path) = cfg.log_path {
        eprintln!("Sightings logged to {}", path.display());
    }
}
