//! TUI application state and event loop.
//!
//! Lines are drained from the feed channel between key polls; the engine's
//! scheduler decides when a new frame is built. Pausing freezes the displayed
//! frame while ingest and the sighting log carry on.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;

use beaconradar_core::{Engine, Frame as RadarFrame};

use crate::feed::FeedSet;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Upper bound on lines ingested between two key polls.
const MAX_LINES_PER_TICK: usize = 512;

const MIN_INTERVAL_SECS: f64 = 0.05;
const MAX_INTERVAL_SECS: f64 = 10.0;

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    engine: Engine,
    feeds: FeedSet,
    shutdown: Arc<AtomicBool>,
    exit_on_eof: bool,
    running: bool,
    paused: bool,
    frame: Option<RadarFrame>,
    last_export: Option<PathBuf>,
    export_error: Option<String>,
}

impl App {
    pub fn new(engine: Engine, feeds: FeedSet, shutdown: Arc<AtomicBool>, exit_on_eof: bool) -> Self {
        Self {
            engine,
            feeds,
            shutdown,
            exit_on_eof,
            running: true,
            paused: false,
            frame: None,
            last_export: None,
            export_error: None,
        }
    }

    pub fn run(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Install panic hook that restores terminal before printing the panic.
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
            original_hook(info);
        }));

        let result = self.run_loop(&mut terminal);

        // Always restore terminal, even if the loop returned an error.
        let _ = std::panic::take_hook();
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            crossterm::cursor::Show
        )?;

        if let Some(path) = &self.last_export {
            println!("Last snapshot: {}", path.display());
        }

        result
    }

    fn run_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
        let tick = self.engine.idle_tick();

        while self.running {
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }
            self.drain_feeds();
            self.poll_frame();

            terminal.draw(|f| super::ui::draw(f, self))?;

            if event::poll(tick)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }

            if self.exit_on_eof && self.feeds.is_exhausted() {
                self.running = false;
            }
        }

        Ok(())
    }

    /// Ingest whatever is waiting, checking the redraw schedule after each
    /// line.
    fn drain_feeds(&mut self) {
        for _ in 0..MAX_LINES_PER_TICK {
            let Some(line) = self.feeds.try_recv() else {
                break;
            };
            self.engine.ingest(&line);
            self.poll_frame();
        }
    }

    fn poll_frame(&mut self) {
        if let Some(frame) = self.engine.poll_redraw() {
            if !self.paused {
                self.frame = Some(frame);
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.running = false
            }
            KeyCode::Char('p') => self.paused = !self.paused,
            KeyCode::Char('x') => {
                self.engine.clear();
                self.frame = Some(self.engine.render_now());
            }
            KeyCode::Char('s') => self.export_snapshot(),
            KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Char(']') => {
                self.scale_interval(0.5);
            }
            KeyCode::Char('-') | KeyCode::Char('[') => {
                self.scale_interval(2.0);
            }
            _ => {}
        }
    }

    fn scale_interval(&mut self, factor: f64) {
        let secs = (self.engine.draw_interval().as_secs_f64() * factor)
            .clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS);
        self.engine.set_draw_interval(Duration::from_secs_f64(secs));
    }

    fn export_snapshot(&mut self) {
        let epoch = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let path = PathBuf::from(format!("beaconradar-snapshot-{epoch}.json"));

        let written = serde_json::to_string_pretty(&self.engine.snapshot())
            .map_err(io::Error::from)
            .and_then(|contents| std::fs::write(&path, contents));
        match written {
            Ok(()) => {
                log::info!("snapshot written to {}", path.display());
                self.last_export = Some(path);
                self.export_error = None;
            }
            Err(e) => {
                log::warn!("snapshot export failed: {e}");
                self.export_error = Some(e.to_string());
            }
        }
    }

    // --- Public accessors ---

    pub fn engine(&self) -> &Engine {
        &self.engine
    }
    pub fn frame(&self) -> Option<&RadarFrame> {
        self.frame.as_ref()
    }
    pub fn is_paused(&self) -> bool {
        self.paused
    }
    pub fn last_export(&self) -> Option<&PathBuf> {
        self.last_export.as_ref()
    }
    pub fn export_error(&self) -> Option<&str> {
        self.export_error.as_deref()
    }
    pub fn feeds_exhausted(&self) -> bool {
        self.feeds.is_exhausted()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
