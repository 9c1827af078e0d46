//! Plain ANSI frame writer.
//!
//! Clears the screen once at startup and hides the cursor. Each frame is
//! written from the home position; every line has the same width so the
//! previous frame is fully overwritten, and anything below the last line is
//! cleared. The cursor is shown again on shutdown, on error and on panic.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::Print,
    terminal::{Clear, ClearType},
};

use beaconradar_core::{Engine, Frame};

use crate::feed::FeedSet;

pub struct AnsiScreen<W: Write> {
    out: W,
    finished: bool,
}

impl<W: Write> AnsiScreen<W> {
    /// Clear, home and hide the cursor.
    pub fn start(mut out: W) -> io::Result<Self> {
        queue!(out, Clear(ClearType::All), MoveTo(0, 0), Hide)?;
        out.flush()?;
        Ok(Self {
            out,
            finished: false,
        })
    }

    pub fn present(&mut self, frame: &Frame) -> io::Result<()> {
        queue!(self.out, MoveTo(0, 0))?;
        for line in frame.lines() {
            queue!(self.out, Print(line), Print("\r\n"))?;
        }
        queue!(self.out, Clear(ClearType::FromCursorDown))?;
        self.out.flush()
    }

    /// Restore the cursor. Idempotent.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        queue!(self.out, Show)?;
        self.out.flush()
    }

    #[cfg(test)]
    fn into_inner(self) -> W
    where
        W: Default,
    {
        let mut this = std::mem::ManuallyDrop::new(self);
        std::mem::take(&mut this.out)
    }
}

impl<W: Write> Drop for AnsiScreen<W> {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

/// Consume feeds until shutdown (or EOF with `exit_on_eof`), presenting a
/// frame whenever one is due.
pub fn run(
    engine: &mut Engine,
    feeds: &mut FeedSet,
    shutdown: &AtomicBool,
    exit_on_eof: bool,
) -> io::Result<()> {
    let mut screen = AnsiScreen::start(io::stdout())?;

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = execute!(io::stdout(), Show);
        original_hook(info);
    }));

    let result = pump(engine, feeds, shutdown, exit_on_eof, &mut screen);

    let _ = std::panic::take_hook();
    // Leave the final state on screen.
    if result.is_ok() {
        screen.present(&engine.render_now())?;
    }
    screen.finish()?;
    result
}

fn pump<W: Write>(
    engine: &mut Engine,
    feeds: &mut FeedSet,
    shutdown: &AtomicBool,
    exit_on_eof: bool,
    screen: &mut AnsiScreen<W>,
) -> io::Result<()> {
    let tick = engine.idle_tick();
    while !shutdown.load(Ordering::Relaxed) {
        if let Some(line) = feeds.recv_timeout(tick) {
            engine.ingest(&line);
        }
        if let Some(frame) = engine.poll_redraw() {
            screen.present(&frame)?;
        }
        if exit_on_eof && feeds.is_exhausted() {
            break;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
