//! Input supervisor: one producer thread per feed, one ordered channel out.
//!
//! Command feeds run under `sh -c` and every stdout line is tagged with the
//! feed's label (`[A] ...`). A command that exits is restarted with
//! exponential backoff until shutdown. Stdin ends at EOF.

use std::io::{self, BufRead, BufReader};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);
/// A run at least this long resets the backoff.
pub const STABLE_RUN: Duration = Duration::from_secs(30);

/// Granularity of shutdown checks while waiting to respawn.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// Feed specs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSpec {
    /// Standard input. Untagged lines get `[label] ` prepended if set.
    Stdin { label: Option<String> },
    /// A scanner command whose stdout lines are tagged with `label`.
    Command { label: String, command: String },
}

impl FeedSpec {
    /// Parse a `LABEL=CMD` argument.
    pub fn parse_exec(arg: &str) -> Result<Self, String> {
        let Some((label, command)) = arg.split_once('=') else {
            return Err(format!("expected LABEL=CMD, got {arg:?}"));
        };
        let label = label.trim();
        let command = command.trim();
        if label.is_empty() || label.contains(['[', ']']) {
            return Err(format!("invalid feed label {label:?}"));
        }
        if command.is_empty() {
            return Err(format!("empty command for feed {label:?}"));
        }
        Ok(Self::Command {
            label: label.to_string(),
            command: command.to_string(),
        })
    }

    pub fn name(&self) -> String {
        match self {
            Self::Stdin { .. } => "stdin".to_string(),
            Self::Command { label, .. } => format!("exec:{label}"),
        }
    }
}

/// Prepend `[label] ` to a stdin line unless it already carries a bracketed
/// tag.
pub fn tag_line(line: &str, label: Option<&str>) -> String {
    match label {
        Some(label) if !line.trim_start().starts_with('[') => format!("[{label}] {line}"),
        _ => line.to_string(),
    }
}

/// Command output always belongs to its feed, so bracketed lines such as
/// `[CHG] Device ...` are tagged too.
pub fn tag_command_line(line: &str, label: &str) -> String {
    format!("[{label}] {line}")
}

// ---------------------------------------------------------------------------
// Backoff
// ---------------------------------------------------------------------------

/// Restart delay: 1 s doubling to 30 s, reset after a stable run.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            next: INITIAL_BACKOFF,
        }
    }
}

impl Backoff {
    /// Delay before the next start, given how long the last run lasted.
    pub fn after_run(&mut self, ran_for: Duration) -> Duration {
        if ran_for >= STABLE_RUN {
            self.next = INITIAL_BACKOFF;
        }
        let delay = self.next;
        self.next = (self.next * 2).min(MAX_BACKOFF);
        delay
    }
}

// ---------------------------------------------------------------------------
// Lossy line reader
// ---------------------------------------------------------------------------

/// Lines from `reader` with invalid UTF-8 replaced and line endings removed.
pub fn lossy_lines<R: BufRead>(reader: R) -> LossyLines<R> {
    LossyLines {
        reader,
        buf: Vec::new(),
    }
}

pub struct LossyLines<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> Iterator for LossyLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
                    self.buf.pop();
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

// ---------------------------------------------------------------------------
// FeedSet
// ---------------------------------------------------------------------------

pub enum FeedMessage {
    Line(String),
    /// The named feed has ended for good.
    Closed(String),
}

/// Receiving end of all feeds.
pub struct FeedSet {
    rx: Receiver<FeedMessage>,
    open: usize,
}

impl FeedSet {
    /// Start one thread per spec. With `respawn` false, command feeds run
    /// once and close when they exit.
    pub fn spawn(specs: Vec<FeedSpec>, respawn: bool, shutdown: Arc<AtomicBool>) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let open = specs.len();
        for spec in specs {
            let tx = tx.clone();
            let shutdown = Arc::clone(&shutdown);
            let name = spec.name();
            thread::Builder::new()
                .name(format!("feed-{name}"))
                .spawn(move || {
                    match spec {
                        FeedSpec::Stdin { label } => read_stdin(label.as_deref(), &tx),
                        FeedSpec::Command { label, command } => {
                            run_command(&label, &command, respawn, &shutdown, &tx)
                        }
                    }
                    let _ = tx.send(FeedMessage::Closed(name));
                })?;
        }
        Ok(Self { rx, open })
    }

    #[cfg(test)]
    pub fn from_channel(rx: Receiver<FeedMessage>, open: usize) -> Self {
        Self { rx, open }
    }

    /// True once every feed has closed.
    pub fn is_exhausted(&self) -> bool {
        self.open == 0
    }

    /// Next line, waiting at most `timeout`.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<String> {
        if self.is_exhausted() {
            thread::sleep(timeout);
            return None;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(msg) => self.accept(msg),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                self.open = 0;
                None
            }
        }
    }

    /// Next line if one is already waiting.
    pub fn try_recv(&mut self) -> Option<String> {
        if self.is_exhausted() {
            return None;
        }
        match self.rx.try_recv() {
            Ok(msg) => self.accept(msg),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.open = 0;
                None
            }
        }
    }

    fn accept(&mut self, msg: FeedMessage) -> Option<String> {
        match msg {
            FeedMessage::Line(line) => Some(line),
            FeedMessage::Closed(name) => {
                self.open = self.open.saturating_sub(1);
                log::info!("feed {name} closed ({} still open)", self.open);
                None
            }
        }
    }
}

fn read_stdin(label: Option<&str>, tx: &Sender<FeedMessage>) {
    let stdin = io::stdin();
    for line in lossy_lines(stdin.lock()) {
        match line {
            Ok(line) => {
                if tx.send(FeedMessage::Line(tag_line(&line, label))).is_err() {
                    return;
                }
            }
            Err(e) => {
                log::warn!("stdin read failed: {e}");
                return;
            }
        }
    }
}

fn run_command(
    label: &str,
    command: &str,
    respawn: bool,
    shutdown: &AtomicBool,
    tx: &Sender<FeedMessage>,
) {
    let mut backoff = Backoff::default();
    while !shutdown.load(Ordering::Relaxed) {
        let started = Instant::now();
        match stream_command(label, command, shutdown, tx) {
            Ok(StreamEnd::ReceiverGone) => return,
            Ok(StreamEnd::Exited(status)) => {
                log::warn!("feed {label}: `{command}` exited ({status})");
            }
            Err(e) => log::warn!("feed {label}: cannot run `{command}`: {e}"),
        }
        if !respawn {
            return;
        }
        let delay = backoff.after_run(started.elapsed());
        log::warn!("feed {label}: restarting in {delay:?}");
        sleep_unless_shutdown(delay, shutdown);
    }
}

enum StreamEnd {
    Exited(String),
    ReceiverGone,
}

fn stream_command(
    label: &str,
    command: &str,
    shutdown: &AtomicBool,
    tx: &Sender<FeedMessage>,
) -> io::Result<StreamEnd> {
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;
    log::info!("feed {label}: started `{command}` (pid {})", child.id());

    let Some(stdout) = child.stdout.take() else {
        let _ = child.kill();
        let _ = child.wait();
        return Err(io::Error::other("child stdout not captured"));
    };

    for line in lossy_lines(BufReader::new(stdout)) {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::warn!("feed {label}: read failed: {e}");
                break;
            }
        };
        let sent = tx.send(FeedMessage::Line(tag_command_line(&line, label)));
        if sent.is_err() || shutdown.load(Ordering::Relaxed) {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(StreamEnd::ReceiverGone);
        }
    }

    let status = child.wait()?;
    Ok(StreamEnd::Exited(status.to_string()))
}

fn sleep_unless_shutdown(total: Duration, shutdown: &AtomicBool) {
    let deadline = Instant::now() + total;
    while !shutdown.load(Ordering::Relaxed) {
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_exec_splits_on_first_equals() {
        assert_eq!(
            FeedSpec::parse_exec("A=btmon --name=x").unwrap(),
            FeedSpec::Command {
                label: "A".into(),
                command: "btmon --name=x".into(),
            }
        );
    }

    #[test]
    fn parse_exec_rejects_malformed() {
        assert!(FeedSpec::parse_exec("btmon").is_err());
        assert!(FeedSpec::parse_exec("=btmon").is_err());
        assert!(FeedSpec::parse_exec("A=").is_err());
        assert!(FeedSpec::parse_exec("[A]=btmon").is_err());
    }

    #[test]
    fn command_lines_are_always_tagged() {
        let tagged = tag_command_line("[CHG] Device AA:BB:CC:DD:EE:01 RSSI: -60", "A");
        assert_eq!(tagged, "[A] [CHG] Device AA:BB:CC:DD:EE:01 RSSI: -60");
        let event = beaconradar_core::Classifier::new("A", "B").classify(&tagged);
        assert_eq!(event.source(), Some(beaconradar_core::SourceTag::A));
    }

    #[test]
    fn tag_line_only_tags_untagged() {
        assert_eq!(tag_line("RSSI: -50", Some("A")), "[A] RSSI: -50");
        assert_eq!(tag_line("  [B] RSSI: -50", Some("A")), "  [B] RSSI: -50");
        assert_eq!(tag_line("RSSI: -50", None), "RSSI: -50");
    }

    #[test]
    fn backoff_doubles_to_cap_and_resets() {
        let mut b = Backoff::default();
        let quick = Duration::from_millis(10);
        let delays: Vec<u64> = (0..7).map(|_| b.after_run(quick).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30]);
        assert_eq!(b.after_run(STABLE_RUN), INITIAL_BACKOFF);
        assert_eq!(b.after_run(quick), Duration::from_secs(2));
    }

    #[test]
    fn lossy_lines_strips_endings_and_bad_bytes() {
        let input: &[u8] = b"one\r\ntw\xffo\nthree";
        let lines: Vec<String> = lossy_lines(input).map(Result::unwrap).collect();
        assert_eq!(lines, vec!["one", "tw\u{fffd}o", "three"]);
    }

    #[test]
    fn feed_set_counts_closed_feeds() {
        let (tx, rx) = mpsc::channel();
        let mut feeds = FeedSet::from_channel(rx, 2);
        tx.send(FeedMessage::Line("[A] x".into())).unwrap();
        tx.send(FeedMessage::Closed("a".into())).unwrap();
        tx.send(FeedMessage::Closed("b".into())).unwrap();
        assert_eq!(feeds.try_recv().as_deref(), Some("[A] x"));
        assert_eq!(feeds.try_recv(), None);
        assert!(!feeds.is_exhausted());
        assert_eq!(feeds.try_recv(), None);
        assert!(feeds.is_exhausted());
    }

    #[test]
    fn command_feed_tags_and_closes() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let spec = FeedSpec::Command {
            label: "B".into(),
            command: "printf 'RSSI: -40\\nRSSI: -41\\n'".into(),
        };
        let mut feeds = FeedSet::spawn(vec![spec], false, shutdown).unwrap();
        let mut lines = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(10);
        while !feeds.is_exhausted() && Instant::now() < deadline {
            if let Some(line) = feeds.recv_timeout(Duration::from_millis(50)) {
                lines.push(line);
            }
        }
        assert_eq!(lines, vec!["[B] RSSI: -40", "[B] RSSI: -41"]);
    }
}
