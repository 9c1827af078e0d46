//! Line classifier: noisy scanner text → structured sighting events.
//!
//! Each line must start with a bracketed source label (`[A] ...`). The rest of
//! the line is matched against one ordered pattern table; the first pattern
//! that matches decides the event, so a line yields at most one event.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;

use crate::address::{DeviceAddress, SourceTag};

/// Bracketed source label at the start of a line.
static SOURCE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[([^\]]*)\]").unwrap());

/// One classified input line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LineEvent {
    Address {
        source: SourceTag,
        address: DeviceAddress,
    },
    Name {
        source: SourceTag,
        name: String,
    },
    Signal {
        source: SourceTag,
        rssi: i32,
    },
    /// No source label, no pattern matched, empty name, or a value that
    /// failed numeric conversion.
    Ignored,
}

impl LineEvent {
    pub fn source(&self) -> Option<SourceTag> {
        match self {
            Self::Address { source, .. } | Self::Name { source, .. } | Self::Signal { source, .. } => {
                Some(*source)
            }
            Self::Ignored => None,
        }
    }
}

/// Builds an event from a pattern's captures, or `None` if the captured
/// value turns out to be unusable.
type EventBuilder = fn(&Captures, SourceTag) -> Option<LineEvent>;

/// Ordered pattern table plus the labels that identify the two sources.
pub struct Classifier {
    patterns: Vec<(&'static str, Regex, EventBuilder)>,
    label_a: String,
    label_b: String,
}

impl Classifier {
    pub fn new(label_a: &str, label_b: &str) -> Self {
        Self {
            patterns: vec![
                // "Address: AA:BB:CC:DD:EE:FF (Random)"
                (
                    "address",
                    Regex::new(r"(?i)\bAddress:\s*((?:[0-9a-f]{2}:){5}[0-9a-f]{2})\b").unwrap(),
                    address_event as EventBuilder,
                ),
                // "Name (complete): Tile" or "Name: Tile"
                (
                    "name",
                    Regex::new(r"(?i)\bName[^:]*:(.*)$").unwrap(),
                    name_event as EventBuilder,
                ),
                // "RSSI: -67 dBm (0xbd)"
                (
                    "rssi",
                    Regex::new(r"(?i)\bRSSI:\s*([+-]?\d+)").unwrap(),
                    signal_event as EventBuilder,
                ),
            ],
            label_a: label_a.to_string(),
            label_b: label_b.to_string(),
        }
    }

    /// Classify one line.
    pub fn classify(&self, line: &str) -> LineEvent {
        let Some(prefix) = SOURCE_PREFIX.captures(line) else {
            return LineEvent::Ignored;
        };
        let source = SourceTag::from_label(&prefix[1], &self.label_a, &self.label_b);
        let body = &line[prefix.get(0).map_or(0, |m| m.end())..];

        for (name, regex, build) in &self.patterns {
            if let Some(caps) = regex.captures(body) {
                let event = build(&caps, source);
                if event.is_none() {
                    log::trace!("{name} field matched but value unusable: {body:?}");
                }
                return event.unwrap_or(LineEvent::Ignored);
            }
        }
        LineEvent::Ignored
    }

    /// Names of the patterns in match order.
    pub fn pattern_names(&self) -> Vec<&'static str> {
        self.patterns.iter().map(|(name, _, _)| *name).collect()
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new("A", "B")
    }
}

fn address_event(caps: &Captures, source: SourceTag) -> Option<LineEvent> {
    let address = caps[1].parse::<DeviceAddress>().ok()?;
    Some(LineEvent::Address { source, address })
}

fn name_event(caps: &Captures, source: SourceTag) -> Option<LineEvent> {
    let name = sanitize_name(&caps[1]);
    if name.is_empty() {
        return None;
    }
    Some(LineEvent::Name { source, name })
}

fn signal_event(caps: &Captures, source: SourceTag) -> Option<LineEvent> {
    let rssi = caps[1].parse::<i32>().ok()?;
    Some(LineEvent::Signal { source, rssi })
}

/// Strip control characters and surrounding whitespace from a name field.
fn sanitize_name(raw: &str) -> String {
    let cleaned: String = raw.chars().filter(|c| !c.is_control()).collect();
    cleaned.trim().to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
