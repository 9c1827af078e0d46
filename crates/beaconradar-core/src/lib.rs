//! # beaconradar-core
//!
//! **A live polar radar for BLE beacon sightings.**
//!
//! Scanner text arrives one line at a time, tagged by source (`[A] ...`,
//! `[B] ...`). The engine stitches address, name and RSSI lines back into
//! sightings, keeps a bounded per-device history, and redraws a polar frame
//! at a fixed cadence: range rings, a rotating sweep beam, one marker per
//! device and a ranked legend with trend sparklines. Every accepted reading
//! is appended to a CSV sighting log.
//!
//! ## Quick Start
//!
//! ```
//! use std::time::Duration;
//! use beaconradar_core::{Engine, ManualClock, RadarConfig};
//!
//! let clock = ManualClock::starting_at(Duration::from_secs(1_000));
//! let mut engine = Engine::new(RadarConfig::default(), Box::new(clock), None);
//!
//! engine.ingest("[A] Address: AA:BB:CC:DD:EE:01");
//! engine.ingest("[A] RSSI: -50 dBm");
//!
//! let frame = engine.poll_redraw().expect("first redraw is always due");
//! assert_eq!(frame.live_devices, 1);
//! for line in frame.lines() {
//!     println!("{line}");
//! }
//! ```
//!
//! ## Architecture
//!
//! Line → Classifier → Store (+ Sighting log) ... Scheduler → Evict → Renderer
//!
//! The engine is single-threaded and owns all state. Producers (child
//! scanners, stdin) live outside the core and feed it through one ordered
//! channel.

pub mod address;
pub mod classify;
pub mod clock;
pub mod config;
pub mod engine;
pub mod projection;
pub mod render;
pub mod scheduler;
pub mod sightings;
pub mod store;

pub use address::{DeviceAddress, SightingKey, SourceTag, normalize_prefix};
pub use classify::{Classifier, LineEvent};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, LegendLayout, RadarConfig};
pub use engine::{DeviceSnapshot, Engine, IngestOutcome, IngestStats, Snapshot};
pub use projection::{Geometry, RssiScale, angle_degrees, project};
pub use render::{Frame, Legend, LegendRow, Renderer};
pub use scheduler::RedrawScheduler;
pub use sightings::SightingLogger;
pub use store::{DeviceRecord, DeviceStore, Rejection, Sighting, SignalOutcome};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
