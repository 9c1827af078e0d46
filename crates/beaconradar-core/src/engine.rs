//! The radar engine: one state object fed one line at a time.
//!
//! [`Engine::ingest`] classifies a line and applies it to the store (and the
//! sighting log, for accepted readings). [`Engine::poll_redraw`] is called
//! after every line and on every idle tick; when the redraw interval has
//! elapsed it evicts stale records and returns a fresh [`Frame`].
//!
//! Nothing here is fatal. Lines that change nothing are counted in
//! [`IngestStats`] and logged at `trace`.

use std::time::Duration;

use serde::Serialize;

use crate::address::{DeviceAddress, SourceTag};
use crate::classify::{Classifier, LineEvent};
use crate::clock::Clock;
use crate::config::RadarConfig;
use crate::render::{Frame, Renderer};
use crate::scheduler::RedrawScheduler;
use crate::sightings::{SightingLogger, format_timestamp};
use crate::store::{DeviceStore, Rejection, Sighting, SignalOutcome};

/// Running counters since the engine started (or was last cleared).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub lines: u64,
    pub accepted: u64,
    pub unresolved: u64,
    pub filtered: u64,
    pub ignored: u64,
    pub evicted: u64,
    pub log_failures: u64,
}

/// What one ingested line did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Ignored,
    Address(SourceTag, DeviceAddress),
    Name(SourceTag),
    Accepted(Sighting),
    Rejected(Rejection),
}

/// Serializable view of the live state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub timestamp: String,
    pub sweep_angle: f64,
    pub stats: IngestStats,
    pub devices: Vec<DeviceSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSnapshot {
    pub address: DeviceAddress,
    pub source: SourceTag,
    pub rssi: i32,
    pub age_secs: f64,
    pub name: Option<String>,
    pub history: Vec<i32>,
}

pub struct Engine {
    config: RadarConfig,
    clock: Box<dyn Clock>,
    classifier: Classifier,
    store: DeviceStore,
    scheduler: RedrawScheduler,
    renderer: Renderer,
    logger: Option<SightingLogger>,
    stats: IngestStats,
}

impl Engine {
    /// `config` is expected to have passed [`RadarConfig::validate`].
    pub fn new(config: RadarConfig, clock: Box<dyn Clock>, logger: Option<SightingLogger>) -> Self {
        let classifier = Classifier::new(&config.source_a_label, &config.source_b_label);
        let store = DeviceStore::new(
            config.history_len,
            config.association_window(),
            config.prefix_allow.clone(),
        );
        let scheduler = RedrawScheduler::new(config.draw_interval());
        let renderer = Renderer::new(&config);
        log::info!(
            "radar {}x{} interval {:?} max age {:?} history {} prefixes {:?}",
            config.grid_width,
            config.grid_height,
            config.draw_interval(),
            config.max_age(),
            config.history_len,
            config.prefix_allow,
        );
        Self {
            config,
            clock,
            classifier,
            store,
            scheduler,
            renderer,
            logger,
            stats: IngestStats::default(),
        }
    }

    pub fn config(&self) -> &RadarConfig {
        &self.config
    }

    pub fn store(&self) -> &DeviceStore {
        &self.store
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn idle_tick(&self) -> Duration {
        self.config.idle_tick()
    }

    pub fn draw_interval(&self) -> Duration {
        self.scheduler.interval()
    }

    pub fn set_draw_interval(&mut self, interval: Duration) {
        self.scheduler.set_interval(interval);
    }

    pub fn logger(&self) -> Option<&SightingLogger> {
        self.logger.as_ref()
    }

    /// Classify and apply one input line.
    pub fn ingest(&mut self, line: &str) -> IngestOutcome {
        self.stats.lines += 1;
        let now = self.clock.now();

        match self.classifier.classify(line) {
            LineEvent::Ignored => {
                self.stats.ignored += 1;
                log::trace!("ignored line: {line:?}");
                IngestOutcome::Ignored
            }
            LineEvent::Address { source, address } => {
                self.store.record_address(source, address, now);
                IngestOutcome::Address(source, address)
            }
            LineEvent::Name { source, name } => {
                self.store.record_name(source, &name, now);
                IngestOutcome::Name(source)
            }
            LineEvent::Signal { source, rssi } => match self.store.record_signal(source, rssi, now) {
                SignalOutcome::Accepted(sighting) => {
                    self.stats.accepted += 1;
                    self.write_sighting(&sighting);
                    IngestOutcome::Accepted(sighting)
                }
                SignalOutcome::Rejected(rejection) => {
                    match rejection {
                        Rejection::Unresolved => {
                            self.stats.unresolved += 1;
                            log::trace!("rssi {rssi} on {source}: no address in window");
                        }
                        Rejection::FilteredOut => {
                            self.stats.filtered += 1;
                            log::trace!("rssi {rssi} on {source}: address not in allow-list");
                        }
                    }
                    IngestOutcome::Rejected(rejection)
                }
            },
        }
    }

    fn write_sighting(&mut self, sighting: &Sighting) {
        let Some(logger) = self.logger.as_mut() else {
            return;
        };
        if let Err(e) = logger.append(sighting) {
            self.stats.log_failures += 1;
            log::warn!("sighting log write failed: {e}");
        }
    }

    /// Evict and render if the redraw interval has elapsed.
    pub fn poll_redraw(&mut self) -> Option<Frame> {
        let now = self.clock.now();
        if !self.scheduler.due(now) {
            return None;
        }
        Some(self.redraw_at(now))
    }

    /// Evict and render unconditionally, without touching the schedule.
    pub fn render_now(&mut self) -> Frame {
        let now = self.clock.now();
        self.redraw_at(now)
    }

    fn redraw_at(&mut self, now: Duration) -> Frame {
        let max_age = self.config.max_age();
        let evicted = self.store.evict(now, max_age);
        if evicted > 0 {
            self.stats.evicted += evicted as u64;
            log::debug!("evicted {evicted} stale record(s)");
        }
        self.renderer.render(&self.store, now, max_age, &self.stats)
    }

    /// Drop every record and reset the counters.
    pub fn clear(&mut self) {
        self.store.clear();
        self.stats = IngestStats::default();
    }

    /// Live records in key order.
    pub fn snapshot(&self) -> Snapshot {
        let now = self.clock.now();
        let max_age = self.config.max_age();
        let mut devices: Vec<_> = self
            .store
            .records()
            .filter(|(_, record)| !record.is_stale(now, max_age))
            .collect();
        devices.sort_by_key(|(key, _)| **key);

        Snapshot {
            timestamp: format_timestamp(now),
            sweep_angle: self.renderer.sweep_angle(),
            stats: self.stats.clone(),
            devices: devices
                .into_iter()
                .map(|(key, record)| DeviceSnapshot {
                    address: key.address,
                    source: key.source,
                    rssi: record.last_rssi,
                    age_secs: record.age(now).as_secs_f64(),
                    name: record.name.clone(),
                    history: record.history.iter().copied().collect(),
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
