//! Device state store: per-source association context and per-key records.
//!
//! Address, name and RSSI arrive on separate lines. The store stitches them
//! back together per source: an address opens a short association window,
//! and the next RSSI line on the same source inside that window becomes one
//! sighting for that address.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use serde::Serialize;

use crate::address::{DeviceAddress, SightingKey, SourceTag};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Everything known about one (address, source) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub last_seen: Duration,
    pub last_rssi: i32,
    /// Most recent readings, oldest first. Never longer than the store's
    /// history bound.
    pub history: VecDeque<i32>,
    /// Sticky once learned.
    pub name: Option<String>,
}

impl DeviceRecord {
    pub fn age(&self, now: Duration) -> Duration {
        now.saturating_sub(self.last_seen)
    }

    pub fn is_stale(&self, now: Duration, max_age: Duration) -> bool {
        self.age(now) > max_age
    }
}

/// Transient per-source context between an address line and its RSSI line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceContext {
    /// Consumed by the first RSSI line that uses it.
    pub pending_address: Option<DeviceAddress>,
    /// Last address heard on this source; not consumed.
    pub last_address: Option<DeviceAddress>,
    pub address_seen_at: Duration,
    pub pending_name: Option<String>,
}

/// An accepted RSSI reading, ready for the sighting log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sighting {
    pub timestamp: Duration,
    pub source: SourceTag,
    pub address: DeviceAddress,
    pub rssi: i32,
    pub name: Option<String>,
}

/// Why an RSSI reading changed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// No address on this source inside the association window.
    Unresolved,
    /// The resolved address is outside the prefix allow-list.
    FilteredOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalOutcome {
    Accepted(Sighting),
    Rejected(Rejection),
}

// ---------------------------------------------------------------------------
// DeviceStore
// ---------------------------------------------------------------------------

pub struct DeviceStore {
    records: HashMap<SightingKey, DeviceRecord>,
    contexts: HashMap<SourceTag, SourceContext>,
    history_len: usize,
    association_window: Duration,
    prefix_allow: Vec<String>,
}

impl DeviceStore {
    /// `prefix_allow` entries must be uppercase; an empty list disables
    /// filtering.
    pub fn new(history_len: usize, association_window: Duration, prefix_allow: Vec<String>) -> Self {
        Self {
            records: HashMap::new(),
            contexts: HashMap::new(),
            history_len,
            association_window,
            prefix_allow,
        }
    }

    /// Note an address line: it becomes the pending context for `source`.
    pub fn record_address(&mut self, source: SourceTag, address: DeviceAddress, now: Duration) {
        let ctx = self.contexts.entry(source).or_default();
        ctx.pending_address = Some(address);
        ctx.last_address = Some(address);
        ctx.address_seen_at = now;
        // A name belongs to the advertisement that follows its address.
        ctx.pending_name = None;
    }

    /// Note a name line. Names an existing record for the current address if
    /// that record has no name yet.
    pub fn record_name(&mut self, source: SourceTag, name: &str, now: Duration) {
        let ctx = self.contexts.entry(source).or_default();
        ctx.pending_name = Some(name.to_string());

        if now.saturating_sub(ctx.address_seen_at) > self.association_window {
            return;
        }
        let Some(address) = ctx.last_address else {
            return;
        };
        if let Some(record) = self.records.get_mut(&SightingKey::new(address, source)) {
            if record.name.is_none() {
                record.name = Some(name.to_string());
            }
        }
    }

    /// Combine an RSSI reading with the pending address on `source`.
    pub fn record_signal(&mut self, source: SourceTag, rssi: i32, now: Duration) -> SignalOutcome {
        let ctx = self.contexts.entry(source).or_default();
        let address = match ctx.pending_address {
            Some(address) if now.saturating_sub(ctx.address_seen_at) <= self.association_window => {
                address
            }
            _ => return SignalOutcome::Rejected(Rejection::Unresolved),
        };

        if !self.prefix_allow.is_empty()
            && !self.prefix_allow.iter().any(|p| address.has_prefix(p))
        {
            ctx.pending_address = None;
            return SignalOutcome::Rejected(Rejection::FilteredOut);
        }

        ctx.pending_address = None;
        let pending_name = ctx.pending_name.clone();
        let history_len = self.history_len;

        let record = self
            .records
            .entry(SightingKey::new(address, source))
            .or_insert_with(|| DeviceRecord {
                last_seen: now,
                last_rssi: rssi,
                history: VecDeque::with_capacity(history_len),
                name: None,
            });
        record.last_seen = now;
        record.last_rssi = rssi;
        record.history.push_back(rssi);
        while record.history.len() > history_len {
            record.history.pop_front();
        }
        if record.name.is_none() {
            record.name = pending_name;
        }

        SignalOutcome::Accepted(Sighting {
            timestamp: now,
            source,
            address,
            rssi,
            name: record.name.clone(),
        })
    }

    /// Remove every record older than `max_age`. Returns how many went.
    pub fn evict(&mut self, now: Duration, max_age: Duration) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| !record.is_stale(now, max_age));
        before - self.records.len()
    }

    pub fn get(&self, key: &SightingKey) -> Option<&DeviceRecord> {
        self.records.get(key)
    }

    pub fn records(&self) -> impl Iterator<Item = (&SightingKey, &DeviceRecord)> {
        self.records.iter()
    }

    pub fn context(&self, source: SourceTag) -> Option<&SourceContext> {
        self.contexts.get(&source)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop all records; source contexts survive.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn history_len(&self) -> usize {
        self.history_len
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(2);

    fn addr(s: &str) -> DeviceAddress {
        s.parse().unwrap()
    }

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn store() -> DeviceStore {
        DeviceStore::new(3, WINDOW, Vec::new())
    }

    #[test]
    fn address_then_signal_creates_record() {
        let mut s = store();
        let a = addr("AA:BB:CC:DD:EE:01");
        s.record_address(SourceTag::A, a, secs(100.0));
        let outcome = s.record_signal(SourceTag::A, -50, secs(100.1));

        let SignalOutcome::Accepted(sighting) = outcome else {
            panic!("expected acceptance, got {outcome:?}");
        };
        assert_eq!(sighting.address, a);
        assert_eq!(sighting.rssi, -50);
        let record = s.get(&SightingKey::new(a, SourceTag::A)).unwrap();
        assert_eq!(record.last_rssi, -50);
        assert_eq!(record.last_seen, secs(100.1));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn signal_without_address_is_unresolved() {
        let mut s = store();
        assert_eq!(
            s.record_signal(SourceTag::A, -50, secs(1.0)),
            SignalOutcome::Rejected(Rejection::Unresolved)
        );
        assert!(s.is_empty());
    }

    #[test]
    fn stale_address_is_unresolved() {
        let mut s = store();
        s.record_address(SourceTag::A, addr("AA:BB:CC:DD:EE:01"), secs(10.0));
        assert_eq!(
            s.record_signal(SourceTag::A, -50, secs(12.5)),
            SignalOutcome::Rejected(Rejection::Unresolved)
        );
        assert!(s.is_empty());
    }

    #[test]
    fn address_on_other_source_does_not_resolve() {
        let mut s = store();
        s.record_address(SourceTag::B, addr("AA:BB:CC:DD:EE:01"), secs(10.0));
        assert_eq!(
            s.record_signal(SourceTag::A, -50, secs(10.0)),
            SignalOutcome::Rejected(Rejection::Unresolved)
        );
    }

    #[test]
    fn address_is_consumed_by_one_signal() {
        let mut s = store();
        s.record_address(SourceTag::A, addr("AA:BB:CC:DD:EE:01"), secs(10.0));
        assert!(matches!(
            s.record_signal(SourceTag::A, -50, secs(10.0)),
            SignalOutcome::Accepted(_)
        ));
        assert_eq!(
            s.record_signal(SourceTag::A, -51, secs(10.1)),
            SignalOutcome::Rejected(Rejection::Unresolved)
        );
    }

    #[test]
    fn history_is_bounded_and_ordered() {
        let mut s = store();
        let a = addr("AA:BB:CC:DD:EE:01");
        for (i, rssi) in [-40, -41, -42, -43].into_iter().enumerate() {
            let t = secs(i as f64);
            s.record_address(SourceTag::A, a, t);
            s.record_signal(SourceTag::A, rssi, t);
        }
        let record = s.get(&SightingKey::new(a, SourceTag::A)).unwrap();
        assert_eq!(record.history, VecDeque::from(vec![-41, -42, -43]));
        assert_eq!(record.last_rssi, -43);
    }

    #[test]
    fn zero_history_len_keeps_history_empty() {
        let mut s = DeviceStore::new(0, WINDOW, Vec::new());
        let a = addr("AA:BB:CC:DD:EE:01");
        s.record_address(SourceTag::A, a, secs(0.0));
        s.record_signal(SourceTag::A, -40, secs(0.0));
        assert!(s.get(&SightingKey::new(a, SourceTag::A)).unwrap().history.is_empty());
    }

    #[test]
    fn same_address_on_two_sources_is_two_records() {
        let mut s = store();
        let a = addr("AA:BB:CC:DD:EE:01");
        s.record_address(SourceTag::A, a, secs(0.0));
        s.record_address(SourceTag::B, a, secs(0.0));
        s.record_signal(SourceTag::A, -40, secs(0.1));
        s.record_signal(SourceTag::B, -70, secs(0.1));
        assert_eq!(s.len(), 2);
        assert_eq!(s.get(&SightingKey::new(a, SourceTag::A)).unwrap().last_rssi, -40);
        assert_eq!(s.get(&SightingKey::new(a, SourceTag::B)).unwrap().last_rssi, -70);
    }

    #[test]
    fn prefix_filter_rejects_outsiders() {
        let mut s = DeviceStore::new(3, WINDOW, vec!["AA:BB:CC".into()]);
        s.record_address(SourceTag::A, addr("11:22:33:44:55:66"), secs(0.0));
        assert_eq!(
            s.record_signal(SourceTag::A, -40, secs(0.0)),
            SignalOutcome::Rejected(Rejection::FilteredOut)
        );
        assert!(s.is_empty());

        s.record_address(SourceTag::A, addr("AA:BB:CC:01:02:03"), secs(0.0));
        assert!(matches!(
            s.record_signal(SourceTag::A, -40, secs(0.0)),
            SignalOutcome::Accepted(_)
        ));
    }

    #[test]
    fn pending_name_backfills_new_record() {
        let mut s = store();
        let a = addr("AA:BB:CC:DD:EE:01");
        s.record_address(SourceTag::A, a, secs(0.0));
        s.record_name(SourceTag::A, "Tile", secs(0.0));
        let SignalOutcome::Accepted(sighting) = s.record_signal(SourceTag::A, -40, secs(0.0)) else {
            panic!("expected acceptance");
        };
        assert_eq!(sighting.name.as_deref(), Some("Tile"));
    }

    #[test]
    fn name_after_signal_names_existing_record() {
        let mut s = store();
        let a = addr("AA:BB:CC:DD:EE:01");
        s.record_address(SourceTag::A, a, secs(0.0));
        s.record_signal(SourceTag::A, -40, secs(0.0));
        s.record_name(SourceTag::A, "Late", secs(0.5));
        let record = s.get(&SightingKey::new(a, SourceTag::A)).unwrap();
        assert_eq!(record.name.as_deref(), Some("Late"));
    }

    #[test]
    fn name_is_sticky() {
        let mut s = store();
        let a = addr("AA:BB:CC:DD:EE:01");
        s.record_address(SourceTag::A, a, secs(0.0));
        s.record_name(SourceTag::A, "First", secs(0.0));
        s.record_signal(SourceTag::A, -40, secs(0.0));

        s.record_address(SourceTag::A, a, secs(1.0));
        s.record_name(SourceTag::A, "Second", secs(1.0));
        s.record_signal(SourceTag::A, -41, secs(1.0));

        let record = s.get(&SightingKey::new(a, SourceTag::A)).unwrap();
        assert_eq!(record.name.as_deref(), Some("First"));
    }

    #[test]
    fn new_address_clears_previous_name() {
        let mut s = store();
        s.record_address(SourceTag::A, addr("AA:BB:CC:DD:EE:01"), secs(0.0));
        s.record_name(SourceTag::A, "Tile", secs(0.0));
        let b = addr("AA:BB:CC:DD:EE:02");
        s.record_address(SourceTag::A, b, secs(0.1));
        s.record_signal(SourceTag::A, -40, secs(0.1));
        assert_eq!(s.get(&SightingKey::new(b, SourceTag::A)).unwrap().name, None);
    }

    #[test]
    fn evict_removes_only_stale_records() {
        let mut s = store();
        let old = addr("AA:BB:CC:DD:EE:01");
        let new = addr("AA:BB:CC:DD:EE:02");
        s.record_address(SourceTag::A, old, secs(0.0));
        s.record_signal(SourceTag::A, -40, secs(0.0));
        s.record_address(SourceTag::A, new, secs(20.0));
        s.record_signal(SourceTag::A, -40, secs(20.0));

        let removed = s.evict(secs(31.0), Duration::from_secs(30));
        assert_eq!(removed, 1);
        assert!(s.get(&SightingKey::new(old, SourceTag::A)).is_none());
        assert!(s.get(&SightingKey::new(new, SourceTag::A)).is_some());
        for (_, record) in s.records() {
            assert!(record.age(secs(31.0)) <= Duration::from_secs(30));
        }
    }

    #[test]
    fn record_at_exact_max_age_survives() {
        let mut s = store();
        let a = addr("AA:BB:CC:DD:EE:01");
        s.record_address(SourceTag::A, a, secs(0.0));
        s.record_signal(SourceTag::A, -40, secs(0.0));
        assert_eq!(s.evict(secs(30.0), Duration::from_secs(30)), 0);
    }
}
