//! Device addresses, source tags and the key that pairs them.
//!
//! A sighting is always attributed to one scanning source. The same physical
//! device heard by two sources yields two independent [`SightingKey`]s.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

// ---------------------------------------------------------------------------
// DeviceAddress
// ---------------------------------------------------------------------------

/// A 6-byte hardware address, displayed as `AA:BB:CC:DD:EE:FF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceAddress([u8; 6]);

impl DeviceAddress {
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; 6] {
        self.0
    }

    /// The low-order byte, used as the pseudo-bearing on the radar.
    pub fn low_byte(&self) -> u8 {
        self.0[5]
    }

    /// Whether the rendered address begins with `prefix`.
    ///
    /// `prefix` must already be normalized to uppercase (see
    /// [`normalize_prefix`]).
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.to_string().starts_with(prefix)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl Serialize for DeviceAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Error returned when a string is not six colon-separated hex bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressParseError(pub String);

impl fmt::Display for AddressParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid device address '{}'", self.0)
    }
}

impl std::error::Error for AddressParseError {}

impl FromStr for DeviceAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut parts = s.trim().split(':');
        for slot in bytes.iter_mut() {
            let part = parts
                .next()
                .ok_or_else(|| AddressParseError(s.to_string()))?;
            if part.len() != 2 {
                return Err(AddressParseError(s.to_string()));
            }
            *slot = u8::from_str_radix(part, 16).map_err(|_| AddressParseError(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(AddressParseError(s.to_string()));
        }
        Ok(Self(bytes))
    }
}

/// Normalize an allow-list prefix such as `aa:bb:cc` to `AA:BB:CC`.
///
/// Returns `None` unless the prefix is 1–6 colon-separated two-digit hex
/// groups.
pub fn normalize_prefix(prefix: &str) -> Option<String> {
    let trimmed = prefix.trim().trim_end_matches(':');
    let groups: Vec<&str> = trimmed.split(':').collect();
    if groups.is_empty() || groups.len() > 6 {
        return None;
    }
    let valid = groups
        .iter()
        .all(|g| g.len() == 2 && g.chars().all(|c| c.is_ascii_hexdigit()));
    if !valid {
        return None;
    }
    Some(trimmed.to_ascii_uppercase())
}

// ---------------------------------------------------------------------------
// SourceTag
// ---------------------------------------------------------------------------

/// Which scanning channel produced a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SourceTag {
    A,
    B,
    /// A bracketed label that matched neither configured source.
    Unknown,
}

impl SourceTag {
    /// Map a bracketed line label onto a tag, case-insensitively.
    pub fn from_label(label: &str, label_a: &str, label_b: &str) -> Self {
        let label = label.trim();
        if label.eq_ignore_ascii_case(label_a) {
            Self::A
        } else if label.eq_ignore_ascii_case(label_b) {
            Self::B
        } else {
            Self::Unknown
        }
    }

    /// One-character radar marker.
    pub fn marker(self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::Unknown => '?',
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Identity of one device record: address as heard by one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SightingKey {
    pub address: DeviceAddress,
    pub source: SourceTag,
}

impl SightingKey {
    pub fn new(address: DeviceAddress, source: SourceTag) -> Self {
        Self { address, source }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
