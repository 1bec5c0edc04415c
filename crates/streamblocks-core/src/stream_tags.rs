//! Stream Tags
//!
//! Key-value annotations attached to absolute sample offsets of an input
//! stream. The time keeper reads `rx_time` tags, whose value is a
//! [`TimeSpec`] of whole plus fractional seconds.
//!
//! The host runtime owns tag storage; blocks only see it through the
//! [`TagSource`] range query. [`TagStore`] is an in-memory implementation
//! suitable for tests and simple drivers.
//!
//! ## Example
//!
//! ```rust
//! use streamblocks_core::stream_tags::{keys, TagSource, TagStore, TagValue, TimeSpec};
//!
//! let mut tags = TagStore::new();
//! tags.add(0, 100, keys::RX_TIME, TagValue::Time(TimeSpec::new(1_700_000_000, 0.25)));
//! tags.add(0, 120, "burst_start", TagValue::Bool(true));
//!
//! let found = tags.tags_in_range(0, 90, 110, keys::RX_TIME);
//! assert_eq!(found.len(), 1);
//! assert_eq!(found[0].offset, 100);
//! ```

use std::collections::BTreeMap;
use std::fmt;

/// Absolute time as whole seconds plus a fractional part.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeSpec {
    pub secs: u64,
    pub frac: f64,
}

impl TimeSpec {
    pub fn new(secs: u64, frac: f64) -> Self {
        Self { secs, frac }
    }

    /// Seconds as a single float.
    pub fn as_secs_f64(&self) -> f64 {
        self.secs as f64 + self.frac
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{:.9}s", self.secs, self.frac)
    }
}

/// Tag value.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// `(u64 seconds, f64 fractional seconds)` pair, as carried by `rx_time`.
    Time(TimeSpec),
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Bool(v) => write!(f, "{v}"),
            TagValue::Int(v) => write!(f, "{v}"),
            TagValue::Float(v) => write!(f, "{v:.6}"),
            TagValue::String(v) => write!(f, "\"{v}\""),
            TagValue::Time(v) => write!(f, "{v}"),
        }
    }
}

impl TagValue {
    /// Try to get as a time pair.
    pub fn as_time(&self) -> Option<TimeSpec> {
        match self {
            TagValue::Time(t) => Some(*t),
            _ => None,
        }
    }

    /// Try to get as float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            TagValue::Float(v) => Some(*v),
            TagValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }
}

/// A single stream tag.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamTag {
    /// Absolute sample offset the tag is attached to.
    pub offset: u64,
    pub key: String,
    pub value: TagValue,
}

impl StreamTag {
    pub fn new(offset: u64, key: impl Into<String>, value: TagValue) -> Self {
        Self {
            offset,
            key: key.into(),
            value,
        }
    }
}

impl fmt::Display for StreamTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}: {} = {}", self.offset, self.key, self.value)
    }
}

/// Range query over the tags of an input stream.
pub trait TagSource {
    /// Tags on `channel` with `key` whose offset lies in `[start, end)`,
    /// ordered by offset (insertion order for equal offsets).
    fn tags_in_range(&self, channel: usize, start: u64, end: u64, key: &str) -> Vec<StreamTag>;
}

/// In-memory, per-channel tag store.
///
/// Tags are indexed by `(channel, offset, sequence)` so that range queries
/// come back sorted and tags at the same offset keep insertion order.
#[derive(Debug, Clone, Default)]
pub struct TagStore {
    tags: BTreeMap<(usize, u64, u32), StreamTag>,
    seq: u32,
}

impl TagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag on `channel` at `offset`.
    pub fn add(&mut self, channel: usize, offset: u64, key: impl Into<String>, value: TagValue) {
        self.add_tag(channel, StreamTag::new(offset, key, value));
    }

    /// Add a pre-built tag on `channel`.
    pub fn add_tag(&mut self, channel: usize, tag: StreamTag) {
        self.tags.insert((channel, tag.offset, self.seq), tag);
        self.seq = self.seq.wrapping_add(1);
    }

    /// Add an `rx_time` tag.
    pub fn add_time(&mut self, channel: usize, offset: u64, time: TimeSpec) {
        self.add(channel, offset, keys::RX_TIME, TagValue::Time(time));
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Drop every tag on `channel` before `offset`.
    pub fn trim_before(&mut self, channel: usize, offset: u64) {
        self.tags
            .retain(|&(ch, off, _), _| ch != channel || off >= offset);
    }

    pub fn clear(&mut self) {
        self.tags.clear();
        self.seq = 0;
    }
}

impl TagSource for TagStore {
    fn tags_in_range(&self, channel: usize, start: u64, end: u64, key: &str) -> Vec<StreamTag> {
        if end <= start {
            return Vec::new();
        }
        self.tags
            .range((channel, start, 0)..(channel, end, 0))
            .map(|(_, tag)| tag)
            .filter(|tag| tag.key == key)
            .cloned()
            .collect()
    }
}

/// Well-known tag keys.
pub mod keys {
    /// Absolute reception time (`TagValue::Time`).
    pub const RX_TIME: &str = "rx_time";
    /// Sample rate in Hz (`TagValue::Float`).
    pub const RX_RATE: &str = "rx_rate";
}
