//! Time Keeper
//!
//! Reconstructs a continuous absolute time axis for a sample stream from
//! sparse `rx_time` tags. The block is a sink: it reads no sample values and
//! produces no output stream. Its effect is the queryable current time and a
//! `status` message port that receives an `update` signal for every time
//! tag it accepts.
//!
//! ## Time model
//!
//! ```text
//!   stream:  ...........T1...................T2.........
//!                       |<- offset samples ->|
//!   time  = (T1.secs + T1.frac) + offset / sample_rate
//! ```
//!
//! The anchor is the most recent tag; between tags the time is extrapolated
//! from the number of samples seen past it. When several tags fall into one
//! window only the latest becomes the anchor, but every one of them counts
//! toward [`TimeKeeper::update_count`].
//!
//! ## Suppression
//!
//! The first tag ever seen is adopted as anchor and as the reference for
//! relative time, but it does not count as an update and publishes nothing.
//! [`TimeKeeper::set_ignore_next`] re-arms that suppression for the next
//! window that carries tags.
//!
//! ## Example
//!
//! ```rust
//! use streamblocks_core::stream_tags::{TagStore, TimeSpec};
//! use streamblocks_core::time_keeper::TimeKeeper;
//!
//! let tk = TimeKeeper::new(8, 1000.0).unwrap();
//! let mut tags = TagStore::new();
//! tags.add_time(0, 0, TimeSpec::new(100, 0.0));
//! tags.add_time(0, 150, TimeSpec::new(200, 0.0));
//!
//! tk.work(100, &tags);
//! assert_eq!(tk.update_count(), 0);
//! assert!((tk.current_time(false) - 100.1).abs() < 1e-9);
//!
//! tk.work(100, &tags);
//! assert_eq!(tk.update_count(), 1);
//! assert_eq!(tk.drain_status().len(), 1);
//! assert!((tk.current_time(true) - 100.05).abs() < 1e-9);
//! ```

use std::sync::{Mutex, MutexGuard};

use crate::block::{next_unique_id, IoSignature, StreamBlock};
use crate::config::TimeKeeperConfig;
use crate::message_port::{Message, MessagePort};
use crate::stream_tags::{keys, TagSource, TimeSpec};
use crate::types::{BlockError, BlockResult, WorkStatus};

/// Name of the outbound notification port.
pub const STATUS_PORT: &str = "status";
/// Message key published for each accepted time tag.
pub const UPDATE: &str = "update";

const TAG_CHANNEL: usize = 0;

#[derive(Debug)]
struct TimeState {
    last: TimeSpec,
    first: TimeSpec,
    /// Samples since the anchor tag; -1 until the first window is processed.
    time_offset: i64,
    seen_time: bool,
    update_count: u64,
    ignore_next: bool,
    nitems_read: u64,
    status: MessagePort,
}

/// Tag-driven stream clock.
#[derive(Debug)]
pub struct TimeKeeper {
    id: usize,
    item_size: usize,
    sample_rate: f64,
    state: Mutex<TimeState>,
}

impl TimeKeeper {
    /// Create a time keeper for a stream of `item_size`-byte items running
    /// at `sample_rate` items per second.
    pub fn new(item_size: usize, sample_rate: f64) -> BlockResult<Self> {
        if item_size == 0 {
            return Err(BlockError::InvalidParameter(
                "item_size must be > 0".to_string(),
            ));
        }
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(BlockError::InvalidParameter(format!(
                "sample_rate must be positive, got {sample_rate}"
            )));
        }

        let keeper = Self {
            id: next_unique_id(),
            item_size,
            sample_rate,
            state: Mutex::new(TimeState {
                last: TimeSpec::default(),
                first: TimeSpec::default(),
                time_offset: -1,
                seen_time: false,
                update_count: 0,
                ignore_next: true,
                nitems_read: 0,
                status: MessagePort::new(STATUS_PORT),
            }),
        };

        tracing::info!(block = %keeper.label(), item_size, sample_rate, "time keeper created");
        Ok(keeper)
    }

    /// Create from a configuration section.
    pub fn from_config(config: &TimeKeeperConfig) -> BlockResult<Self> {
        Self::new(config.item_size, config.sample_rate)
    }

    fn lock(&self) -> MutexGuard<'_, TimeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Current stream time in seconds.
    ///
    /// With `relative` set, the time of the first tag ever seen is
    /// subtracted.
    pub fn current_time(&self, relative: bool) -> f64 {
        let st = self.lock();
        let mut t = st.last.as_secs_f64() + st.time_offset as f64 / self.sample_rate;
        if relative {
            t -= st.first.as_secs_f64();
        }
        t
    }

    /// Arm or disarm suppression of the next window carrying time tags.
    pub fn set_ignore_next(&self, ignore: bool) {
        self.lock().ignore_next = ignore;
        tracing::debug!(block = %self.label(), ignore, "ignore next time update");
    }

    /// Number of time tags that were not suppressed.
    pub fn update_count(&self) -> u64 {
        self.lock().update_count
    }

    /// The current anchor time.
    pub fn time_spec(&self) -> TimeSpec {
        self.lock().last
    }

    /// True once any time tag has been seen.
    pub fn is_time_seen(&self) -> bool {
        self.lock().seen_time
    }

    /// Absolute stream position of the next item to be processed.
    pub fn items_read(&self) -> u64 {
        self.lock().nitems_read
    }

    /// Take every pending message from the `status` port.
    pub fn drain_status(&self) -> Vec<Message> {
        self.lock().status.drain()
    }

    /// Number of messages waiting on the `status` port.
    pub fn status_pending(&self) -> usize {
        self.lock().status.pending()
    }

    /// Consume `noutput_items` items, reading `rx_time` tags on channel 0
    /// for that range from `tags`. Always completes the whole window.
    pub fn work<T: TagSource + ?Sized>(&self, noutput_items: usize, tags: &T) -> WorkStatus {
        let mut guard = self.lock();
        let st = &mut *guard;
        let start = st.nitems_read;
        let end = start + noutput_items as u64;

        let times: Vec<(u64, TimeSpec)> = tags
            .tags_in_range(TAG_CHANNEL, start, end, keys::RX_TIME)
            .into_iter()
            .filter_map(|tag| match tag.value.as_time() {
                _ if !(start..end).contains(&tag.offset) => {
                    tracing::warn!(
                        block = %self.label(),
                        %tag,
                        start,
                        end,
                        "ignoring time tag outside window"
                    );
                    None
                }
                Some(time) => Some((tag.offset, time)),
                None => {
                    tracing::warn!(block = %self.label(), %tag, "ignoring malformed time tag");
                    None
                }
            })
            .collect();

        let mut anchor = 0;
        if let Some(&(offset, time)) = times.last() {
            let ignoring = st.ignore_next;
            if !ignoring {
                st.update_count += (times.len() - 1) as u64;
            }

            st.time_offset = 0;
            anchor = (offset - start) as usize;
            st.last = time;
            if !st.seen_time {
                st.first = time;
            }

            if ignoring {
                tracing::debug!(block = %self.label(), %time, offset, "time tag suppressed");
            } else {
                st.update_count += 1;
                st.status.publish(Message::signal(UPDATE));
                tracing::debug!(
                    block = %self.label(),
                    %time,
                    offset,
                    updates = st.update_count,
                    "time updated"
                );
            }

            st.seen_time = true;
            st.ignore_next = false;
        }

        st.time_offset += (noutput_items - anchor) as i64;
        st.nitems_read = end;

        WorkStatus::complete(noutput_items)
    }
}

impl StreamBlock for TimeKeeper {
    fn name(&self) -> &str {
        "time_keeper"
    }

    fn unique_id(&self) -> usize {
        self.id
    }

    fn io_signature(&self) -> IoSignature {
        IoSignature::sink(self.item_size)
    }
}
