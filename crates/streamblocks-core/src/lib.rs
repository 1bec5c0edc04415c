//! # Stream Blocks
//!
//! Stateful sample-stream processing blocks for a software radio receive
//! chain. Each block is driven by a host scheduler in windows: it is handed
//! an input buffer and an output buffer, reports how many items it consumed
//! and produced, and carries its state over to the next window.
//!
//! ## Blocks
//!
//! - **Depuncturer** ([`depuncture::Depuncturer`]): re-inserts erasures at
//!   the positions a puncture pattern removed, restoring the mother-code
//!   rate in front of a soft-decision FEC decoder
//! - **Peak Detector** ([`peak_detector::PeakDetector`]): marks local maxima
//!   of an (optionally smoothed) envelope, with run-length, rise and drop
//!   qualification, look-ahead confirmation and a post-peak lockout
//! - **Time Keeper** ([`time_keeper::TimeKeeper`]): follows `rx_time` stream
//!   tags to answer "what time is it at the current sample"
//!
//! ## Signal Flow
//!
//! ```text
//! punctured LLRs ──▶ depuncture_ff ──▶ FEC decoder
//! envelope       ──▶ peak_detector ──▶ 0/1 marker stream
//! tagged stream  ──▶ time_keeper   ──▶ current_time() + "status" messages
//! ```
//!
//! ## Example
//!
//! ```rust
//! use streamblocks_core::prelude::*;
//!
//! let dp = Depuncturer::new(PuncturePattern::Rate3_4.flags()).unwrap();
//! let llrs = [0.9, -1.1, 0.4, 0.7];
//! let mut out = [0.0; 6];
//!
//! let status = dp.work(&llrs, &mut out);
//! assert_eq!(status, WorkStatus::Complete { consumed: 4, produced: 6 });
//! assert_eq!(out, [0.9, -1.1, 0.0, 0.4, 0.7, 0.0]);
//! ```

pub mod block;
pub mod config;
pub mod depuncture;
pub mod message_port;
pub mod observe;
pub mod peak_detector;
pub mod stream_tags;
pub mod time_keeper;
pub mod types;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::block::{IoSignature, StreamBlock};
    pub use crate::config::{
        DepunctureConfig, PeakDetectorConfig, StreamblocksConfig, TimeKeeperConfig,
    };
    pub use crate::depuncture::{Depuncturer, PuncturePattern};
    pub use crate::message_port::Message;
    pub use crate::peak_detector::PeakDetector;
    pub use crate::stream_tags::{TagSource, TagStore, TimeSpec};
    pub use crate::time_keeper::TimeKeeper;
    pub use crate::types::{BlockError, BlockResult, Sample, WorkStatus};
}
