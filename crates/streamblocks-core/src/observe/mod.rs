//! # Observability
//!
//! Blocks log through `tracing`; counters they keep (peaks detected, missed
//! markers, time updates, dropped status messages) are exposed as plain
//! accessors on each block. This module wires the `tracing` events to an
//! output.
//!
//! ```text
//!   depuncture_ff / peak_detector / time_keeper
//!        tracing::{info,debug,warn}!(block = "name<id>", ...)
//!                         │
//!                         ▼
//!            EnvFilter (RUST_LOG or LogConfig)
//!                         │
//!                         ▼
//!           fmt layer: json | pretty | compact
//! ```

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
