//! # Block Metadata
//!
//! The host scheduler needs a few facts about each block before it can size
//! buffers and drive `work` calls: how many streams it takes and produces,
//! the byte width of an item, how much history it needs and the ratio of
//! output to input items. [`StreamBlock`] exposes those facts; the
//! processing entry points themselves are inherent methods on each block
//! because their buffer shapes differ.
//!
//! ## Example
//!
//! ```rust
//! use streamblocks_core::block::StreamBlock;
//! use streamblocks_core::depuncture::Depuncturer;
//!
//! let block = Depuncturer::new(&[1, 0, 1]).unwrap();
//! assert_eq!(block.name(), "depuncture_ff");
//! assert_eq!(block.io_signature().input.item_size, 4);
//! assert!((block.relative_rate() - 1.5).abs() < 1e-12);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_UNIQUE_ID: AtomicUsize = AtomicUsize::new(0);

/// Allocate a process-wide unique block id.
pub(crate) fn next_unique_id() -> usize {
    NEXT_UNIQUE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Stream count and item width of one side of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSignature {
    /// Minimum number of connected streams.
    pub min_streams: usize,
    /// Maximum number of connected streams.
    pub max_streams: usize,
    /// Size of one item in bytes.
    pub item_size: usize,
}

impl PortSignature {
    /// Exactly `streams` streams of `item_size`-byte items.
    pub fn fixed(streams: usize, item_size: usize) -> Self {
        Self {
            min_streams: streams,
            max_streams: streams,
            item_size,
        }
    }

    /// No streams on this side.
    pub fn none() -> Self {
        Self::fixed(0, 0)
    }
}

/// Input and output signature of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoSignature {
    pub input: PortSignature,
    pub output: PortSignature,
}

impl IoSignature {
    /// One `f32` stream in, one `f32` stream out.
    pub fn float_to_float() -> Self {
        let item = std::mem::size_of::<f32>();
        Self {
            input: PortSignature::fixed(1, item),
            output: PortSignature::fixed(1, item),
        }
    }

    /// One stream in, nothing out.
    pub fn sink(item_size: usize) -> Self {
        Self {
            input: PortSignature::fixed(1, item_size),
            output: PortSignature::none(),
        }
    }
}

/// Metadata every block publishes to the host scheduler.
pub trait StreamBlock: Send + Sync {
    /// Block type name.
    fn name(&self) -> &str;

    /// Process-wide unique id assigned at construction.
    fn unique_id(&self) -> usize;

    /// Stream counts and item sizes.
    fn io_signature(&self) -> IoSignature;

    /// Number of input items that must be available per output item,
    /// counting the current one. A history of 2 means `x[i-1]` is always
    /// readable alongside `x[i]`.
    fn history(&self) -> usize {
        1
    }

    /// Ratio of output items to input items.
    fn relative_rate(&self) -> f64 {
        1.0
    }

    /// Input items required to produce `noutput_items`.
    fn forecast(&self, noutput_items: usize) -> usize {
        noutput_items + self.history() - 1
    }

    /// Display label in the `name<id>` form.
    fn label(&self) -> BlockLabel {
        BlockLabel {
            name: self.name().to_string(),
            id: self.unique_id(),
        }
    }
}

/// Human-readable block identifier used in log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLabel {
    pub name: String,
    pub id: usize,
}

impl fmt::Display for BlockLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}>", self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy {
        id: usize,
    }

    impl StreamBlock for Dummy {
        fn name(&self) -> &str {
            "dummy"
        }

        fn unique_id(&self) -> usize {
            self.id
        }

        fn io_signature(&self) -> IoSignature {
            IoSignature::float_to_float()
        }
    }

    #[test]
    fn test_unique_ids_increase() {
        let a = next_unique_id();
        let b = next_unique_id();
        assert!(b > a);
    }

    #[test]
    fn test_default_forecast_and_label() {
        let d = Dummy { id: 7 };
        assert_eq!(d.history(), 1);
        assert_eq!(d.forecast(10), 10);
        assert_eq!(d.relative_rate(), 1.0);
        assert_eq!(d.label().to_string(), "dummy<7>");
    }

    #[test]
    fn test_signatures() {
        let ff = IoSignature::float_to_float();
        assert_eq!(ff.input, PortSignature::fixed(1, 4));
        assert_eq!(ff.output.max_streams, 1);

        let sink = IoSignature::sink(8);
        assert_eq!(sink.input.item_size, 8);
        assert_eq!(sink.output, PortSignature::none());
    }
}
