//! Core types shared by all blocks
//!
//! Every block in this crate works on real-valued `f32` samples and reports
//! the outcome of a processing call as a [`WorkStatus`]. The status carries
//! how many input items were consumed and how many output items were
//! produced; the two differ for rate-changing blocks such as the
//! depuncturer.
//!
//! ## Partial progress
//!
//! A block never blocks waiting for more input. When it cannot finish the
//! requested window it returns [`WorkStatus::Suspended`] with the number of
//! items it did resolve, and the scheduler offers the remainder again on the
//! next call:
//!
//! ```text
//!   call 1:  [x0 x1 x2 x3 x4 x5 x6 x7]   -> Suspended { produced: 5 }
//!   call 2:                 [x5 x6 x7 x8 x9 ...]
//! ```

/// A real-valued stream sample.
pub type Sample = f32;

/// Result type for block operations
pub type BlockResult<T> = Result<T, BlockError>;

/// Errors raised by block construction and processing
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BlockError {
    #[error("Puncture pattern has no kept symbols")]
    NoKeptSymbols,

    #[error("Buffer too short: expected {expected}, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Outcome of one processing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkStatus {
    /// The whole requested window was processed.
    Complete { consumed: usize, produced: usize },
    /// Only part of the window was resolved; the caller should re-offer the
    /// unconsumed input on the next call.
    Suspended { consumed: usize, produced: usize },
}

impl WorkStatus {
    /// Complete status for a 1:1 block.
    pub fn complete(n: usize) -> Self {
        WorkStatus::Complete {
            consumed: n,
            produced: n,
        }
    }

    /// Suspended status for a 1:1 block.
    pub fn suspended(n: usize) -> Self {
        WorkStatus::Suspended {
            consumed: n,
            produced: n,
        }
    }

    /// Number of input items consumed.
    pub fn consumed(&self) -> usize {
        match *self {
            WorkStatus::Complete { consumed, .. } | WorkStatus::Suspended { consumed, .. } => {
                consumed
            }
        }
    }

    /// Number of output items produced.
    pub fn produced(&self) -> usize {
        match *self {
            WorkStatus::Complete { produced, .. } | WorkStatus::Suspended { produced, .. } => {
                produced
            }
        }
    }

    /// True if the requested window was fully processed.
    pub fn is_complete(&self) -> bool {
        matches!(self, WorkStatus::Complete { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_status_accessors() {
        let done = WorkStatus::Complete {
            consumed: 4,
            produced: 6,
        };
        assert_eq!(done.consumed(), 4);
        assert_eq!(done.produced(), 6);
        assert!(done.is_complete());

        let partial = WorkStatus::suspended(3);
        assert_eq!(partial.consumed(), 3);
        assert_eq!(partial.produced(), 3);
        assert!(!partial.is_complete());
    }

    #[test]
    fn test_error_display() {
        let err = BlockError::BufferTooShort {
            expected: 9,
            actual: 8,
        };
        assert_eq!(err.to_string(), "Buffer too short: expected 9, got 8");
        assert_eq!(
            BlockError::NoKeptSymbols.to_string(),
            "Puncture pattern has no kept symbols"
        );
    }
}
