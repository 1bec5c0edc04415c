//! Depuncturing Block for FEC Rate Recovery
//!
//! Depuncturing is the inverse of puncturing: it inserts erasure values at
//! positions that were removed during puncturing, restoring the mother code
//! rate so that a Viterbi decoder can process the full-length codeword.
//! Erased positions carry `0.0`, a neutral soft value.
//!
//! # How It Works
//!
//! The block replays its pattern cyclically, one flag per output item. At a
//! keep flag it copies the next input sample; at an erase flag it emits
//! `0.0` and consumes nothing. The replay cursor survives between calls, so
//! the pattern phase stays locked to the stream no matter how the scheduler
//! slices it.
//!
//! ```text
//! pattern  [1 0 1]
//! input     a   b c   d
//! output    a 0 b c 0 d      consumed 4, produced 6
//! ```
//!
//! The block publishes `len / keeps` as its relative rate so the scheduler
//! offers roughly the right amount of input per output request.
//!
//! # Example
//!
//! ```rust
//! use streamblocks_core::depuncture::Depuncturer;
//!
//! let dp = Depuncturer::new(&[1, 0, 1]).unwrap();
//! let input = [1.0, 2.0, 3.0, 4.0];
//! let mut output = [9.0f32; 6];
//! let status = dp.work(&input, &mut output);
//! assert_eq!(status.consumed(), 4);
//! assert_eq!(status.produced(), 6);
//! assert_eq!(output, [1.0, 0.0, 2.0, 3.0, 0.0, 4.0]);
//! ```

use std::sync::{Mutex, MutexGuard};

use crate::block::{next_unique_id, IoSignature, StreamBlock};
use crate::config::DepunctureConfig;
use crate::types::{BlockError, BlockResult, Sample, WorkStatus};

/// Value written at erased positions.
pub const ERASURE: Sample = 0.0;

/// Depuncture soft values in one shot, inserting `erasure_value` at
/// punctured positions.
///
/// Output stops at the first keep position for which no input remains.
pub fn depuncture_soft(llrs: &[Sample], pattern: &[bool], erasure_value: Sample) -> Vec<Sample> {
    if llrs.is_empty() || !validate_pattern(pattern) {
        return Vec::new();
    }

    let keeps = pattern.iter().filter(|&&b| b).count();
    let mut output = Vec::with_capacity(llrs.len() * pattern.len() / keeps + pattern.len());
    let mut input = llrs.iter();

    for &keep in pattern.iter().cycle() {
        if keep {
            match input.next() {
                Some(&x) => output.push(x),
                None => break,
            }
        } else {
            output.push(erasure_value);
        }
    }

    output
}

/// A pattern is usable if it is non-empty and keeps at least one symbol.
pub fn validate_pattern(pattern: &[bool]) -> bool {
    !pattern.is_empty() && pattern.iter().any(|&b| b)
}

/// Convert integer flags (zero = erase, nonzero = keep) to booleans.
pub fn flags_to_pattern(flags: &[i32]) -> Vec<bool> {
    flags.iter().map(|&f| f != 0).collect()
}

#[derive(Debug)]
struct DepunctureState {
    pattern: Vec<bool>,
    cursor: usize,
    relative_rate: f64,
}

impl DepunctureState {
    fn identity() -> Self {
        Self {
            pattern: vec![true],
            cursor: 0,
            relative_rate: 1.0,
        }
    }
}

/// Streaming depuncturer with a replaceable pattern.
///
/// All state sits behind one mutex, so [`set_pattern`](Self::set_pattern)
/// may be called from a control thread while the scheduler runs
/// [`work`](Self::work); the two never interleave.
#[derive(Debug)]
pub struct Depuncturer {
    id: usize,
    state: Mutex<DepunctureState>,
}

impl Depuncturer {
    /// Create a depuncturer with integer flags (zero = erase).
    ///
    /// An empty pattern leaves the block in pass-through mode.
    pub fn new(pattern: &[i32]) -> BlockResult<Self> {
        let block = Self {
            id: next_unique_id(),
            state: Mutex::new(DepunctureState::identity()),
        };
        block.set_pattern(pattern)?;
        Ok(block)
    }

    /// Create from a configuration section.
    pub fn from_config(config: &DepunctureConfig) -> BlockResult<Self> {
        Self::new(&config.pattern)
    }

    fn lock(&self) -> MutexGuard<'_, DepunctureState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the active pattern and reset the replay cursor.
    ///
    /// An empty pattern is ignored. A pattern without keep flags is rejected
    /// and the previous pattern stays active.
    pub fn set_pattern(&self, pattern: &[i32]) -> BlockResult<()> {
        if pattern.is_empty() {
            tracing::debug!(block = %self.label(), "ignoring empty puncture pattern");
            return Ok(());
        }

        let flags = flags_to_pattern(pattern);
        let keeps = flags.iter().filter(|&&b| b).count();
        if keeps == 0 {
            return Err(BlockError::NoKeptSymbols);
        }

        let rate = flags.len() as f64 / keeps as f64;
        let mut state = self.lock();
        state.pattern = flags;
        state.cursor = 0;
        state.relative_rate = rate;
        drop(state);

        tracing::debug!(block = %self.label(), relative_rate = rate, "depuncturer pattern set");
        Ok(())
    }

    /// Current pattern as booleans.
    pub fn pattern(&self) -> Vec<bool> {
        self.lock().pattern.clone()
    }

    /// Position of the next flag to be replayed.
    pub fn cursor(&self) -> usize {
        self.lock().cursor
    }

    /// Fill `output` by replaying the pattern over `input`.
    ///
    /// Returns `Complete` with the number of consumed inputs when the whole
    /// output window was filled. If `input` runs out at a keep position the
    /// call stops there and returns `Suspended`; the cursor is left on that
    /// flag so the next call resumes in phase.
    pub fn work(&self, input: &[Sample], output: &mut [Sample]) -> WorkStatus {
        let mut state = self.lock();
        let len = state.pattern.len();
        let mut consumed = 0;

        for (produced, out) in output.iter_mut().enumerate() {
            if state.pattern[state.cursor] {
                let Some(&x) = input.get(consumed) else {
                    return WorkStatus::Suspended { consumed, produced };
                };
                *out = x;
                consumed += 1;
            } else {
                *out = ERASURE;
            }
            state.cursor = (state.cursor + 1) % len;
        }

        WorkStatus::Complete {
            consumed,
            produced: output.len(),
        }
    }
}

impl StreamBlock for Depuncturer {
    fn name(&self) -> &str {
        "depuncture_ff"
    }

    fn unique_id(&self) -> usize {
        self.id
    }

    fn io_signature(&self) -> IoSignature {
        IoSignature::float_to_float()
    }

    fn relative_rate(&self) -> f64 {
        self.lock().relative_rate
    }

    /// Exact number of inputs the next `noutput_items` outputs will consume.
    fn forecast(&self, noutput_items: usize) -> usize {
        let state = self.lock();
        let len = state.pattern.len();
        let keeps = state.pattern.iter().filter(|&&b| b).count();
        let partial = (0..noutput_items % len)
            .filter(|k| state.pattern[(state.cursor + k) % len])
            .count();
        (noutput_items / len) * keeps + partial
    }
}

/// Common puncture patterns of rate-1/2 convolutional codes.
///
/// Flags are interleaved per output pair; `1` keeps a bit and `0` marks a
/// punctured one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PuncturePattern {
    /// Rate 1/2, nothing punctured.
    Rate1_2,
    /// Rate 2/3, used in IEEE 802.11a/g and DVB.
    Rate2_3,
    /// Rate 3/4, used in IEEE 802.11a/g and DVB-S.
    Rate3_4,
    Rate5_6,
    Rate7_8,
}

impl PuncturePattern {
    /// Integer flags, ready for [`Depuncturer::set_pattern`].
    pub fn flags(&self) -> &'static [i32] {
        match self {
            PuncturePattern::Rate1_2 => &[1, 1],
            PuncturePattern::Rate2_3 => &[1, 1, 0, 1],
            PuncturePattern::Rate3_4 => &[1, 1, 0, 1, 1, 0],
            PuncturePattern::Rate5_6 => &[1, 1, 0, 1, 1, 0, 0, 1, 1, 0],
            PuncturePattern::Rate7_8 => &[1, 1, 0, 1, 0, 1, 0, 1, 1, 0, 0, 1, 1, 0],
        }
    }

    /// Output-to-input ratio of the depuncturer for this pattern.
    pub fn relative_rate(&self) -> f64 {
        let flags = self.flags();
        let keeps = flags.iter().filter(|&&f| f != 0).count();
        flags.len() as f64 / keeps as f64
    }
}
