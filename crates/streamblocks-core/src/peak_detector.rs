//! Adaptive Peak Detector
//!
//! Marks local maxima of a noisy real-valued stream. The output has the same
//! length as the input and is zero except for a single `1.0` at each
//! confirmed peak.
//!
//! ## Algorithm
//!
//! For every sample `x[i]` the detector:
//!
//! 1. Updates an exponential moving average from the previous sample,
//!    `avg = alpha * x[i-1] + (1 - alpha) * avg`.
//! 2. Skips detection while a lockout from the last confirmed peak is active.
//! 3. Compares `x[i]` with the relaxed threshold `avg - avg * drop`. Above it
//!    a rising run starts or continues; every new maximum of the run becomes
//!    the tentative peak and re-arms the look-ahead countdown.
//! 4. Below it, the look-ahead countdown runs out first. Then the run ends
//!    and the tentative peak is confirmed if the run was long enough and the
//!    rise ratio `x[i] / first` reached `min_diff` (or `min_diff` is 0).
//!
//! ```text
//!   x:      0  0  1  3  6  4  2  1  0
//!   run:          [--rising--]
//!   peak:               ^ tentative, then confirmed after look-ahead
//!   out:    0  0  0  0  1  0  0  0  0
//! ```
//!
//! ## Partial progress
//!
//! A tentative peak can only be committed once enough later samples have
//! been seen. When the window handed to [`PeakDetector::work`] ends before
//! that, the detector rewinds to the state just before the tentative peak
//! and returns [`WorkStatus::Suspended`] with the number of samples in front
//! of it. The scheduler re-offers the rest, so the marker is written into
//! the window that actually contains the peak.
//!
//! If the unresolved peak is the first item of the window, nothing can be
//! released and the call returns `Suspended` with zero progress: the
//! scheduler has to offer a larger window. Chunked processing therefore
//! yields the same markers as one-shot processing. A caller that repeats
//! the same window instead signals that no more input is coming; the
//! detector then commits the window as is, and a peak confirmed later is
//! counted by [`PeakDetector::missed_markers`] instead of being written.
//!
//! The block needs a history of 2: `input[0]` is the sample preceding the
//! first output item (zero at stream start).
//!
//! ## Example
//!
//! ```rust
//! use streamblocks_core::config::PeakDetectorConfig;
//! use streamblocks_core::peak_detector::PeakDetector;
//!
//! let pd = PeakDetector::new(PeakDetectorConfig::default()).unwrap();
//! // history sample, then 8 stream samples
//! let input = [0.0, 0.0, 0.0, 0.0, 0.0, 10.0, 0.0, 0.0, 0.0];
//! let mut output = [0.0f32; 8];
//! let status = pd.work(&input, &mut output).unwrap();
//! assert!(status.is_complete());
//! assert_eq!(output, [0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
//! ```

use std::sync::{Mutex, MutexGuard};

use crate::block::{next_unique_id, IoSignature, StreamBlock};
use crate::config::PeakDetectorConfig;
use crate::types::{BlockError, BlockResult, Sample, WorkStatus};

/// Value written at a confirmed peak.
pub const PEAK_MARKER: Sample = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct DetectorState {
    ave: Sample,
    rising: bool,
    rise_count: usize,
    lockout_count: usize,
    /// First value of the current rising run.
    first: Sample,
    peak: Sample,
    look_ahead_count: usize,
    /// Absolute stream index of the tentative peak; only valid while rising.
    peak_pos: u64,
}

impl Default for DetectorState {
    fn default() -> Self {
        Self {
            ave: 0.0,
            rising: false,
            rise_count: 0,
            lockout_count: 1,
            first: 0.0,
            peak: 0.0,
            look_ahead_count: 0,
            peak_pos: 0,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: DetectorState,
    /// Absolute stream index of the next output item.
    items: u64,
    peaks_detected: u64,
    missed_markers: u64,
    /// `(items, window)` of the last zero-progress return.
    stalled: Option<(u64, usize)>,
}

/// Peak detector with adaptive threshold, lockout and look-ahead.
#[derive(Debug)]
pub struct PeakDetector {
    id: usize,
    config: PeakDetectorConfig,
    inner: Mutex<Inner>,
}

impl PeakDetector {
    /// Create a detector.
    ///
    /// Fails if `alpha` is outside `(0, 1]`.
    pub fn new(config: PeakDetectorConfig) -> BlockResult<Self> {
        if !(config.alpha > 0.0 && config.alpha <= 1.0) {
            return Err(BlockError::InvalidParameter(format!(
                "alpha must be in (0, 1], got {}",
                config.alpha
            )));
        }

        let detector = Self {
            id: next_unique_id(),
            config,
            inner: Mutex::new(Inner::default()),
        };

        tracing::info!(
            block = %detector.label(),
            min_diff = config.min_diff,
            min_len = config.min_len,
            lockout = config.lockout,
            drop = config.drop,
            alpha = config.alpha,
            look_ahead = config.look_ahead,
            "peak detector created"
        );

        Ok(detector)
    }

    pub fn config(&self) -> &PeakDetectorConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Peaks written to the output so far.
    pub fn peaks_detected(&self) -> u64 {
        self.lock().peaks_detected
    }

    /// Peaks confirmed after their output position had already been handed
    /// back to the scheduler. Only happens when a zero-progress return was
    /// answered with the same window again.
    pub fn missed_markers(&self) -> u64 {
        self.lock().missed_markers
    }

    /// Output items produced since construction.
    pub fn items_processed(&self) -> u64 {
        self.lock().items
    }

    /// Run the detector over one window.
    ///
    /// `output.len()` items are requested; `input` must hold one extra
    /// leading history sample. Returns `Suspended` when a tentative peak is
    /// still unresolved at the end of the window: everything before it is
    /// final, and the caller must re-offer input starting at the reported
    /// position. Zero progress means the window must grow; offering the
    /// same window again forces it through.
    pub fn work(&self, input: &[Sample], output: &mut [Sample]) -> BlockResult<WorkStatus> {
        let n = output.len();
        if input.len() < n + 1 {
            return Err(BlockError::BufferTooShort {
                expected: n + 1,
                actual: input.len(),
            });
        }

        output.fill(0.0);

        let PeakDetectorConfig {
            min_diff,
            min_len,
            lockout,
            drop,
            alpha,
            look_ahead,
        } = self.config;

        let mut guard = self.lock();
        let inner = &mut *guard;
        let base = inner.items;
        let stalled = matches!(
            inner.stalled.take(),
            Some((at, window)) if at == base && n <= window
        );
        // Window index and pre-sample state of a tentative peak found in this call.
        let mut pending: Option<(usize, DetectorState)> = None;

        for j in 0..n {
            let prev = input[j];
            let x = input[j + 1];
            let before = inner.state;
            let st = &mut inner.state;

            st.ave = alpha * prev + (1.0 - alpha) * st.ave;

            if st.lockout_count > 0 {
                st.lockout_count -= 1;
                if st.lockout_count > 0 {
                    continue;
                }
            }

            if x > st.ave - st.ave * drop {
                let new_peak = if !st.rising {
                    st.rising = true;
                    st.rise_count = 0;
                    st.first = x;
                    true
                } else {
                    x > st.peak
                };

                if new_peak {
                    st.peak = x;
                    st.look_ahead_count = look_ahead;
                    st.peak_pos = base + j as u64;
                    pending = Some((j, before));

                    if look_ahead > n - j + 1 {
                        if j > 0 {
                            inner.state = before;
                            inner.items += j as u64;
                            return Ok(WorkStatus::suspended(j));
                        }
                        if !stalled {
                            inner.state = before;
                            inner.stalled = Some((base, n));
                            return Ok(WorkStatus::suspended(0));
                        }
                        tracing::warn!(
                            block = %self.label(),
                            look_ahead,
                            window = n,
                            "too few items to resolve look-ahead"
                        );
                    }
                }

                st.rise_count += 1;
                continue;
            }

            if st.look_ahead_count > 0 {
                st.look_ahead_count -= 1;
                if st.look_ahead_count > 0 {
                    continue;
                }
            }

            if st.rising {
                if st.rise_count >= min_len {
                    let ratio = if st.first > 0.0 { x / st.first } else { 0.0 };

                    if min_diff == 0.0 || ratio >= min_diff {
                        if st.peak_pos >= base {
                            output[(st.peak_pos - base) as usize] = PEAK_MARKER;
                            inner.peaks_detected += 1;
                        } else {
                            inner.missed_markers += 1;
                            tracing::warn!(
                                block = %self.label(),
                                peak = st.peak_pos,
                                window_start = base,
                                "peak confirmed outside current window"
                            );
                        }
                        st.lockout_count = lockout;
                    }
                }

                st.rising = false;
                pending = None;
            }
        }

        if let Some((k, snapshot)) = pending {
            if inner.state.rising {
                if k > 0 {
                    inner.state = snapshot;
                    inner.items += k as u64;
                    return Ok(WorkStatus::suspended(k));
                }
                if !stalled {
                    inner.state = snapshot;
                    inner.stalled = Some((base, n));
                    return Ok(WorkStatus::suspended(0));
                }
                tracing::warn!(
                    block = %self.label(),
                    peak = inner.state.peak_pos,
                    window = n,
                    "window released with unresolved peak"
                );
            }
        }

        inner.items += n as u64;
        Ok(WorkStatus::complete(n))
    }
}

impl StreamBlock for PeakDetector {
    fn name(&self) -> &str {
        "peak_detector"
    }

    fn unique_id(&self) -> usize {
        self.id
    }

    fn io_signature(&self) -> IoSignature {
        IoSignature::float_to_float()
    }

    fn history(&self) -> usize {
        2
    }
}
