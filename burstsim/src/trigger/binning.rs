//! Base-resolution binning with live-time exposure.
//!
//! Events are binned once per detector at the base resolution. Window sums
//! of counts and exposure are then read from prefix sums, so each
//! significance evaluation costs O(1) regardless of timescale.

use crate::lightcurve::{DeadTimeConfig, EventStream};

/// Events and live time on the base time grid.
#[derive(Debug, Clone)]
pub struct BinnedEvents {
    tstart: f64,
    resolution: f64,
    n_bins: usize,
    /// `exposure_prefix[i]` is the live time of bins `0..i`
    exposure_prefix: Vec<f64>,
    /// Bin index and channel of every event inside the window
    event_bins: Vec<(usize, u32)>,
}

impl BinnedEvents {
    /// Bin `events` on `[tstart, tstop]` at `resolution`.
    ///
    /// Each bin's exposure is its width minus the dead time of the events
    /// recorded in it, floored at zero. A trailing partial bin keeps its
    /// true width.
    pub fn new(
        events: &EventStream,
        tstart: f64,
        tstop: f64,
        resolution: f64,
        dead_time: &DeadTimeConfig,
    ) -> Self {
        let span = tstop - tstart;
        let n_bins = if resolution > 0.0 && span > 0.0 {
            ((span / resolution) - 1e-9).ceil().max(1.0) as usize
        } else {
            0
        };

        let mut dead = vec![0.0; n_bins];
        let mut event_bins = Vec::with_capacity(events.len());
        if n_bins > 0 {
            for (t, channel) in events.iter() {
                if t < tstart || t > tstop {
                    continue;
                }
                let idx = (((t - tstart) / resolution) as usize).min(n_bins - 1);
                dead[idx] += dead_time.dead_time_for(channel);
                event_bins.push((idx, channel));
            }
        }

        let mut exposure_prefix = Vec::with_capacity(n_bins + 1);
        exposure_prefix.push(0.0);
        let mut acc = 0.0;
        for (i, d) in dead.iter().enumerate() {
            let bin_start = tstart + i as f64 * resolution;
            let width = resolution.min(tstop - bin_start);
            acc += (width - d).max(0.0);
            exposure_prefix.push(acc);
        }

        Self {
            tstart,
            resolution,
            n_bins,
            exposure_prefix,
            event_bins,
        }
    }

    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Start time of bin `i`.
    pub fn bin_start(&self, i: usize) -> f64 {
        self.tstart + i as f64 * self.resolution
    }

    /// Live time of bins `from..to`.
    pub fn exposure(&self, from: usize, to: usize) -> f64 {
        self.exposure_prefix[to] - self.exposure_prefix[from]
    }

    /// Counts per bin for the channels flagged in `mask`.
    pub fn band_counts(&self, mask: &[bool]) -> BandCounts {
        let mut per_bin = vec![0u64; self.n_bins];
        for &(idx, channel) in &self.event_bins {
            if mask.get(channel as usize).copied().unwrap_or(false) {
                per_bin[idx] += 1;
            }
        }
        let mut prefix = Vec::with_capacity(self.n_bins + 1);
        prefix.push(0);
        let mut acc = 0u64;
        for c in per_bin {
            acc += c;
            prefix.push(acc);
        }
        BandCounts { prefix }
    }
}

/// Cumulative counts in one energy band.
#[derive(Debug, Clone)]
pub struct BandCounts {
    prefix: Vec<u64>,
}

impl BandCounts {
    pub fn total(&self) -> u64 {
        self.prefix.last().copied().unwrap_or(0)
    }

    /// Counts in bins `from..to`.
    pub fn sum(&self, from: usize, to: usize) -> u64 {
        self.prefix[to] - self.prefix[from]
    }
}
