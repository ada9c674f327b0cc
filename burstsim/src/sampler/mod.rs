//! Random event generation.
//!
//! - [`time`]: arrival times by thinning a Poisson process
//! - [`energy`]: photon energies by rejection under a power-law envelope
//! - [`source`]: a burst source bound to one detector
//! - [`background`]: constant-rate background with a channel template

pub mod background;
pub mod energy;
pub mod source;
pub mod time;

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::SamplingConfig;

pub use background::{
    Background, BackgroundTemplate, BackgroundTemplateProvider, PowerLawTemplate, TemplateTable,
};
pub use energy::{sample_power_law, EnergySampler};
pub use source::Source;
pub use time::{sample_event_times, ThinningOutcome};

/// Errors from event sampling.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SamplingError {
    #[error("sampling window is empty: tstop {tstop} <= tstart {tstart}")]
    InvalidWindow { tstart: f64, tstop: f64 },

    #[error("source window [{start}, {stop}] s lies outside the background window [{tstart}, {tstop}] s")]
    SourceOutsideWindow {
        start: f64,
        stop: f64,
        tstart: f64,
        tstop: f64,
    },

    #[error("energy rejection gave up after {attempts} attempts at t = {time} s")]
    RejectionExhausted { time: f64, attempts: u64 },

    #[error("thinning exceeded {cap} candidate arrivals")]
    CandidateCapExceeded { cap: u64 },

    #[error("task deadline of {limit_s} s exceeded")]
    DeadlineExceeded { limit_s: f64 },

    #[error("folded spectrum is zero at t = {time} s; no energy can be drawn")]
    ZeroFlux { time: f64 },

    #[error("{times} event times but {channels} channels")]
    LengthMismatch { times: usize, channels: usize },

    #[error("invalid background template: {0}")]
    InvalidTemplate(String),

    #[error("invalid {name}: {value}")]
    InvalidRate { name: &'static str, value: f64 },
}

/// Limits that keep a sampling task from running away.
///
/// The deadline is checked cooperatively from inside the sampling loops.
#[derive(Debug, Clone, Copy)]
pub struct SamplingGuard {
    started: Instant,
    limit: Option<Duration>,
    max_candidates: u64,
    max_rejection_attempts: u64,
}

impl SamplingGuard {
    pub fn new(settings: &SamplingConfig) -> Self {
        Self {
            started: Instant::now(),
            limit: settings.task_timeout_s.map(Duration::from_secs_f64),
            max_candidates: settings.max_thinning_candidates,
            max_rejection_attempts: settings.max_rejection_attempts,
        }
    }

    /// No deadline and no candidate cap; default rejection cap.
    pub fn unbounded() -> Self {
        Self {
            started: Instant::now(),
            limit: None,
            max_candidates: u64::MAX,
            max_rejection_attempts: SamplingConfig::default().max_rejection_attempts,
        }
    }

    pub fn with_limit(mut self, limit: Duration) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn max_candidates(&self) -> u64 {
        self.max_candidates
    }

    pub fn max_rejection_attempts(&self) -> u64 {
        self.max_rejection_attempts
    }

    pub fn check_deadline(&self) -> Result<(), SamplingError> {
        match self.limit {
            Some(limit) if self.started.elapsed() > limit => Err(SamplingError::DeadlineExceeded {
                limit_s: limit.as_secs_f64(),
            }),
            _ => Ok(()),
        }
    }
}
