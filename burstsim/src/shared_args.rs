//! Command line arguments shared by the simulation binaries.

use std::fmt;
use std::str::FromStr;

use clap::Parser;
use thiserror::Error;

use crate::burst::BurstParams;
use crate::config::{ConfigError, SimulationConfig};
use crate::flux::{FluxModelSpec, PulsedCplParams};

/// Why a "start:stop:step" argument was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RangeArgError {
    #[error("expected start:stop:step, got {0:?}")]
    Format(String),

    #[error("invalid {field} value {value:?}")]
    Number { field: &'static str, value: String },

    #[error("step {step} never reaches {stop} from {start}")]
    Direction { start: f64, stop: f64, step: f64 },
}

/// Parameter sweep given as "start:stop:step".
///
/// The stop value is inclusive. A positive step needs `start < stop`, a
/// negative one `start > stop`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeArg(pub f64, pub f64, pub f64);

impl FromStr for RangeArg {
    type Err = RangeArgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.split(':');
        let mut next = |field: &'static str| -> Result<f64, RangeArgError> {
            let raw = fields
                .next()
                .ok_or_else(|| RangeArgError::Format(s.to_string()))?
                .trim();
            raw.parse().map_err(|_| RangeArgError::Number {
                field,
                value: raw.to_string(),
            })
        };
        let range = RangeArg(next("start")?, next("stop")?, next("step")?);
        if fields.next().is_some() {
            return Err(RangeArgError::Format(s.to_string()));
        }

        let RangeArg(start, stop, step) = range;
        let heads_to_stop = (step > 0.0 && start < stop) || (step < 0.0 && start > stop);
        if !heads_to_stop {
            return Err(RangeArgError::Direction { start, stop, step });
        }
        Ok(range)
    }
}

impl fmt::Display for RangeArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.0, self.1, self.2)
    }
}

impl RangeArg {
    pub fn as_tuple(&self) -> (f64, f64, f64) {
        (self.0, self.1, self.2)
    }

    /// All values from start to stop inclusive.
    ///
    /// Values are computed as `start + i * step` so long sweeps do not
    /// accumulate rounding, and stop is matched with a small tolerance.
    pub fn to_vec(&self) -> Vec<f64> {
        let (start, stop, step) = self.as_tuple();
        let n = ((stop - start) / step + 1e-9).floor();
        if !(n >= 0.0) {
            return Vec::new();
        }
        (0..=n as usize).map(|i| start + i as f64 * step).collect()
    }

    /// Values interpreted as log10 exponents.
    pub fn to_pow10_vec(&self) -> Vec<f64> {
        self.to_vec().into_iter().map(|x| 10f64.powf(x)).collect()
    }
}

/// Common arguments shared across the simulation binaries
#[derive(Parser, Debug, Clone)]
pub struct SharedSimulationArgs {
    /// JSON configuration file; missing fields take their defaults
    #[arg(long)]
    pub config: Option<String>,

    /// Random seed for reproducible runs
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Run tasks serially instead of in parallel
    #[arg(long, default_value_t = false)]
    pub serial: bool,

    /// Right ascension of the burst (degrees)
    #[arg(long, default_value_t = 45.89)]
    pub ra: f64,

    /// Declination of the burst (degrees)
    #[arg(long, default_value_t = 69.42)]
    pub dec: f64,

    /// Redshift of the burst
    #[arg(long, default_value_t = 1.0)]
    pub z: f64,

    /// Source emission duration after T0 (seconds)
    #[arg(long, default_value_t = 5.0)]
    pub duration: f64,

    /// Peak energy at the start of the pulse (keV)
    #[arg(long, default_value_t = 300.0)]
    pub ep: f64,

    /// Peak energy decay timescale (seconds)
    #[arg(long, default_value_t = 2.0)]
    pub ep_tau: f64,

    /// Low-energy photon index of the cutoff power law
    #[arg(long, default_value_t = -0.66, allow_hyphen_values = true)]
    pub alpha: f64,

    /// Pulse rise time (seconds)
    #[arg(long, default_value_t = 0.1)]
    pub trise: f64,

    /// Pulse decay time (seconds)
    #[arg(long, default_value_t = 1.0)]
    pub tdecay: f64,
}

impl SharedSimulationArgs {
    /// Configuration from `--config`, or the defaults.
    pub fn load_config(&self) -> Result<SimulationConfig, ConfigError> {
        match &self.config {
            Some(path) => SimulationConfig::from_json_file(path),
            None => Ok(SimulationConfig::default()),
        }
    }

    pub fn burst(&self, name: impl Into<String>) -> BurstParams {
        BurstParams {
            name: name.into(),
            z: self.z,
            t0: 0.0,
            ra: self.ra,
            dec: self.dec,
            duration: self.duration,
        }
    }

    pub fn flux_spec(&self, peak_flux: f64) -> FluxModelSpec {
        FluxModelSpec::PulsedCpl(PulsedCplParams {
            peak_flux,
            ep_start: self.ep,
            ep_tau: self.ep_tau,
            alpha: self.alpha,
            trise: self.trise,
            tdecay: self.tdecay,
        })
    }
}
