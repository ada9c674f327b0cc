//! Simulation configuration.
//!
//! Every knob of the pipeline lives in [`SimulationConfig`]. The config is a
//! plain serde struct: it can be built in code, or loaded from a JSON file in
//! which any missing field falls back to its default.
//!
//! ```json
//! {
//!   "background": { "average_rate": 800.0 },
//!   "trigger": { "threshold": 5.0 }
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lightcurve::dead_time::DeadTimeConfig;
use crate::trigger::TriggerConfig;

/// Errors reading or writing configuration and table files.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration value {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Background window and rate draw.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Start of the simulated window relative to T0 (s)
    pub tstart: f64,
    /// End of the simulated window relative to T0 (s)
    pub tstop: f64,
    /// Mean of the per-detector background rate draw (counts/s)
    pub average_rate: f64,
    /// Standard deviation of the rate draw (counts/s)
    pub rate_sigma: f64,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            tstart: -100.0,
            tstop: 300.0,
            average_rate: 500.0,
            rate_sigma: 10.0,
        }
    }
}

/// Numerical settings for the event samplers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SamplingConfig {
    /// Linear time grid used to estimate the thinning bound
    pub fmax_grid_points: usize,
    /// Multiplier applied to the grid maximum of the rate
    pub fmax_safety_factor: f64,
    /// Log energy grid used to locate the spectral peak per time
    pub energy_grid_points: usize,
    /// Envelope height as a multiple of the folded spectrum peak
    pub envelope_factor: f64,
    /// Rejection attempts allowed per photon energy
    pub max_rejection_attempts: u64,
    /// Candidate arrivals allowed per thinning run
    pub max_thinning_candidates: u64,
    /// Wall-clock budget per detector task, in seconds
    pub task_timeout_s: Option<f64>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            fmax_grid_points: 50,
            fmax_safety_factor: 1.0,
            energy_grid_points: 500,
            envelope_factor: 5.0,
            max_rejection_attempts: 100_000,
            max_thinning_candidates: 200_000_000,
            task_timeout_s: None,
        }
    }
}

/// Full pipeline configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct SimulationConfig {
    pub background: BackgroundConfig,
    pub dead_time: DeadTimeConfig,
    pub sampling: SamplingConfig,
    pub trigger: TriggerConfig,
}

impl SimulationConfig {
    /// Load a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().display().to_string();
        let text = fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Io {
            path: path_str.clone(),
            source,
        })?;
        let config: SimulationConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Json {
                path: path_str,
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().display().to_string();
        let text = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Json {
            path: path_str.clone(),
            source,
        })?;
        fs::write(path.as_ref(), text).map_err(|source| ConfigError::Io {
            path: path_str,
            source,
        })
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.background.tstop > self.background.tstart) {
            return Err(ConfigError::Invalid {
                name: "background.tstop",
                reason: format!(
                    "must exceed tstart ({} <= {})",
                    self.background.tstop, self.background.tstart
                ),
            });
        }
        if !(self.background.rate_sigma >= 0.0) || !self.background.rate_sigma.is_finite() {
            return Err(ConfigError::Invalid {
                name: "background.rate_sigma",
                reason: format!("must be finite and >= 0, got {}", self.background.rate_sigma),
            });
        }
        if self.sampling.fmax_grid_points < 2 || self.sampling.energy_grid_points < 2 {
            return Err(ConfigError::Invalid {
                name: "sampling",
                reason: "grids need at least two points".to_string(),
            });
        }
        if !(self.sampling.envelope_factor > 0.0) {
            return Err(ConfigError::Invalid {
                name: "sampling.envelope_factor",
                reason: format!("must be > 0, got {}", self.sampling.envelope_factor),
            });
        }
        if let Some(timeout) = self.sampling.task_timeout_s {
            if !(timeout > 0.0) {
                return Err(ConfigError::Invalid {
                    name: "sampling.task_timeout_s",
                    reason: format!("must be > 0, got {timeout}"),
                });
            }
        }
        self.trigger.validate()
    }

    /// The background window must cover the source emission `[0, duration]`.
    pub fn check_source_window(&self, duration: f64) -> Result<(), ConfigError> {
        let bkg = &self.background;
        if bkg.tstart <= 0.0 && bkg.tstop >= duration {
            Ok(())
        } else {
            Err(ConfigError::Invalid {
                name: "background",
                reason: format!(
                    "window [{}, {}] s does not contain the source window [0, {}] s",
                    bkg.tstart, bkg.tstop, duration
                ),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::default();
        assert_eq!(config.background.tstart, -100.0);
        assert_eq!(config.background.tstop, 300.0);
        assert_eq!(config.background.average_rate, 500.0);
        assert_eq!(config.sampling.max_rejection_attempts, 100_000);
        assert_eq!(config.trigger.threshold, 4.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "background": {{ "average_rate": 800.0 }}, "trigger": {{ "threshold": 5.0 }} }}"#
        )
        .unwrap();

        let config = SimulationConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.background.average_rate, 800.0);
        assert_eq!(config.background.rate_sigma, 10.0);
        assert_eq!(config.trigger.threshold, 5.0);
        assert_eq!(config.trigger.max_n_dets, 12);
        assert_eq!(config.dead_time, DeadTimeConfig::default());
    }

    #[test]
    fn test_round_trip_through_file() {
        let mut config = SimulationConfig::default();
        config.background.tstart = -50.0;
        config.sampling.task_timeout_s = Some(30.0);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        config.to_json_file(&path).unwrap();

        let loaded = SimulationConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_rejects_bad_window() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "background": {{ "tstart": 10.0, "tstop": 5.0 }} }}"#).unwrap();

        let err = SimulationConfig::from_json_file(file.path()).unwrap_err();
        assert!(
            matches!(err, ConfigError::Invalid { name: "background.tstop", .. }),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = SimulationConfig::from_json_file("/nonexistent/burstsim.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_malformed_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = SimulationConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
    }
}
