//! Rate-trigger search.
//!
//! Each NaI detector's light curve is searched independently for a
//! significant excess over a trailing background estimate, in several energy
//! bands and on dyadic timescales ([`LightCurveAnalyzer`]). A burst is
//! detected when two detectors trigger within a short window of each other
//! ([`Trigger`]).

pub mod analyzer;
pub mod binning;
pub mod coincidence;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

pub use analyzer::{
    significance, AnalyzerState, BandSearchStats, DetectorAnalysis, LightCurveAnalyzer,
    TriggerCandidate,
};
pub use binning::{BandCounts, BinnedEvents};
pub use coincidence::{DetectorData, TestedDetector, Trigger, TriggerInput, TriggerResult};

/// Energy band searched for excesses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyBand {
    pub name: String,
    /// Lower edge (keV)
    pub emin: f64,
    /// Upper edge (keV); `None` takes every channel above `emin`
    pub emax: Option<f64>,
    /// Longest source timescale searched (s)
    pub max_timescale: f64,
}

impl EnergyBand {
    pub fn new(name: impl Into<String>, emin: f64, emax: Option<f64>, max_timescale: f64) -> Self {
        Self {
            name: name.into(),
            emin,
            emax,
            max_timescale,
        }
    }

    /// Source timescales in base bins: 1, 2, 4, ... up to `max_timescale`.
    pub fn timescale_bins(&self, base_resolution: f64) -> Vec<usize> {
        let limit = self.max_timescale / base_resolution * (1.0 + 1e-9);
        let mut bins = Vec::new();
        let mut k = 1usize;
        while (k as f64) <= limit {
            bins.push(k);
            k *= 2;
        }
        bins
    }
}

/// Trigger algorithm settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Significance (sigma) a window must reach to trigger
    pub threshold: f64,
    /// Two triggers this close in time (s) make a detection
    pub simul_trigger_window: f64,
    /// Detectors tested, nearest first
    pub max_n_dets: usize,
    /// Width of the base time bins (s)
    pub base_resolution: f64,
    /// Length of the background segment (s)
    pub background_duration: f64,
    /// Gap between background and source segments (s)
    pub gap_duration: f64,
    pub bands: Vec<EnergyBand>,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            threshold: 4.5,
            simul_trigger_window: 0.5,
            max_n_dets: 12,
            base_resolution: 0.016,
            background_duration: 17.0,
            gap_duration: 4.0,
            bands: vec![
                EnergyBand::new("50-300 keV", 50.0, Some(300.0), 8.192),
                EnergyBand::new("25-50 keV", 25.0, Some(50.0), 1.024),
                EnergyBand::new(">100 keV", 100.0, None, 1.024),
                EnergyBand::new(">300 keV", 300.0, None, 0.128),
            ],
        }
    }
}

impl TriggerConfig {
    /// Background segment length in base bins.
    pub fn background_bins(&self) -> usize {
        (self.background_duration / self.base_resolution).round() as usize
    }

    /// Gap length in base bins.
    pub fn gap_bins(&self) -> usize {
        (self.gap_duration / self.base_resolution).round() as usize
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |name: &'static str, reason: String| Err(ConfigError::Invalid { name, reason });

        if !self.threshold.is_finite() {
            return invalid("trigger.threshold", format!("must be finite, got {}", self.threshold));
        }
        if !(self.simul_trigger_window >= 0.0) {
            return invalid(
                "trigger.simul_trigger_window",
                format!("must be >= 0, got {}", self.simul_trigger_window),
            );
        }
        if !(self.base_resolution > 0.0) {
            return invalid(
                "trigger.base_resolution",
                format!("must be > 0, got {}", self.base_resolution),
            );
        }
        if self.background_bins() == 0 {
            return invalid(
                "trigger.background_duration",
                format!(
                    "must span at least one base bin, got {}",
                    self.background_duration
                ),
            );
        }
        if !(self.gap_duration >= 0.0) {
            return invalid(
                "trigger.gap_duration",
                format!("must be >= 0, got {}", self.gap_duration),
            );
        }
        for band in &self.bands {
            let bad_edges = !(band.emin >= 0.0) || band.emax.map_or(false, |hi| !(hi > band.emin));
            if bad_edges {
                return invalid("trigger.bands", format!("band {} has invalid edges", band.name));
            }
            if band.timescale_bins(self.base_resolution).is_empty() {
                return invalid(
                    "trigger.bands",
                    format!(
                        "band {} max_timescale {} is shorter than one base bin",
                        band.name, band.max_timescale
                    ),
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timescales() {
        let config = TriggerConfig::default();
        let res = config.base_resolution;
        let bins: Vec<usize> = config.bands[0].timescale_bins(res);
        assert_eq!(bins.first(), Some(&1));
        assert_eq!(bins.last(), Some(&512));
        assert_eq!(config.bands[1].timescale_bins(res).last(), Some(&64));
        assert_eq!(config.bands[3].timescale_bins(res), vec![1, 2, 4, 8]);
    }

    #[test]
    fn test_segment_bins() {
        let config = TriggerConfig::default();
        assert_eq!(config.background_bins(), 1063);
        assert_eq!(config.gap_bins(), 250);
    }

    #[test]
    fn test_validate() {
        assert!(TriggerConfig::default().validate().is_ok());

        let mut bad = TriggerConfig::default();
        bad.bands.push(EnergyBand::new("inverted", 300.0, Some(50.0), 1.0));
        assert!(bad.validate().is_err());

        let bad = TriggerConfig {
            background_duration: 0.001,
            ..TriggerConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
