//! Background events: a constant rate and a channel template.
//!
//! Each detector gets its own rate, drawn once from a normal distribution,
//! and a template giving the fraction of background counts in each channel.
//! Templates come from a [`BackgroundTemplateProvider`]; two are provided:
//! a table loaded from JSON and a synthetic falling spectrum.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use super::time::{sample_event_times, ThinningOutcome};
use super::{SamplingError, SamplingGuard};
use crate::config::ConfigError;
use crate::instrument::DetectorSpec;

/// Per-channel background probabilities.
///
/// Entry `k` of the template always describes response channel `k`. A table
/// that labels its channels from 1 only shifts the labels, never the draws.
#[derive(Debug, Clone)]
pub struct BackgroundTemplate {
    first_label: u32,
    probabilities: Vec<f64>,
    dist: WeightedIndex<f64>,
}

impl BackgroundTemplate {
    /// Build a template from relative channel counts.
    ///
    /// Counts are normalized. `start_at_one` records that the source table
    /// numbers its first channel 1 instead of 0.
    pub fn new(counts: &[f64], start_at_one: bool) -> Result<Self, SamplingError> {
        let dist = WeightedIndex::new(counts)
            .map_err(|e| SamplingError::InvalidTemplate(e.to_string()))?;
        let total: f64 = counts.iter().sum();
        Ok(Self {
            first_label: u32::from(start_at_one),
            probabilities: counts.iter().map(|c| c / total).collect(),
            dist,
        })
    }

    /// Label the source table gives its first channel.
    pub fn first_label(&self) -> u32 {
        self.first_label
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    pub fn n_channels(&self) -> usize {
        self.probabilities.len()
    }

    /// Draw `size` response channel indices.
    pub fn sample_channels<R: Rng + ?Sized>(&self, size: usize, rng: &mut R) -> Vec<u32> {
        (0..size).map(|_| self.dist.sample(rng) as u32).collect()
    }
}

/// Background for one detector over a time window.
#[derive(Debug, Clone)]
pub struct Background {
    tstart: f64,
    tstop: f64,
    rate: f64,
    template: BackgroundTemplate,
}

impl Background {
    /// Draw the detector's rate from `Normal(average_rate, rate_sigma)`.
    ///
    /// Negative draws are clamped to zero.
    pub fn new<R: Rng + ?Sized>(
        tstart: f64,
        tstop: f64,
        average_rate: f64,
        rate_sigma: f64,
        template: BackgroundTemplate,
        rng: &mut R,
    ) -> Result<Self, SamplingError> {
        let normal = Normal::new(average_rate, rate_sigma).map_err(|_| {
            SamplingError::InvalidRate {
                name: "rate_sigma",
                value: rate_sigma,
            }
        })?;
        let rate = normal.sample(rng).max(0.0);
        Self::with_rate(tstart, tstop, rate, template)
    }

    /// Background with a fixed rate.
    pub fn with_rate(
        tstart: f64,
        tstop: f64,
        rate: f64,
        template: BackgroundTemplate,
    ) -> Result<Self, SamplingError> {
        if !(tstop > tstart) {
            return Err(SamplingError::InvalidWindow { tstart, tstop });
        }
        if !(rate >= 0.0) || !rate.is_finite() {
            return Err(SamplingError::InvalidRate {
                name: "background rate",
                value: rate,
            });
        }
        Ok(Self {
            tstart,
            tstop,
            rate,
            template,
        })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn window(&self) -> (f64, f64) {
        (self.tstart, self.tstop)
    }

    pub fn template(&self) -> &BackgroundTemplate {
        &self.template
    }

    /// Arrival times over the background window.
    pub fn sample_times<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        guard: &SamplingGuard,
    ) -> Result<ThinningOutcome, SamplingError> {
        let rate = self.rate;
        sample_event_times(|_| rate, self.tstart, self.tstop, rate, rng, guard)
    }

    pub fn sample_channels<R: Rng + ?Sized>(&self, size: usize, rng: &mut R) -> Vec<u32> {
        self.template.sample_channels(size, rng)
    }
}

/// Source of background templates per detector.
pub trait BackgroundTemplateProvider: Send + Sync {
    fn template(&self, detector: &DetectorSpec) -> Result<BackgroundTemplate, SamplingError>;
}

/// Templates keyed by detector name.
///
/// JSON layout:
/// ```json
/// { "start_at_one": false, "templates": { "n0": [12.0, 30.5, ...], "n1": [...] } }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateTable {
    #[serde(default)]
    pub start_at_one: bool,
    pub templates: HashMap<String, Vec<f64>>,
}

impl TemplateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, detector: impl Into<String>, counts: Vec<f64>) {
        self.templates.insert(detector.into(), counts);
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().display().to_string();
        let text = fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Io {
            path: path_str.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path_str,
            source,
        })
    }
}

impl BackgroundTemplateProvider for TemplateTable {
    fn template(&self, detector: &DetectorSpec) -> Result<BackgroundTemplate, SamplingError> {
        let counts = self.templates.get(&detector.name).ok_or_else(|| {
            SamplingError::InvalidTemplate(format!("no template for detector {}", detector.name))
        })?;
        BackgroundTemplate::new(counts, self.start_at_one)
    }
}

/// Falling power-law template with an overflow channel on top.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerLawTemplate {
    pub n_channels: usize,
    /// Weight of channel `k` is `(k + 1)^index`
    pub index: f64,
    /// Overflow weight as a fraction of all other channels
    pub overflow_fraction: f64,
}

impl Default for PowerLawTemplate {
    fn default() -> Self {
        Self {
            n_channels: 128,
            index: -1.0,
            overflow_fraction: 0.02,
        }
    }
}

impl PowerLawTemplate {
    pub fn counts(&self) -> Vec<f64> {
        let mut counts: Vec<f64> = (0..self.n_channels.saturating_sub(1))
            .map(|k| ((k + 1) as f64).powf(self.index))
            .collect();
        let overflow = self.overflow_fraction * counts.iter().sum::<f64>();
        counts.push(overflow);
        counts
    }
}

impl BackgroundTemplateProvider for PowerLawTemplate {
    fn template(&self, _detector: &DetectorSpec) -> Result<BackgroundTemplate, SamplingError> {
        BackgroundTemplate::new(&self.counts(), false)
    }
}
