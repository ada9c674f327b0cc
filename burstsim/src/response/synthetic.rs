//! Synthetic detector responses.
//!
//! Builds a [`ResponseMatrix`] for any detector and sky position from a small
//! scintillator model: an absorption efficiency curve, Gaussian energy
//! redistribution whose width grows as `sqrt(E)`, and the projected crystal
//! area at the source angle. Counts above the top channel edge fall into the
//! last (overflow) channel.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use statrs::function::erf::erf;
use std::f64::consts::SQRT_2;

use burst_math::logspace;

use super::{ResponseError, ResponseMatrix};
use crate::instrument::{DetectorKind, DetectorSpec, FixedPointing, GeometryProvider, SkyPosition};

/// FWHM to standard deviation for a Gaussian.
const FWHM_TO_SIGMA: f64 = 2.354_820_045;

/// Reference line for the quoted resolution (Cs-137).
const RESOLUTION_REFERENCE_KEV: f64 = 661.7;

/// Source of responses for a detector, position and time.
pub trait ResponseProvider: Send + Sync {
    fn response(
        &self,
        detector: &DetectorSpec,
        position: &SkyPosition,
        time: f64,
    ) -> Result<ResponseMatrix, ResponseError>;
}

/// Parametric description of a scintillator's energy response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScintillatorModel {
    /// Photon energy range covered by the matrix (keV)
    pub photon_range_kev: (f64, f64),
    pub n_photon_bins: usize,
    /// Channel energy range (keV); the last channel also takes overflow
    pub channel_range_kev: (f64, f64),
    pub n_channels: usize,
    /// Fractional FWHM at 661.7 keV
    pub fwhm_fraction: f64,
    /// Energy where window absorption stops dominating (keV)
    pub low_energy_cutoff_kev: f64,
    /// Energy above which the crystal becomes transparent (keV)
    pub high_energy_rolloff_kev: f64,
    /// Efficiency plateau between the two limits
    pub peak_efficiency: f64,
    /// Area scale applied beyond 90 degrees off the normal
    pub back_illumination: f64,
}

impl ScintillatorModel {
    /// Thin sodium iodide crystal behind a beryllium window.
    pub fn nai() -> Self {
        Self {
            photon_range_kev: (5.0, 2000.0),
            n_photon_bins: 140,
            channel_range_kev: (8.0, 1000.0),
            n_channels: 128,
            fwhm_fraction: 0.12,
            low_energy_cutoff_kev: 10.0,
            high_energy_rolloff_kev: 250.0,
            peak_efficiency: 0.9,
            back_illumination: 0.1,
        }
    }

    /// Thick bismuth germanate crystal.
    pub fn bgo() -> Self {
        Self {
            photon_range_kev: (100.0, 40_000.0),
            n_photon_bins: 140,
            channel_range_kev: (150.0, 40_000.0),
            n_channels: 128,
            fwhm_fraction: 0.15,
            low_energy_cutoff_kev: 150.0,
            high_energy_rolloff_kev: 5000.0,
            peak_efficiency: 0.8,
            back_illumination: 0.1,
        }
    }

    /// Probability that a photon of `energy` deposits in the crystal.
    pub fn efficiency(&self, energy: f64) -> f64 {
        let window = 1.0 - (-(energy / self.low_energy_cutoff_kev).powi(3)).exp();
        let stopping = 1.0 / (1.0 + (energy / self.high_energy_rolloff_kev).powf(1.5));
        self.peak_efficiency * window * stopping
    }

    /// Gaussian width (keV) of the measured energy for a line at `energy`.
    pub fn resolution_sigma(&self, energy: f64) -> f64 {
        let fwhm = self.fwhm_fraction
            * RESOLUTION_REFERENCE_KEV
            * (energy / RESOLUTION_REFERENCE_KEV).sqrt();
        fwhm / FWHM_TO_SIGMA
    }

    pub fn photon_edges(&self) -> Vec<f64> {
        logspace(
            self.photon_range_kev.0,
            self.photon_range_kev.1,
            self.n_photon_bins + 1,
        )
    }

    pub fn channel_edges(&self) -> Vec<f64> {
        logspace(
            self.channel_range_kev.0,
            self.channel_range_kev.1,
            self.n_channels + 1,
        )
    }

    /// Fraction of a line at `energy` measured in each channel.
    fn redistribution(&self, energy: f64, channel_edges: &[f64]) -> Vec<f64> {
        let sigma = self.resolution_sigma(energy);
        let cdf = |x: f64| 0.5 * (1.0 + erf((x - energy) / (sigma * SQRT_2)));

        let n = channel_edges.len() - 1;
        (0..n)
            .map(|j| {
                let lo = cdf(channel_edges[j]);
                let hi = if j + 1 == n { 1.0 } else { cdf(channel_edges[j + 1]) };
                (hi - lo).max(0.0)
            })
            .collect()
    }
}

/// Response generator driven by detector geometry and a scintillator model.
#[derive(Debug, Clone)]
pub struct SyntheticResponseGenerator<G: GeometryProvider = FixedPointing> {
    geometry: G,
    nai: ScintillatorModel,
    bgo: ScintillatorModel,
}

impl<G: GeometryProvider> SyntheticResponseGenerator<G> {
    pub fn new(geometry: G) -> Self {
        Self::with_models(geometry, ScintillatorModel::nai(), ScintillatorModel::bgo())
    }

    pub fn with_models(geometry: G, nai: ScintillatorModel, bgo: ScintillatorModel) -> Self {
        Self { geometry, nai, bgo }
    }

    pub fn geometry(&self) -> &G {
        &self.geometry
    }

    pub fn model_for(&self, kind: DetectorKind) -> &ScintillatorModel {
        match kind {
            DetectorKind::NaI => &self.nai,
            DetectorKind::Bgo => &self.bgo,
        }
    }

    /// Response of `detector` to a source `angle_deg` off its normal.
    pub fn at_angle(
        &self,
        detector: &DetectorSpec,
        angle_deg: f64,
    ) -> Result<ResponseMatrix, ResponseError> {
        let model = self.model_for(detector.kind);
        let photon_edges = model.photon_edges();
        let channel_edges = model.channel_edges();

        let geometric_area = detector.geometric_area(angle_deg);
        let illumination = if angle_deg > 90.0 {
            model.back_illumination
        } else {
            1.0
        };

        let mut matrix = Array2::<f64>::zeros((model.n_photon_bins, model.n_channels));
        for (i, mut row) in matrix.outer_iter_mut().enumerate() {
            let energy = (photon_edges[i] * photon_edges[i + 1]).sqrt();
            let area = geometric_area * illumination * model.efficiency(energy);
            for (cell, frac) in row
                .iter_mut()
                .zip(model.redistribution(energy, &channel_edges))
            {
                *cell = area * frac;
            }
        }

        ResponseMatrix::new(matrix, geometric_area, photon_edges, channel_edges)
    }
}

impl Default for SyntheticResponseGenerator<FixedPointing> {
    fn default() -> Self {
        Self::new(FixedPointing)
    }
}

impl<G: GeometryProvider> ResponseProvider for SyntheticResponseGenerator<G> {
    fn response(
        &self,
        detector: &DetectorSpec,
        position: &SkyPosition,
        time: f64,
    ) -> Result<ResponseMatrix, ResponseError> {
        let angle = self.geometry.separation_deg(position, detector, time);
        log::debug!(
            "building synthetic response for {} at {:.2} deg",
            detector.name,
            angle
        );
        self.at_angle(detector, angle)
    }
}
