//! Detector response matrices and photon digitization.
//!
//! A [`ResponseMatrix`] maps photon energy bins to detector channels. Row `i`
//! holds the effective area (cm²) with which a photon in energy bin `i` lands
//! in each channel. From it we derive:
//!
//! - the effective-area curve used to fold source spectra
//! - a per-row cumulative channel distribution used to digitize photons

pub mod synthetic;

use burst_math::{argmax, interp_clamped, searchsorted};
use ndarray::{Array2, ArrayView1, Axis};
use rand::Rng;
use thiserror::Error;

pub use synthetic::{ResponseProvider, SyntheticResponseGenerator};

/// Floor applied to empty rows of the effective-area curve so folded spectra
/// never divide by or interpolate through an exact zero.
const MIN_EFFECTIVE_AREA: f64 = 1e-99;

/// Trailing energy bins ignored when locating the effective-area peak.
const PEAK_SEARCH_TAIL: usize = 10;

/// Errors from building a response matrix.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResponseError {
    #[error("{name} edges must be strictly increasing with at least two entries")]
    BadEdges { name: &'static str },

    #[error("matrix shape {rows}x{cols} does not match {energy_bins} energy bins and {channels} channels")]
    ShapeMismatch {
        rows: usize,
        cols: usize,
        energy_bins: usize,
        channels: usize,
    },

    #[error("geometric area must be positive and finite, got {0}")]
    BadGeometricArea(f64),

    #[error("matrix entry ({row}, {col}) is {value}; entries must be finite and >= 0")]
    BadEntry { row: usize, col: usize, value: f64 },

    #[error("no response available for detector {0}")]
    Unavailable(String),
}

/// Effective area (cm²) tabulated at photon energy bin centres.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveAreaCurve {
    energies: Vec<f64>,
    areas: Vec<f64>,
}

impl EffectiveAreaCurve {
    /// Build a curve from matching energy and area tables.
    ///
    /// Energies must be strictly increasing.
    pub fn new(energies: Vec<f64>, areas: Vec<f64>) -> Result<Self, ResponseError> {
        if energies.len() != areas.len() {
            return Err(ResponseError::ShapeMismatch {
                rows: areas.len(),
                cols: 1,
                energy_bins: energies.len(),
                channels: 1,
            });
        }
        if energies.is_empty() || energies.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ResponseError::BadEdges { name: "effective area" });
        }
        Ok(Self { energies, areas })
    }

    /// A flat curve, handy for models that should not be folded.
    pub fn flat(area: f64, emin: f64, emax: f64) -> Self {
        Self {
            energies: vec![emin, emax],
            areas: vec![area, area],
        }
    }

    /// Effective area at `energy`, held constant beyond the table ends.
    pub fn at(&self, energy: f64) -> f64 {
        if self.energies.len() == 1 {
            return self.areas[0];
        }
        interp_clamped(energy, &self.energies, &self.areas).unwrap_or(0.0)
    }

    pub fn energies(&self) -> &[f64] {
        &self.energies
    }

    pub fn areas(&self) -> &[f64] {
        &self.areas
    }
}

/// An energy-to-channel response for one detector at one geometry.
#[derive(Debug, Clone)]
pub struct ResponseMatrix {
    matrix: Array2<f64>,
    energy_edges: Vec<f64>,
    channel_edges: Vec<f64>,
    geometric_area: f64,
    effective_area: EffectiveAreaCurve,
    max_effective_area_energy: f64,
    total_probability: Vec<f64>,
    cumulative: Array2<f64>,
}

impl ResponseMatrix {
    /// Build a response from a `[energy_bin, channel]` matrix in cm².
    ///
    /// # Arguments
    /// * `matrix` - Effective area per (photon bin, channel)
    /// * `geometric_area` - Projected detector area (cm²) at this geometry
    /// * `energy_edges` - Photon energy bin edges (keV), one more than rows
    /// * `channel_edges` - Channel energy edges (keV), one more than columns
    pub fn new(
        matrix: Array2<f64>,
        geometric_area: f64,
        energy_edges: Vec<f64>,
        channel_edges: Vec<f64>,
    ) -> Result<Self, ResponseError> {
        check_edges(&energy_edges, "energy")?;
        check_edges(&channel_edges, "channel")?;

        let (rows, cols) = matrix.dim();
        if rows != energy_edges.len() - 1 || cols != channel_edges.len() - 1 {
            return Err(ResponseError::ShapeMismatch {
                rows,
                cols,
                energy_bins: energy_edges.len() - 1,
                channels: channel_edges.len() - 1,
            });
        }
        if !(geometric_area > 0.0) || !geometric_area.is_finite() {
            return Err(ResponseError::BadGeometricArea(geometric_area));
        }
        if let Some(((row, col), &value)) = matrix
            .indexed_iter()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(ResponseError::BadEntry { row, col, value });
        }

        let energy_mean: Vec<f64> = energy_edges
            .windows(2)
            .map(|w| 0.5 * (w[0] + w[1]))
            .collect();

        let areas: Vec<f64> = matrix
            .sum_axis(Axis(1))
            .iter()
            .map(|&a| if a == 0.0 { MIN_EFFECTIVE_AREA } else { a })
            .collect();

        let search_len = if rows > PEAK_SEARCH_TAIL {
            rows - PEAK_SEARCH_TAIL
        } else {
            rows
        };
        let peak_idx = argmax(&areas[..search_len]).unwrap_or(0);
        let max_effective_area_energy = energy_mean[peak_idx];

        let probability = &matrix / geometric_area;
        let total_probability: Vec<f64> = probability.sum_axis(Axis(1)).to_vec();

        let mut cumulative = probability;
        for (mut row, &total) in cumulative.outer_iter_mut().zip(total_probability.iter()) {
            if total > 0.0 {
                row.mapv_inplace(|p| p / total);
            }
            let mut running = 0.0;
            for p in row.iter_mut() {
                running += *p;
                *p = running;
            }
        }

        Ok(Self {
            matrix,
            energy_edges,
            channel_edges,
            geometric_area,
            effective_area: EffectiveAreaCurve {
                energies: energy_mean,
                areas,
            },
            max_effective_area_energy,
            total_probability,
            cumulative,
        })
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    pub fn energy_edges(&self) -> &[f64] {
        &self.energy_edges
    }

    pub fn channel_edges(&self) -> &[f64] {
        &self.channel_edges
    }

    pub fn geometric_area(&self) -> f64 {
        self.geometric_area
    }

    /// Lowest photon energy covered (keV).
    pub fn emin(&self) -> f64 {
        self.energy_edges[0]
    }

    /// Highest photon energy covered (keV).
    pub fn emax(&self) -> f64 {
        self.energy_edges[self.energy_edges.len() - 1]
    }

    pub fn n_channels(&self) -> usize {
        self.channel_edges.len() - 1
    }

    pub fn n_energy_bins(&self) -> usize {
        self.energy_edges.len() - 1
    }

    /// Effective-area curve (row sums) at energy bin centres.
    pub fn effective_area(&self) -> &EffectiveAreaCurve {
        &self.effective_area
    }

    /// Energy of the effective-area peak, ignoring the top few bins.
    pub fn max_effective_area_energy(&self) -> f64 {
        self.max_effective_area_energy
    }

    /// Probability per photon of registering in any channel, per energy bin.
    pub fn total_probability(&self) -> &[f64] {
        &self.total_probability
    }

    /// Cumulative channel distribution for one photon energy bin.
    pub fn cumulative_row(&self, bin: usize) -> ArrayView1<'_, f64> {
        self.cumulative.row(bin)
    }

    /// Photon energy bin containing `energy`, clamped into the table.
    pub fn photon_bin(&self, energy: f64) -> usize {
        let idx = searchsorted(&self.energy_edges, energy);
        idx.saturating_sub(1).min(self.n_energy_bins() - 1)
    }

    /// Assign a detector channel to one photon.
    ///
    /// The channel is the first whose cumulative probability is closest to a
    /// uniform draw. Every photon gets a channel.
    pub fn digitize<R: Rng + ?Sized>(&self, energy: f64, rng: &mut R) -> u32 {
        let row = self.cumulative.row(self.photon_bin(energy));
        let r: f64 = rng.gen();

        let mut best = 0usize;
        let mut best_dist = f64::INFINITY;
        for (channel, &c) in row.iter().enumerate() {
            let dist = (c - r).abs();
            if dist < best_dist {
                best = channel;
                best_dist = dist;
            }
        }
        best as u32
    }

    /// Digitize a batch of photons.
    pub fn digitize_all<R: Rng + ?Sized>(&self, energies: &[f64], rng: &mut R) -> Vec<u32> {
        energies.iter().map(|&e| self.digitize(e, rng)).collect()
    }
}

fn check_edges(edges: &[f64], name: &'static str) -> Result<(), ResponseError> {
    if edges.len() < 2
        || edges.iter().any(|e| !e.is_finite())
        || edges.windows(2).any(|w| w[1] <= w[0])
    {
        return Err(ResponseError::BadEdges { name });
    }
    Ok(())
}
