//! Per-detector light curve assembly.
//!
//! [`LightCurve::process`] runs the whole event pipeline for one detector:
//!
//! 1. Source arrival times, photon energies and channels
//! 2. Background arrival times and channels
//! 3. Merge and stable sort by time
//! 4. Dead-time filtering
//!
//! The result is a [`LightCurveStorage`], which keeps the filtered stream for
//! triggering and the unfiltered source and background streams for
//! diagnostics.

pub mod dead_time;
pub mod event_stream;

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::flux::{FluxModel, SourceFunction};
use crate::response::ResponseMatrix;
use crate::sampler::{Background, SamplingError, SamplingGuard, Source};

pub use dead_time::{DeadTimeConfig, DeadTimeFilter};
pub use event_stream::EventStream;

/// One flag per channel: true when the channel centre lies in
/// `[emin, emax)`. An `emax` of `None` leaves the range open at the top.
pub fn channels_in_range(channel_edges: &[f64], emin: f64, emax: Option<f64>) -> Vec<bool> {
    channel_edges
        .windows(2)
        .map(|w| {
            let centre = 0.5 * (w[0] + w[1]);
            centre >= emin && emax.map_or(true, |hi| centre < hi)
        })
        .collect()
}

/// Counters from the samplers, kept for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplingDiagnostics {
    pub thinning_candidates: u64,
    pub thinning_violations: u64,
    pub energy_attempts: u64,
    pub energy_violations: u64,
}

/// Everything produced for one detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightCurveStorage {
    pub name: String,
    /// Window start relative to T0 (s)
    pub tstart: f64,
    /// Window end relative to T0 (s)
    pub tstop: f64,
    /// Burst trigger time T0 the window is referenced to
    pub time_adjustment: f64,
    pub channel_edges: Vec<f64>,
    pub dead_time: DeadTimeConfig,
    /// Source plus background after dead time
    pub events: EventStream,
    /// Source events before dead time
    pub source_events: EventStream,
    /// Background events before dead time
    pub background_events: EventStream,
    /// Observer-frame energies of the source photons (keV)
    pub source_energies: Vec<f64>,
    /// Background rate drawn for this detector (counts/s)
    pub background_rate: f64,
    pub diagnostics: SamplingDiagnostics,
}

impl LightCurveStorage {
    pub fn n_counts(&self) -> usize {
        self.events.len()
    }

    pub fn n_source_counts(&self) -> usize {
        self.source_events.len()
    }

    pub fn n_background_counts(&self) -> usize {
        self.background_events.len()
    }

    /// Events removed by dead time.
    pub fn n_dead_time_lost(&self) -> usize {
        (self.n_source_counts() + self.n_background_counts()).saturating_sub(self.n_counts())
    }

    /// Channel mask for an energy range, by channel centre.
    pub fn channel_mask(&self, emin: f64, emax: Option<f64>) -> Vec<bool> {
        channels_in_range(&self.channel_edges, emin, emax)
    }

    /// Filtered events whose channels fall in an energy range.
    pub fn select_energy_range(&self, emin: f64, emax: Option<f64>) -> EventStream {
        let mask = self.channel_mask(emin, emax);
        self.events
            .filter_channels(|c| mask.get(c as usize).copied().unwrap_or(false))
    }

    /// Binned counts of the filtered stream in an energy range.
    ///
    /// Returns the bin edges and the counts per bin; events at exactly
    /// `tstop` land in the last bin.
    pub fn binned(&self, dt: f64, emin: f64, emax: Option<f64>) -> (Vec<f64>, Vec<u64>) {
        if !(dt > 0.0) {
            return (vec![self.tstart], Vec::new());
        }
        let n_bins = ((self.tstop - self.tstart) / dt).ceil().max(1.0) as usize;
        let edges: Vec<f64> = (0..=n_bins).map(|i| self.tstart + i as f64 * dt).collect();
        let mut counts = vec![0u64; n_bins];
        for (t, _) in self.select_energy_range(emin, emax).iter() {
            if t < self.tstart || t > self.tstop {
                continue;
            }
            let idx = (((t - self.tstart) / dt) as usize).min(n_bins - 1);
            counts[idx] += 1;
        }
        (edges, counts)
    }
}

/// Event pipeline for one detector.
#[derive(Debug, Clone)]
pub struct LightCurve<S: SourceFunction = FluxModel> {
    name: String,
    source: Source<S>,
    background: Background,
    response: Arc<ResponseMatrix>,
    dead_time: DeadTimeFilter,
    time_adjustment: f64,
}

impl<S: SourceFunction> LightCurve<S> {
    /// Assemble a pipeline. The background window must contain the source
    /// window and the background template must have one entry per response
    /// channel.
    pub fn new(
        name: impl Into<String>,
        source: Source<S>,
        background: Background,
        response: Arc<ResponseMatrix>,
        dead_time: DeadTimeConfig,
        time_adjustment: f64,
    ) -> Result<Self, SamplingError> {
        let (start, stop) = source.window();
        let (tstart, tstop) = background.window();
        if start < tstart || stop > tstop {
            return Err(SamplingError::SourceOutsideWindow {
                start,
                stop,
                tstart,
                tstop,
            });
        }
        let template_channels = background.template().n_channels();
        if template_channels != response.n_channels() {
            return Err(SamplingError::InvalidTemplate(format!(
                "{} template channels for a {}-channel response",
                template_channels,
                response.n_channels()
            )));
        }
        let first_label = background.template().first_label();
        if first_label != 0 {
            log::debug!(
                "background template labels channels from {first_label}; \
                 entry k maps to response channel k"
            );
        }
        Ok(Self {
            name: name.into(),
            source,
            background,
            response,
            dead_time: DeadTimeFilter::new(dead_time),
            time_adjustment,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &Source<S> {
        &self.source
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    pub fn response(&self) -> &ResponseMatrix {
        &self.response
    }

    /// Generate, merge and dead-time filter all events.
    pub fn process<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        guard: &SamplingGuard,
    ) -> Result<LightCurveStorage, SamplingError> {
        let source_times = self.source.sample_times(rng, guard)?;
        let photons = self.source.sample_photons(&source_times.times, rng, guard)?;
        let source_channels = self
            .source
            .sample_channels(&photons.energies, &self.response, rng);
        let source_events = EventStream::new(source_times.times, source_channels)?;

        let bkg_times = self.background.sample_times(rng, guard)?;
        let bkg_channels = self.background.sample_channels(bkg_times.times.len(), rng);
        let background_events = EventStream::new(bkg_times.times, bkg_channels)?;

        let merged = EventStream::merge(&source_events, &background_events);
        let events = self.dead_time.apply(&merged);

        log::debug!(
            "{}: {} source + {} background events, {} after dead time",
            self.name,
            source_events.len(),
            background_events.len(),
            events.len()
        );

        let (tstart, tstop) = self.background.window();
        Ok(LightCurveStorage {
            name: self.name.clone(),
            tstart,
            tstop,
            time_adjustment: self.time_adjustment,
            channel_edges: self.response.channel_edges().to_vec(),
            dead_time: *self.dead_time.config(),
            events,
            source_events,
            background_events,
            source_energies: photons.energies,
            background_rate: self.background.rate(),
            diagnostics: SamplingDiagnostics {
                thinning_candidates: source_times.candidates + bkg_times.candidates,
                thinning_violations: source_times.envelope_violations,
                energy_attempts: photons.attempts,
                energy_violations: photons.envelope_violations,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SamplingConfig;
    use crate::flux::{ConstantCplParams, FluxModelSpec};
    use crate::sampler::BackgroundTemplate;
    use ndarray::Array2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn diagonal_response(n: usize) -> Arc<ResponseMatrix> {
        let edges = burst_math::logspace(10.0, 1000.0, n + 1);
        let matrix = Array2::from_diag(&ndarray::Array1::from_elem(n, 50.0));
        Arc::new(ResponseMatrix::new(matrix, 100.0, edges.clone(), edges).unwrap())
    }

    fn light_curve(response: Arc<ResponseMatrix>, rate: f64) -> LightCurve {
        let spec = FluxModelSpec::ConstantCpl(ConstantCplParams {
            peak_flux: 1e-7,
            ep: 200.0,
            alpha: -1.0,
        });
        let model = spec.build(&response).unwrap();
        let settings = SamplingConfig::default();
        let source = Source::new(0.0, 2.0, model, 0.0, &settings).unwrap();
        let template = BackgroundTemplate::new(&vec![1.0; response.n_channels()], false).unwrap();
        let background = Background::with_rate(-5.0, 5.0, rate, template).unwrap();
        LightCurve::new("n0", source, background, response, DeadTimeConfig::default(), 0.0)
            .unwrap()
    }

    #[test]
    fn test_process_partitions_events() {
        let _ = env_logger::builder().is_test(true).try_init();
        let lc = light_curve(diagonal_response(16), 100.0);
        let mut rng = StdRng::seed_from_u64(1);
        let storage = lc.process(&mut rng, &SamplingGuard::unbounded()).unwrap();

        assert!(storage.n_source_counts() > 0);
        assert!(storage.n_background_counts() > 0);
        assert!(storage.events.is_time_ordered());
        assert!(storage.n_counts() <= storage.n_source_counts() + storage.n_background_counts());
        assert_eq!(storage.source_energies.len(), storage.n_source_counts());
        assert!(storage
            .source_events
            .times()
            .iter()
            .all(|&t| t > 0.0 && t <= 2.0));
        assert_eq!(storage.channel_edges.len(), 17);
    }

    #[test]
    fn test_same_seed_same_events() {
        let lc = light_curve(diagonal_response(16), 100.0);
        let guard = SamplingGuard::unbounded();
        let a = lc.process(&mut StdRng::seed_from_u64(5), &guard).unwrap();
        let b = lc.process(&mut StdRng::seed_from_u64(5), &guard).unwrap();
        assert_eq!(a.events, b.events);
        assert_eq!(a.source_energies, b.source_energies);
    }

    #[test]
    fn test_template_must_match_response() {
        let response = diagonal_response(16);
        let model = FluxModelSpec::ConstantCpl(ConstantCplParams {
            peak_flux: 1e-7,
            ep: 200.0,
            alpha: -1.0,
        })
        .build(&response)
        .unwrap();
        let source = Source::new(0.0, 1.0, model, 0.0, &SamplingConfig::default()).unwrap();
        let template = BackgroundTemplate::new(&[1.0; 8], false).unwrap();
        let background = Background::with_rate(-1.0, 1.0, 1.0, template).unwrap();
        let err = LightCurve::new("n0", source, background, response, DeadTimeConfig::default(), 0.0)
            .unwrap_err();
        assert!(matches!(err, SamplingError::InvalidTemplate(_)));
    }

    #[test]
    fn test_background_window_must_contain_source() {
        let response = diagonal_response(4);
        let model = FluxModelSpec::ConstantCpl(ConstantCplParams {
            peak_flux: 1e-7,
            ep: 200.0,
            alpha: -1.0,
        })
        .build(&response)
        .unwrap();
        let source = Source::new(0.0, 10.0, model, 0.0, &SamplingConfig::default()).unwrap();
        let template = BackgroundTemplate::new(&[1.0; 4], false).unwrap();
        let background = Background::with_rate(-30.0, 2.0, 1.0, template).unwrap();
        let err =
            LightCurve::new("n0", source, background, response, DeadTimeConfig::default(), 0.0)
                .unwrap_err();
        assert_eq!(
            err,
            SamplingError::SourceOutsideWindow {
                start: 0.0,
                stop: 10.0,
                tstart: -30.0,
                tstop: 2.0,
            }
        );
    }

    #[test]
    fn test_energy_selection_and_binning() {
        let lc = light_curve(diagonal_response(16), 200.0);
        let storage = lc
            .process(&mut StdRng::seed_from_u64(2), &SamplingGuard::unbounded())
            .unwrap();

        let low = storage.select_energy_range(0.0, Some(100.0));
        let high = storage.select_energy_range(100.0, None);
        assert_eq!(low.len() + high.len(), storage.n_counts());

        let (edges, counts) = storage.binned(1.0, 0.0, None);
        assert_eq!(edges.len(), 11);
        assert_eq!(counts.iter().sum::<u64>() as usize, storage.n_counts());
    }

    #[test]
    fn test_channels_in_range_by_centre() {
        let edges = [10.0, 20.0, 40.0, 80.0];
        assert_eq!(channels_in_range(&edges, 15.0, Some(30.0)), vec![true, false, false]);
        assert_eq!(channels_in_range(&edges, 30.0, Some(60.0)), vec![false, true, false]);
        assert_eq!(channels_in_range(&edges, 30.0, None), vec![false, true, true]);
    }
}
