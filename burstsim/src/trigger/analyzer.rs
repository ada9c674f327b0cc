//! Single-detector excess search.

use serde::{Deserialize, Serialize};

use super::binning::{BandCounts, BinnedEvents};
use super::{EnergyBand, TriggerConfig};
use crate::lightcurve::{channels_in_range, LightCurveStorage};

/// Significance of `src` counts over a background estimate.
///
/// The background is scaled by the exposure ratio
/// `alpha = src_exposure / bkg_exposure`. Returns `None` when there is no
/// background to compare against.
pub fn significance(src: u64, bkg: u64, src_exposure: f64, bkg_exposure: f64) -> Option<f64> {
    if bkg == 0 || !(bkg_exposure > 0.0) {
        return None;
    }
    let alpha = src_exposure / bkg_exposure;
    let expected = alpha * bkg as f64;
    if !(expected > 0.0) {
        return None;
    }
    Some((src as f64 - expected) / expected.sqrt())
}

/// Where a detector's search crossed threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerCandidate {
    pub detector: String,
    pub band: String,
    /// Start of the source segment relative to T0 (s)
    pub time: f64,
    /// Source segment length (s)
    pub timescale: f64,
    pub significance: f64,
    pub source_counts: u64,
    pub background_counts: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnalyzerState {
    NotDetected,
    Detected(TriggerCandidate),
}

/// Work done in one band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandSearchStats {
    pub band: String,
    pub total_counts: u64,
    /// No counts in the band, nothing evaluated
    pub skipped: bool,
    pub evaluations: u64,
}

/// Outcome of searching one detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorAnalysis {
    pub detector: String,
    pub state: AnalyzerState,
    /// The detector saw no source photons and was not searched
    pub skipped_no_source: bool,
    pub bands: Vec<BandSearchStats>,
}

impl DetectorAnalysis {
    pub fn candidate(&self) -> Option<&TriggerCandidate> {
        match &self.state {
            AnalyzerState::Detected(candidate) => Some(candidate),
            AnalyzerState::NotDetected => None,
        }
    }

    pub fn is_detected(&self) -> bool {
        self.candidate().is_some()
    }

    pub fn evaluations(&self) -> u64 {
        self.bands.iter().map(|b| b.evaluations).sum()
    }
}

/// Searches one detector's light curve band by band.
#[derive(Debug, Clone, Copy)]
pub struct LightCurveAnalyzer<'a> {
    config: &'a TriggerConfig,
}

impl<'a> LightCurveAnalyzer<'a> {
    pub fn new(config: &'a TriggerConfig) -> Self {
        Self { config }
    }

    /// Run the search. Bands are tried in configured order and the search
    /// ends at the first band that triggers.
    pub fn analyze(&self, storage: &LightCurveStorage) -> DetectorAnalysis {
        let mut analysis = DetectorAnalysis {
            detector: storage.name.clone(),
            state: AnalyzerState::NotDetected,
            skipped_no_source: false,
            bands: Vec::new(),
        };

        if storage.n_source_counts() == 0 {
            log::debug!("{}: no source counts, skipping trigger search", storage.name);
            analysis.skipped_no_source = true;
            return analysis;
        }

        let binned = BinnedEvents::new(
            &storage.events,
            storage.tstart,
            storage.tstop,
            self.config.base_resolution,
            &storage.dead_time,
        );

        for band in &self.config.bands {
            let mask = channels_in_range(&storage.channel_edges, band.emin, band.emax);
            let counts = binned.band_counts(&mask);
            let mut stats = BandSearchStats {
                band: band.name.clone(),
                total_counts: counts.total(),
                skipped: false,
                evaluations: 0,
            };

            if stats.total_counts == 0 {
                stats.skipped = true;
                analysis.bands.push(stats);
                continue;
            }

            let hit = self.search_band(&storage.name, band, &binned, &counts, &mut stats);
            analysis.bands.push(stats);
            if let Some(candidate) = hit {
                log::debug!(
                    "{} triggered in {} at {:.3}s on {:.3}s ({:.2} sigma)",
                    candidate.detector,
                    candidate.band,
                    candidate.time,
                    candidate.timescale,
                    candidate.significance
                );
                analysis.state = AnalyzerState::Detected(candidate);
                break;
            }
        }

        analysis
    }

    fn search_band(
        &self,
        detector: &str,
        band: &EnergyBand,
        binned: &BinnedEvents,
        counts: &BandCounts,
        stats: &mut BandSearchStats,
    ) -> Option<TriggerCandidate> {
        let n_bkg = self.config.background_bins();
        let n_gap = self.config.gap_bins();
        let n_bins = binned.n_bins();
        let first = n_bkg + n_gap;

        for k in band.timescale_bins(self.config.base_resolution) {
            if first + k > n_bins {
                break;
            }
            for s in first..=(n_bins - k) {
                let start_time = binned.bin_start(s);
                if start_time <= 0.0 {
                    continue;
                }
                let bkg_from = s - n_gap - n_bkg;
                let bkg_to = s - n_gap;
                let bkg = counts.sum(bkg_from, bkg_to);
                let src = counts.sum(s, s + k);
                let Some(sig) = significance(
                    src,
                    bkg,
                    binned.exposure(s, s + k),
                    binned.exposure(bkg_from, bkg_to),
                ) else {
                    continue;
                };
                stats.evaluations += 1;

                if sig >= self.config.threshold {
                    return Some(TriggerCandidate {
                        detector: detector.to_string(),
                        band: band.name.clone(),
                        time: start_time,
                        timescale: k as f64 * binned.resolution(),
                        significance: sig,
                        source_counts: src,
                        background_counts: bkg,
                    });
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lightcurve::{DeadTimeConfig, EventStream, SamplingDiagnostics};
    use approx::assert_relative_eq;

    /// Unit bins over [-20, 10), four background events per bin and
    /// `extra` more in the bin starting at t = 2.
    fn storage(extra: usize) -> LightCurveStorage {
        let mut times = Vec::new();
        for bin in -20..10 {
            let t0 = bin as f64;
            for j in 0..4 {
                times.push(t0 + 0.1 + 0.2 * j as f64);
            }
            if bin == 2 {
                for j in 0..extra {
                    times.push(t0 + 0.05 + 0.01 * j as f64);
                }
            }
        }
        times.sort_by(f64::total_cmp);
        let n = times.len();
        let events = EventStream::new(times, vec![0; n]).unwrap();
        let source_events = EventStream::new(vec![2.5; extra], vec![0; extra]).unwrap();

        LightCurveStorage {
            name: "n0".into(),
            tstart: -20.0,
            tstop: 10.0,
            time_adjustment: 0.0,
            channel_edges: vec![10.0, 100.0, 1000.0],
            dead_time: DeadTimeConfig::disabled(),
            events,
            source_events,
            background_events: EventStream::empty(),
            source_energies: vec![50.0; extra],
            background_rate: 4.0,
            diagnostics: SamplingDiagnostics::default(),
        }
    }

    fn config(threshold: f64) -> TriggerConfig {
        TriggerConfig {
            threshold,
            base_resolution: 1.0,
            background_duration: 16.0,
            gap_duration: 0.0,
            bands: vec![EnergyBand::new("low", 10.0, Some(100.0), 1.0)],
            ..TriggerConfig::default()
        }
    }

    #[test]
    fn test_significance_formula() {
        // alpha = 1/16, expected 4, (10 - 4) / 2
        assert_relative_eq!(significance(10, 64, 1.0, 16.0).unwrap(), 3.0);
        assert_eq!(significance(10, 0, 1.0, 16.0), None);
        assert_eq!(significance(10, 5, 1.0, 0.0), None);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let config = config(3.0);
        let analyzer = LightCurveAnalyzer::new(&config);

        let at_threshold = analyzer.analyze(&storage(6));
        let candidate = at_threshold.candidate().expect("10 counts reach 3 sigma");
        assert_relative_eq!(candidate.time, 2.0);
        assert_relative_eq!(candidate.timescale, 1.0);
        assert_relative_eq!(candidate.significance, 3.0);
        assert_eq!(candidate.source_counts, 10);
        assert_eq!(candidate.background_counts, 64);

        let below = analyzer.analyze(&storage(5));
        assert!(!below.is_detected());
        assert!(below.evaluations() > 0);
    }

    #[test]
    fn test_source_segment_must_start_after_zero() {
        let mut lc = storage(0);
        // Huge excess in the bin starting at t = 0; its segment does not
        // start after T0 and must not trigger.
        let mut times = lc.events.times().to_vec();
        times.extend(std::iter::repeat(0.5).take(50));
        times.sort_by(f64::total_cmp);
        let n = times.len();
        lc.events = EventStream::new(times, vec![0; n]).unwrap();
        lc.source_events = EventStream::new(vec![0.5], vec![0]).unwrap();

        let config = config(3.0);
        let analysis = LightCurveAnalyzer::new(&config).analyze(&lc);
        assert!(!analysis.is_detected());
    }

    #[test]
    fn test_empty_band_is_skipped() {
        let mut config = config(3.0);
        config
            .bands
            .insert(0, EnergyBand::new("high", 100.0, None, 1.0));
        let analysis = LightCurveAnalyzer::new(&config).analyze(&storage(6));

        assert!(analysis.bands[0].skipped);
        assert_eq!(analysis.bands[0].evaluations, 0);
        assert!(!analysis.bands[1].skipped);
        assert!(analysis.bands[1].evaluations > 0);
        assert!(analysis.is_detected());
    }

    #[test]
    fn test_no_source_counts_skips_search() {
        let mut lc = storage(6);
        lc.source_events = EventStream::empty();
        let config = config(3.0);
        let analysis = LightCurveAnalyzer::new(&config).analyze(&lc);
        assert!(analysis.skipped_no_source);
        assert!(analysis.bands.is_empty());
        assert!(!analysis.is_detected());
    }

    #[test]
    fn test_search_stops_at_first_band() {
        let mut config = config(3.0);
        config
            .bands
            .push(EnergyBand::new("again", 10.0, Some(100.0), 1.0));
        let analysis = LightCurveAnalyzer::new(&config).analyze(&storage(8));
        assert!(analysis.is_detected());
        assert_eq!(analysis.bands.len(), 1);
    }
}
