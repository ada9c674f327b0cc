//! Multi-detector coincidence.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::analyzer::{DetectorAnalysis, LightCurveAnalyzer, TriggerCandidate};
use super::TriggerConfig;
use crate::lightcurve::LightCurveStorage;

/// What a detector task produced.
#[derive(Debug, Clone, Copy)]
pub enum DetectorData<'a> {
    Available(&'a LightCurveStorage),
    Unavailable,
}

/// One detector offered to the trigger.
#[derive(Debug, Clone, Copy)]
pub struct TriggerInput<'a> {
    pub detector: &'a str,
    /// Angle between the source and the detector normal (deg)
    pub separation_deg: f64,
    pub can_trigger: bool,
    pub data: DetectorData<'a>,
}

/// A detector that took one of the test slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TestedDetector {
    Analyzed(DetectorAnalysis),
    Unavailable(String),
}

impl TestedDetector {
    pub fn name(&self) -> &str {
        match self {
            TestedDetector::Analyzed(analysis) => &analysis.detector,
            TestedDetector::Unavailable(name) => name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerResult {
    pub is_detected: bool,
    /// Detectors that triggered, in test order
    pub triggered_detectors: Vec<String>,
    pub triggered_times: Vec<f64>,
    pub triggered_timescales: Vec<f64>,
    pub candidates: Vec<TriggerCandidate>,
    /// Detectors that took a test slot, nearest first
    pub tested_detectors: Vec<String>,
    pub unavailable_detectors: Vec<String>,
    pub analyses: Vec<DetectorAnalysis>,
}

/// Burst-level trigger over all detectors.
#[derive(Debug, Clone, Copy)]
pub struct Trigger<'a> {
    config: &'a TriggerConfig,
}

impl<'a> Trigger<'a> {
    pub fn new(config: &'a TriggerConfig) -> Self {
        Self { config }
    }

    /// Analyze the nearest trigger-capable detectors and look for two
    /// triggers within the coincidence window.
    pub fn process(&self, inputs: &[TriggerInput<'_>]) -> TriggerResult {
        let mut ordered: Vec<&TriggerInput<'_>> =
            inputs.iter().filter(|input| input.can_trigger).collect();
        ordered.sort_by(|a, b| a.separation_deg.total_cmp(&b.separation_deg));
        ordered.truncate(self.config.max_n_dets);

        let analyzer = LightCurveAnalyzer::new(self.config);
        let tested: Vec<TestedDetector> = ordered
            .par_iter()
            .map(|input| match input.data {
                DetectorData::Available(storage) => {
                    TestedDetector::Analyzed(analyzer.analyze(storage))
                }
                DetectorData::Unavailable => TestedDetector::Unavailable(input.detector.to_string()),
            })
            .collect();

        find_coincidence(tested, self.config.simul_trigger_window)
    }
}

/// Scan detectors in test order; detection happens when a trigger falls
/// within `window` (inclusive) of an earlier one.
pub fn find_coincidence(tested: Vec<TestedDetector>, window: f64) -> TriggerResult {
    let mut result = TriggerResult::default();

    for detector in tested {
        result.tested_detectors.push(detector.name().to_string());
        let analysis = match detector {
            TestedDetector::Unavailable(name) => {
                result.unavailable_detectors.push(name);
                continue;
            }
            TestedDetector::Analyzed(analysis) => analysis,
        };

        if let Some(candidate) = analysis.candidate().cloned() {
            let coincident = result
                .triggered_times
                .iter()
                .any(|&t| (candidate.time - t).abs() <= window);

            result.triggered_detectors.push(candidate.detector.clone());
            result.triggered_times.push(candidate.time);
            result.triggered_timescales.push(candidate.timescale);
            result.candidates.push(candidate);
            result.analyses.push(analysis);

            if coincident {
                result.is_detected = true;
                break;
            }
        } else {
            result.analyses.push(analysis);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::AnalyzerState;

    fn analyzed(name: &str, time: Option<f64>) -> TestedDetector {
        let state = match time {
            Some(t) => AnalyzerState::Detected(TriggerCandidate {
                detector: name.into(),
                band: "50-300 keV".into(),
                time: t,
                timescale: 0.064,
                significance: 6.0,
                source_counts: 100,
                background_counts: 1000,
            }),
            None => AnalyzerState::NotDetected,
        };
        TestedDetector::Analyzed(DetectorAnalysis {
            detector: name.into(),
            state,
            skipped_no_source: false,
            bands: Vec::new(),
        })
    }

    #[test]
    fn test_single_trigger_is_not_a_detection() {
        let result = find_coincidence(vec![analyzed("n0", Some(1.0)), analyzed("n1", None)], 0.5);
        assert!(!result.is_detected);
        assert_eq!(result.triggered_detectors, vec!["n0"]);
        assert_eq!(result.tested_detectors, vec!["n0", "n1"]);
    }

    #[test]
    fn test_window_is_inclusive() {
        let result = find_coincidence(
            vec![analyzed("n0", Some(1.0)), analyzed("n1", Some(1.5))],
            0.5,
        );
        assert!(result.is_detected);
        assert_eq!(result.triggered_times, vec![1.0, 1.5]);

        let result = find_coincidence(
            vec![analyzed("n0", Some(1.0)), analyzed("n1", Some(1.5001))],
            0.5,
        );
        assert!(!result.is_detected);
        assert_eq!(result.triggered_detectors.len(), 2);
    }

    #[test]
    fn test_scan_stops_at_detection() {
        let result = find_coincidence(
            vec![
                analyzed("n0", Some(1.0)),
                analyzed("n1", Some(9.0)),
                analyzed("n2", Some(9.2)),
                analyzed("n3", Some(9.1)),
            ],
            0.5,
        );
        assert!(result.is_detected);
        assert_eq!(result.triggered_detectors, vec!["n0", "n1", "n2"]);
        assert_eq!(result.tested_detectors.len(), 3);
    }

    #[test]
    fn test_unavailable_takes_a_slot() {
        let result = find_coincidence(
            vec![
                analyzed("n0", Some(1.0)),
                TestedDetector::Unavailable("n1".into()),
                analyzed("n2", Some(1.1)),
            ],
            0.5,
        );
        assert!(result.is_detected);
        assert_eq!(result.unavailable_detectors, vec!["n1"]);
        assert_eq!(result.triggered_detectors, vec!["n0", "n2"]);
    }

    fn quiet_storage(name: &str) -> LightCurveStorage {
        use crate::lightcurve::{DeadTimeConfig, EventStream, SamplingDiagnostics};
        LightCurveStorage {
            name: name.into(),
            tstart: -1.0,
            tstop: 1.0,
            time_adjustment: 0.0,
            channel_edges: vec![10.0, 100.0],
            dead_time: DeadTimeConfig::disabled(),
            events: EventStream::empty(),
            source_events: EventStream::empty(),
            background_events: EventStream::empty(),
            source_energies: Vec::new(),
            background_rate: 0.0,
            diagnostics: SamplingDiagnostics::default(),
        }
    }

    #[test]
    fn test_process_orders_and_caps_detectors() {
        let storages: Vec<LightCurveStorage> =
            ["n0", "n1", "n2", "b0"].iter().map(|n| quiet_storage(n)).collect();
        let separations = [50.0, 10.0, 30.0, 1.0];
        let mut inputs: Vec<TriggerInput<'_>> = storages
            .iter()
            .zip(separations)
            .map(|(s, sep)| TriggerInput {
                detector: &s.name,
                separation_deg: sep,
                can_trigger: !s.name.starts_with('b'),
                data: DetectorData::Available(s),
            })
            .collect();
        inputs[2].data = DetectorData::Unavailable;

        let config = TriggerConfig {
            max_n_dets: 2,
            ..TriggerConfig::default()
        };
        let result = Trigger::new(&config).process(&inputs);

        assert!(!result.is_detected);
        assert_eq!(result.tested_detectors, vec!["n1", "n2"]);
        assert_eq!(result.unavailable_detectors, vec!["n2"]);
        assert_eq!(result.analyses.len(), 1);
        assert!(result.analyses[0].skipped_no_source);
    }
}
