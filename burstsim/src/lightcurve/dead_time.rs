//! Non-paralyzable detector dead time.
//!
//! After an event is recorded the electronics are blind for a fixed time that
//! depends on the channel: the overflow channel takes longer to reset. Events
//! arriving while dead are lost and do not extend the dead window.

use serde::{Deserialize, Serialize};

use super::event_stream::EventStream;

/// Dead-time constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadTimeConfig {
    /// Dead time after an ordinary event (s)
    pub dead_time: f64,
    /// Dead time after an overflow event (s)
    pub overflow_dead_time: f64,
    /// Channel that collects out-of-range energies
    pub overflow_channel: Option<u32>,
}

impl Default for DeadTimeConfig {
    fn default() -> Self {
        Self {
            dead_time: 2.6e-6,
            overflow_dead_time: 10.6e-6,
            overflow_channel: Some(127),
        }
    }
}

impl DeadTimeConfig {
    /// No dead time at all.
    pub fn disabled() -> Self {
        Self {
            dead_time: 0.0,
            overflow_dead_time: 0.0,
            overflow_channel: None,
        }
    }

    /// Dead time following an event in `channel`.
    pub fn dead_time_for(&self, channel: u32) -> f64 {
        if self.overflow_channel == Some(channel) {
            self.overflow_dead_time
        } else {
            self.dead_time
        }
    }
}

/// Whether the detector can currently record an event.
#[derive(Debug, Clone, Copy, PartialEq)]
enum DeadTimeState {
    Armed,
    DeadUntil(f64),
}

/// Applies dead time to a time-ordered event stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeadTimeFilter {
    config: DeadTimeConfig,
}

impl DeadTimeFilter {
    pub fn new(config: DeadTimeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DeadTimeConfig {
        &self.config
    }

    /// One flag per event: true if the event survives.
    ///
    /// An event is kept if it arrives strictly after the dead window of the
    /// previous kept event closes.
    pub fn keep_mask(&self, events: &EventStream) -> Vec<bool> {
        let mut state = DeadTimeState::Armed;
        events
            .iter()
            .map(|(t, channel)| {
                let keep = match state {
                    DeadTimeState::Armed => true,
                    DeadTimeState::DeadUntil(end) => t > end,
                };
                if keep {
                    state = DeadTimeState::DeadUntil(t + self.config.dead_time_for(channel));
                }
                keep
            })
            .collect()
    }

    /// The surviving events.
    pub fn apply(&self, events: &EventStream) -> EventStream {
        events.select(&self.keep_mask(events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn filter(dead: f64, overflow: f64) -> DeadTimeFilter {
        DeadTimeFilter::new(DeadTimeConfig {
            dead_time: dead,
            overflow_dead_time: overflow,
            overflow_channel: Some(127),
        })
    }

    #[test]
    fn test_boundary_is_exclusive() {
        let f = filter(1.0, 1.0);
        let events = EventStream::new(vec![0.0, 1.0, 1.5, 2.0, 2.0001], vec![0; 5]).unwrap();
        // 1.0 falls exactly on the end of the first window and is lost;
        // 1.5 is kept and blinds until 2.5.
        assert_eq!(f.keep_mask(&events), vec![true, false, true, false, false]);
    }

    #[test]
    fn test_rejected_events_do_not_extend() {
        let f = filter(1.0, 1.0);
        let events = EventStream::new(vec![0.0, 0.6, 0.9, 1.05], vec![0; 4]).unwrap();
        // A paralyzable detector would still be dead at 1.05.
        assert_eq!(f.keep_mask(&events), vec![true, false, false, true]);
    }

    #[test]
    fn test_overflow_uses_longer_dead_time() {
        let f = filter(2.6e-6, 10.6e-6);
        let events = EventStream::new(vec![0.0, 5e-6, 20e-6, 25e-6], vec![127, 3, 3, 3]).unwrap();
        assert_eq!(f.keep_mask(&events), vec![true, false, true, true]);
    }

    #[test]
    fn test_kept_events_respect_dead_time() {
        let f = filter(1e-3, 5e-3);
        let mut rng = StdRng::seed_from_u64(99);
        let mut t = 0.0;
        let mut times = Vec::new();
        let mut channels = Vec::new();
        for _ in 0..20_000 {
            t += rng.gen::<f64>() * 2e-3;
            times.push(t);
            channels.push(if rng.gen::<f64>() < 0.1 { 127 } else { 5 });
        }
        let events = EventStream::new(times, channels).unwrap();
        let kept = f.apply(&events);

        assert!(kept.len() < events.len());
        assert!(kept.is_time_ordered());
        for w in kept.times().windows(2).zip(kept.channels()) {
            let (pair, &first_channel) = w;
            let gap = pair[1] - pair[0];
            assert!(
                gap >= f.config().dead_time_for(first_channel) - 1e-12,
                "gap {gap} after channel {first_channel}"
            );
        }
    }

    #[test]
    fn test_disabled_keeps_everything_distinct() {
        let f = DeadTimeFilter::new(DeadTimeConfig::disabled());
        let events = EventStream::new(vec![0.0, 1e-9, 2e-9], vec![0, 127, 0]).unwrap();
        assert_eq!(f.apply(&events).len(), 3);
    }

    #[test]
    fn test_empty_stream() {
        let f = DeadTimeFilter::default();
        assert!(f.keep_mask(&EventStream::empty()).is_empty());
    }
}
