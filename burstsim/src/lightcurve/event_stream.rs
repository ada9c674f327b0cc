//! Time-tagged event lists.

use serde::{Deserialize, Serialize};

use crate::sampler::SamplingError;

/// Parallel arrays of event times (s) and detector channels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventStream {
    times: Vec<f64>,
    channels: Vec<u32>,
}

impl EventStream {
    /// Pair up times and channels, which must have equal lengths.
    pub fn new(times: Vec<f64>, channels: Vec<u32>) -> Result<Self, SamplingError> {
        if times.len() != channels.len() {
            return Err(SamplingError::LengthMismatch {
                times: times.len(),
                channels: channels.len(),
            });
        }
        Ok(Self { times, channels })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn channels(&self) -> &[u32] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, u32)> + '_ {
        self.times.iter().copied().zip(self.channels.iter().copied())
    }

    /// Concatenate two streams and stable-sort by time.
    ///
    /// Events with equal times keep `first` before `second`.
    pub fn merge(first: &EventStream, second: &EventStream) -> EventStream {
        let mut events: Vec<(f64, u32)> = first.iter().chain(second.iter()).collect();
        events.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (times, channels) = events.into_iter().unzip();
        EventStream { times, channels }
    }

    /// Events where `mask` is true.
    pub fn select(&self, mask: &[bool]) -> EventStream {
        let (times, channels) = self
            .iter()
            .zip(mask)
            .filter(|(_, keep)| **keep)
            .map(|(event, _)| event)
            .unzip();
        EventStream { times, channels }
    }

    /// Events whose channel satisfies `pred`.
    pub fn filter_channels<F: Fn(u32) -> bool>(&self, pred: F) -> EventStream {
        let (times, channels) = self.iter().filter(|&(_, c)| pred(c)).unzip();
        EventStream { times, channels }
    }

    pub fn is_time_ordered(&self) -> bool {
        self.times.windows(2).all(|w| w[0] <= w[1])
    }
}
