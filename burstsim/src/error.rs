//! Crate-level error type.
//!
//! Each stage has its own error enum; [`SimError`] wraps them so the burst
//! driver and the binaries can use `?` across stage boundaries.

use thiserror::Error;

use crate::config::ConfigError;
use crate::flux::FluxModelError;
use crate::response::ResponseError;
use crate::sampler::SamplingError;

/// Any failure raised while building or running a burst simulation.
#[derive(Error, Debug)]
pub enum SimError {
    #[error(transparent)]
    Flux(#[from] FluxModelError),

    #[error(transparent)]
    Response(#[from] ResponseError),

    #[error(transparent)]
    Sampling(#[from] SamplingError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid burst parameter {name}: {value} (expected {bound})")]
    InvalidBurst {
        name: &'static str,
        value: f64,
        bound: &'static str,
    },

    #[error("unknown detector: {0}")]
    UnknownDetector(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_parameter() {
        let err = SimError::InvalidBurst {
            name: "z",
            value: -1.0,
            bound: "0 < z <= 20",
        };
        let msg = err.to_string();
        assert!(msg.contains("z"), "message should name the parameter: {msg}");
        assert!(msg.contains("-1"), "message should carry the value: {msg}");
    }

    #[test]
    fn test_stage_errors_convert() {
        let err: SimError = SamplingError::InvalidWindow {
            tstart: 1.0,
            tstop: 0.0,
        }
        .into();
        assert!(matches!(err, SimError::Sampling(_)));
    }
}
