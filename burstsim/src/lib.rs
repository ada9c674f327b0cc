//! Gamma-ray burst photon event synthesis and trigger simulation
//!
//! This crate turns a time and energy dependent flux model into the photon
//! events a set of scintillation detectors would record, adds background,
//! applies detector dead time, and runs a multi-detector rate trigger on the
//! result to decide whether the burst would have been detected.
//!
//! The pipeline for one detector is:
//!
//! 1. [`flux`]: differential photon flux folded through the effective area
//! 2. [`sampler`]: arrival times by thinning, energies by rejection sampling
//! 3. [`response`]: photon energy to detector channel
//! 4. [`lightcurve`]: merge with background and apply dead time
//!
//! [`burst`] runs that pipeline for every detector of an instrument and
//! [`trigger`] fuses the per-detector results.

pub mod burst;
pub mod config;
pub mod error;
pub mod experiment;
pub mod flux;
pub mod instrument;
pub mod lightcurve;
pub mod parallel;
pub mod response;
pub mod sampler;
pub mod shared_args;
pub mod trigger;

// Re-exports for easier access
pub use burst::{BurstParams, BurstSimulation, DetectorOutcome, DetectorResult, Instrument};
pub use config::{ConfigError, SimulationConfig};
pub use error::SimError;
pub use flux::{FluxModel, FluxModelSpec, SourceFunction};
pub use instrument::{DetectorSpec, SkyPosition, GBM_DETECTORS};
pub use lightcurve::{EventStream, LightCurve, LightCurveStorage};
pub use response::{ResponseMatrix, ResponseProvider};
pub use trigger::{TriggerConfig, TriggerResult};
