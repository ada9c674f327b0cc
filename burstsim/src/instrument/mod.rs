//! Instrument description: detectors and their pointing.

pub mod detector;
pub mod geometry;

pub use detector::{gbm_detector, DetectorKind, DetectorSpec, GBM_DETECTORS};
pub use geometry::{FixedPointing, GeometryProvider, SkyPosition};
