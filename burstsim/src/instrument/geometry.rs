//! Source-to-detector geometry.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use burst_math::{angular_separation_deg, unit_vector_from_degrees};

use super::detector::DetectorSpec;

/// Equatorial sky position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyPosition {
    pub ra_deg: f64,
    pub dec_deg: f64,
}

impl SkyPosition {
    pub fn new(ra_deg: f64, dec_deg: f64) -> Self {
        Self { ra_deg, dec_deg }
    }

    pub fn unit_vector(&self) -> Vector3<f64> {
        unit_vector_from_degrees(self.ra_deg, self.dec_deg)
    }
}

/// Angle between a sky position and a detector normal at a given time.
pub trait GeometryProvider: Send + Sync {
    fn separation_deg(&self, position: &SkyPosition, detector: &DetectorSpec, time: f64) -> f64;
}

/// Spacecraft frame held aligned with the sky frame.
///
/// Detector azimuth maps to right ascension and `90 - zenith` to
/// declination, at every time.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPointing;

impl FixedPointing {
    /// Sky position that a detector normal points at.
    pub fn boresight(detector: &DetectorSpec) -> SkyPosition {
        SkyPosition::new(detector.azimuth_deg, 90.0 - detector.zenith_deg)
    }
}

impl GeometryProvider for FixedPointing {
    fn separation_deg(&self, position: &SkyPosition, detector: &DetectorSpec, _time: f64) -> f64 {
        angular_separation_deg(&position.unit_vector(), &detector.normal())
    }
}
