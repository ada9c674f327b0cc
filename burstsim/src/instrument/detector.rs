//! Scintillator detector descriptions for the GBM-like instrument

use nalgebra::Vector3;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use burst_math::unit_vector_from_degrees;

/// Scintillator material, which sets size, energy range and trigger role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectorKind {
    /// Sodium iodide, low-energy detectors used for triggering
    NaI,
    /// Bismuth germanate, high-energy detectors (never trigger)
    Bgo,
}

/// One detector: name, mounting direction and cylinder dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorSpec {
    /// Short name such as "n0" or "b1"
    pub name: String,
    pub kind: DetectorKind,
    /// Azimuth of the detector normal in the spacecraft frame (degrees)
    pub azimuth_deg: f64,
    /// Zenith angle of the detector normal in the spacecraft frame (degrees)
    pub zenith_deg: f64,
    /// Crystal radius (cm)
    pub radius_cm: f64,
    /// Crystal thickness (cm)
    pub height_cm: f64,
}

impl DetectorSpec {
    pub fn new(
        name: impl Into<String>,
        kind: DetectorKind,
        azimuth_deg: f64,
        zenith_deg: f64,
        radius_cm: f64,
        height_cm: f64,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            azimuth_deg,
            zenith_deg,
            radius_cm,
            height_cm,
        }
    }

    /// NaI detector with the standard 12.7 cm x 1.27 cm crystal.
    pub fn nai(name: impl Into<String>, azimuth_deg: f64, zenith_deg: f64) -> Self {
        Self::new(name, DetectorKind::NaI, azimuth_deg, zenith_deg, 6.35, 1.27)
    }

    /// BGO detector with the standard 12.7 cm x 12.7 cm crystal.
    pub fn bgo(name: impl Into<String>, azimuth_deg: f64, zenith_deg: f64) -> Self {
        Self::new(name, DetectorKind::Bgo, azimuth_deg, zenith_deg, 6.35, 12.7)
    }

    /// Whether this detector takes part in the on-board trigger.
    pub fn can_trigger(&self) -> bool {
        self.kind == DetectorKind::NaI
    }

    /// Unit normal in the spacecraft frame.
    pub fn normal(&self) -> Vector3<f64> {
        unit_vector_from_degrees(self.azimuth_deg, 90.0 - self.zenith_deg)
    }

    /// Projected area (cm²) of the crystal seen from `angle_deg` off its normal.
    ///
    /// Face plus side of a cylinder: `|πr² cosθ| + |2rh sinθ|`.
    pub fn geometric_area(&self, angle_deg: f64) -> f64 {
        let theta = angle_deg.to_radians();
        (PI * self.radius_cm.powi(2) * theta.cos()).abs()
            + (2.0 * self.radius_cm * self.height_cm * theta.sin()).abs()
    }
}

/// The twelve NaI and two BGO detectors, in instrument order.
pub static GBM_DETECTORS: Lazy<Vec<DetectorSpec>> = Lazy::new(|| {
    vec![
        DetectorSpec::nai("n0", 45.89, 20.58),
        DetectorSpec::nai("n1", 45.11, 45.31),
        DetectorSpec::nai("n2", 58.44, 90.21),
        DetectorSpec::nai("n3", 314.87, 45.24),
        DetectorSpec::nai("n4", 303.15, 90.27),
        DetectorSpec::nai("n5", 3.35, 89.79),
        DetectorSpec::nai("n6", 224.93, 20.43),
        DetectorSpec::nai("n7", 224.62, 46.18),
        DetectorSpec::nai("n8", 236.61, 89.97),
        DetectorSpec::nai("n9", 135.19, 45.55),
        DetectorSpec::nai("na", 123.73, 90.42),
        DetectorSpec::nai("nb", 183.74, 90.32),
        DetectorSpec::bgo("b0", 0.0, 90.0),
        DetectorSpec::bgo("b1", 180.0, 90.0),
    ]
});

/// Look a detector up by name in [`GBM_DETECTORS`].
pub fn gbm_detector(name: &str) -> Option<&'static DetectorSpec> {
    GBM_DETECTORS.iter().find(|d| d.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_table() {
        assert_eq!(GBM_DETECTORS.len(), 14);
        assert_eq!(GBM_DETECTORS.iter().filter(|d| d.can_trigger()).count(), 12);
        let b0 = gbm_detector("b0").unwrap();
        assert_eq!(b0.kind, DetectorKind::Bgo);
        assert_eq!(b0.height_cm, 12.7);
        assert!(gbm_detector("n12").is_none());
    }

    #[test]
    fn test_geometric_area_limits() {
        let n0 = gbm_detector("n0").unwrap();
        let face = PI * 6.35 * 6.35;
        assert_relative_eq!(n0.geometric_area(0.0), face, epsilon = 1e-9);
        assert_relative_eq!(n0.geometric_area(90.0), 2.0 * 6.35 * 1.27, epsilon = 1e-9);
        // Back illumination projects the same area
        assert_relative_eq!(n0.geometric_area(180.0), face, epsilon = 1e-9);
    }

    #[test]
    fn test_normal_matches_zenith() {
        let n0 = gbm_detector("n0").unwrap();
        let zenith = Vector3::new(0.0, 0.0, 1.0);
        let angle = burst_math::angular_separation_deg(&n0.normal(), &zenith);
        assert_relative_eq!(angle, 20.58, epsilon = 1e-9);
    }
}
