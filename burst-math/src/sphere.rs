//! Directions on the unit sphere.
//!
//! Longitude/latitude pairs (RA/Dec, or azimuth/elevation in an instrument
//! frame) are converted to unit vectors so separations can be taken with a
//! dot product instead of spherical trigonometry.

use nalgebra::Vector3;

/// Unit vector for a direction given as longitude and latitude in degrees.
///
/// # Example
/// ```
/// use burst_math::unit_vector_from_degrees;
///
/// let pole = unit_vector_from_degrees(123.0, 90.0);
/// assert!((pole.z - 1.0).abs() < 1e-12);
/// ```
pub fn unit_vector_from_degrees(lon_deg: f64, lat_deg: f64) -> Vector3<f64> {
    let (lon, lat) = (lon_deg.to_radians(), lat_deg.to_radians());
    Vector3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin())
}

/// Angle between two directions in degrees (0 to 180).
///
/// Zero-length inputs give 0.
pub fn angular_separation_deg(v1: &Vector3<f64>, v2: &Vector3<f64>) -> f64 {
    let mag1 = v1.norm();
    let mag2 = v2.norm();

    if mag1 < f64::EPSILON || mag2 < f64::EPSILON {
        return 0.0;
    }

    let cos_angle = (v1.dot(v2) / (mag1 * mag2)).clamp(-1.0, 1.0);
    cos_angle.acos().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_unit_vector_is_normalized() {
        for &(lon, lat) in &[(0.0, 0.0), (45.89, 69.42), (312.0, -62.0), (180.0, -90.0)] {
            assert_relative_eq!(unit_vector_from_degrees(lon, lat).norm(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_separation_known_angles() {
        let x = unit_vector_from_degrees(0.0, 0.0);
        let y = unit_vector_from_degrees(90.0, 0.0);
        let z = unit_vector_from_degrees(0.0, 90.0);

        assert_relative_eq!(angular_separation_deg(&x, &y), 90.0, epsilon = 1e-9);
        assert_relative_eq!(angular_separation_deg(&x, &z), 90.0, epsilon = 1e-9);
        assert_relative_eq!(angular_separation_deg(&x, &(-x)), 180.0, epsilon = 1e-9);
        assert_relative_eq!(angular_separation_deg(&y, &y), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_separation_along_meridian() {
        let a = unit_vector_from_degrees(10.0, 20.0);
        let b = unit_vector_from_degrees(10.0, 55.0);
        assert_relative_eq!(angular_separation_deg(&a, &b), 35.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_vector() {
        let zero = Vector3::zeros();
        let x = unit_vector_from_degrees(0.0, 0.0);
        assert_eq!(angular_separation_deg(&zero, &x), 0.0);
    }
}
