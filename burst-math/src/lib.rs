//! burst-math - Numerical helpers for photon event simulation
//!
//! This crate provides the small numerical toolkit shared by the burst
//! simulator, including:
//!
//! - **Grids** - Linearly and logarithmically spaced sample points
//! - **Interpolation** - Clamped linear interpolation and sorted lookup
//! - **Integration** - Trapezoid rule over tabulated samples
//! - **Sphere** - Unit vectors and angular separations on the sky
//! - **Statistics** - Mean, standard deviation and argmax
//!
//! # Example
//!
//! ```
//! use burst_math::{logspace, trap_integrate};
//!
//! // Integrate E^-2 between 10 and 1000 on a log grid
//! let energies = logspace(10.0, 1000.0, 200);
//! let values: Vec<f64> = energies.iter().map(|e| e.powi(-2)).collect();
//! let integral = trap_integrate(&values, &energies).unwrap();
//! assert!((integral - 0.099).abs() < 1e-3);
//! ```

pub mod grid;
pub mod interp;
pub mod sphere;
pub mod stats;
pub mod trapezoid;

// Re-export commonly used items
pub use grid::{linspace, logspace};
pub use interp::{interp_clamped, searchsorted, InterpError};
pub use sphere::{angular_separation_deg, unit_vector_from_degrees};
pub use stats::{argmax, mean, std_dev};
pub use trapezoid::{trap_integrate, IntegrationError};
