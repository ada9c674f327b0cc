//! Trapezoid rule integration over tabulated samples.

use thiserror::Error;

/// Errors from tabulated integration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntegrationError {
    #[error("sample and abscissa lengths differ: {values} values vs {points} points")]
    MismatchedLengths { values: usize, points: usize },
}

/// Integrate tabulated `values` over the abscissae `xs` with the trapezoid rule.
///
/// The abscissae do not need to be evenly spaced. Fewer than two samples
/// integrate to zero.
///
/// # Example
/// ```
/// use burst_math::{linspace, trap_integrate};
///
/// let xs = linspace(0.0, 2.0, 3);
/// let ys: Vec<f64> = xs.iter().map(|x| 3.0 * x).collect();
/// assert_eq!(trap_integrate(&ys, &xs).unwrap(), 6.0);
/// ```
pub fn trap_integrate(values: &[f64], xs: &[f64]) -> Result<f64, IntegrationError> {
    if values.len() != xs.len() {
        return Err(IntegrationError::MismatchedLengths {
            values: values.len(),
            points: xs.len(),
        });
    }

    Ok(values
        .windows(2)
        .zip(xs.windows(2))
        .map(|(y, x)| 0.5 * (y[0] + y[1]) * (x[1] - x[0]))
        .sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{linspace, logspace};
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_function_is_exact() {
        let xs = linspace(-3.0, 5.0, 17);
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x + 1.0).collect();
        // integral of 2x+1 from -3 to 5 = [x^2 + x] = 30 - 6
        assert_relative_eq!(trap_integrate(&ys, &xs).unwrap(), 24.0, epsilon = 1e-12);
    }

    #[test]
    fn test_power_law_on_log_grid() {
        let xs = logspace(10.0, 1.0e4, 500);
        let ys: Vec<f64> = xs.iter().map(|x| x.powf(-1.5)).collect();
        let expected = 2.0 * (10f64.powf(-0.5) - 1.0e4f64.powf(-0.5));
        assert_relative_eq!(
            trap_integrate(&ys, &xs).unwrap(),
            expected,
            max_relative = 1e-3
        );
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(trap_integrate(&[], &[]).unwrap(), 0.0);
        assert_eq!(trap_integrate(&[4.0], &[1.0]).unwrap(), 0.0);
        assert!(trap_integrate(&[1.0, 2.0], &[1.0]).is_err());
    }
}
