//! Linear interpolation and sorted-array lookup.

use thiserror::Error;

/// Errors that can occur during interpolation operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpError {
    #[error("Input vectors must have at least 2 points")]
    InsufficientData,
    #[error("Input vectors must have the same length")]
    MismatchedLengths,
    #[error("X values must be sorted in ascending order")]
    UnsortedData,
}

fn validate(xs: &[f64], ys: &[f64]) -> Result<(), InterpError> {
    if xs.len() != ys.len() {
        return Err(InterpError::MismatchedLengths);
    }
    if xs.len() < 2 {
        return Err(InterpError::InsufficientData);
    }
    if xs.windows(2).any(|w| w[1] <= w[0]) {
        return Err(InterpError::UnsortedData);
    }
    Ok(())
}

/// Index of the first element of `sorted` that is not less than `x`.
///
/// Equivalent to a left-sided `searchsorted`: values below the first element
/// give 0 and values above the last element give `sorted.len()`. NaN compares
/// as greater than everything.
///
/// # Example
/// ```
/// use burst_math::searchsorted;
///
/// let edges = [1.0, 2.0, 4.0, 8.0];
/// assert_eq!(searchsorted(&edges, 0.5), 0);
/// assert_eq!(searchsorted(&edges, 2.0), 1);
/// assert_eq!(searchsorted(&edges, 3.0), 2);
/// assert_eq!(searchsorted(&edges, 9.0), 4);
/// ```
pub fn searchsorted(sorted: &[f64], x: f64) -> usize {
    sorted.partition_point(|&v| v < x)
}

/// Linear interpolation that holds the first and last values constant
/// outside the tabulated range.
///
/// Used for effective-area curves, which are tabulated at energy bin
/// centres but evaluated all the way out to the bin edges.
///
/// # Example
/// ```
/// use burst_math::interp_clamped;
///
/// let xs = [1.0, 2.0, 3.0];
/// let ys = [10.0, 20.0, 30.0];
/// assert_eq!(interp_clamped(0.0, &xs, &ys).unwrap(), 10.0);
/// assert_eq!(interp_clamped(2.5, &xs, &ys).unwrap(), 25.0);
/// assert_eq!(interp_clamped(7.0, &xs, &ys).unwrap(), 30.0);
/// ```
pub fn interp_clamped(x: f64, xs: &[f64], ys: &[f64]) -> Result<f64, InterpError> {
    validate(xs, ys)?;

    if x.is_nan() {
        return Ok(f64::NAN);
    }
    let last = xs.len() - 1;
    if x <= xs[0] {
        return Ok(ys[0]);
    }
    if x >= xs[last] {
        return Ok(ys[last]);
    }

    let hi = searchsorted(xs, x);
    if xs[hi] == x {
        return Ok(ys[hi]);
    }
    let lo = hi - 1;
    let t = (x - xs[lo]) / (xs[hi] - xs[lo]);
    Ok(ys[lo] + t * (ys[hi] - ys[lo]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interior_points() {
        let xs = vec![1.0, 2.0, 3.0, 4.0];
        let ys = vec![10.0, 20.0, 30.0, 40.0];
        assert_eq!(interp_clamped(2.0, &xs, &ys).unwrap(), 20.0);
        assert_eq!(interp_clamped(1.5, &xs, &ys).unwrap(), 15.0);
        assert_eq!(interp_clamped(3.25, &xs, &ys).unwrap(), 32.5);
        assert!(interp_clamped(f64::NAN, &xs, &ys).unwrap().is_nan());
    }

    #[test]
    fn test_clamped_holds_ends() {
        let xs = vec![10.0, 100.0];
        let ys = vec![1.0, 3.0];
        assert_eq!(interp_clamped(1.0, &xs, &ys).unwrap(), 1.0);
        assert_eq!(interp_clamped(1000.0, &xs, &ys).unwrap(), 3.0);
        assert_eq!(interp_clamped(55.0, &xs, &ys).unwrap(), 2.0);
    }

    #[test]
    fn test_validation_errors() {
        assert_eq!(
            interp_clamped(1.5, &[1.0, 2.0, 3.0], &[10.0, 20.0]),
            Err(InterpError::MismatchedLengths)
        );
        assert_eq!(
            interp_clamped(1.0, &[1.0], &[10.0]),
            Err(InterpError::InsufficientData)
        );
        assert_eq!(
            interp_clamped(1.5, &[2.0, 1.0, 3.0], &[20.0, 10.0, 30.0]),
            Err(InterpError::UnsortedData)
        );
    }

    #[test]
    fn test_searchsorted_edges() {
        let edges = [0.0, 1.0, 2.0];
        assert_eq!(searchsorted(&edges, -1.0), 0);
        assert_eq!(searchsorted(&edges, 0.0), 0);
        assert_eq!(searchsorted(&edges, 0.5), 1);
        assert_eq!(searchsorted(&edges, 2.0), 2);
        assert_eq!(searchsorted(&edges, 2.5), 3);
    }
}
