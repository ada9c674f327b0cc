//! Evenly spaced sample grids.

/// Linearly spaced points from `start` to `stop` inclusive.
///
/// Returns an empty vector when `num == 0` and `[start]` when `num == 1`.
/// The last point is set to `stop` exactly so that integration bounds are
/// not perturbed by accumulated rounding.
///
/// # Example
/// ```
/// use burst_math::linspace;
///
/// let pts = linspace(0.0, 1.0, 5);
/// assert_eq!(pts, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
/// ```
pub fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            let mut pts: Vec<f64> = (0..num).map(|i| start + step * i as f64).collect();
            pts[num - 1] = stop;
            pts
        }
    }
}

/// Logarithmically spaced points from `start` to `stop` inclusive.
///
/// Both bounds must be strictly positive; the points are evenly spaced in
/// `log10`. The endpoints are returned exactly.
///
/// # Example
/// ```
/// use burst_math::logspace;
///
/// let pts = logspace(1.0, 1000.0, 4);
/// assert!((pts[1] - 10.0).abs() < 1e-9);
/// assert!((pts[2] - 100.0).abs() < 1e-9);
/// ```
pub fn logspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    let mut pts: Vec<f64> = linspace(start.log10(), stop.log10(), num)
        .into_iter()
        .map(|x| 10f64.powf(x))
        .collect();
    if let Some(first) = pts.first_mut() {
        *first = start;
    }
    if num > 1 {
        pts[num - 1] = stop;
    }
    pts
}
