//! Cutoff power-law spectra.
//!
//! The photon spectrum is `N(E) = K (E/Ec)^α exp(-E/Ec)` with `Ec = Ep/(2+α)`,
//! so that `E² N(E)` peaks at `Ep`. `K` is fixed by requiring the energy flux
//! between `emin` and `emax` to equal a given amplitude in erg cm⁻² s⁻¹:
//!
//! ```text
//! ∫ E N(E) dE = K Ec² [Γ(2+α, emin/Ec) − Γ(2+α, emax/Ec)]
//! ```

use serde::{Deserialize, Serialize};
use statrs::function::gamma::checked_gamma_ui;

use super::{check_positive, FluxModelError, SourceFunction};
use crate::response::EffectiveAreaCurve;

/// keV per erg.
pub const KEV_PER_ERG: f64 = 6.241_509_074e8;

/// Smallest `2 + α` used when α sits at the -2 pole.
const MIN_SHAPE: f64 = 1e-4;

/// Check α and return the gamma-function shape `2 + α`.
///
/// α must be negative and no softer than -2; α at -2 is nudged to
/// `2 + α = 1e-4` instead of being rejected.
pub fn cpl_shape(alpha: f64) -> Result<f64, FluxModelError> {
    if !alpha.is_finite() || alpha >= 0.0 || alpha < -2.0 {
        return Err(FluxModelError::InvalidIndex { alpha });
    }
    Ok((2.0 + alpha).max(MIN_SHAPE))
}

/// A normalized cutoff power law at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutoffPowerLaw {
    alpha: f64,
    ec: f64,
    norm: f64,
}

impl CutoffPowerLaw {
    /// Normalize a spectrum to `amplitude` erg cm⁻² s⁻¹ over `[emin, emax]` keV.
    pub fn new(
        amplitude: f64,
        ep: f64,
        alpha: f64,
        emin: f64,
        emax: f64,
    ) -> Result<Self, FluxModelError> {
        let shape = cpl_shape(alpha)?;
        let ec = ep / shape;

        let upper = |x: f64| checked_gamma_ui(shape, x).ok();
        let integral = match (upper(emin / ec), upper(emax / ec)) {
            (Some(lo), Some(hi)) => ec * ec * (lo - hi),
            _ => f64::NAN,
        };
        if !(integral > 0.0) || !integral.is_finite() {
            return Err(FluxModelError::Normalization { ep, alpha });
        }

        Ok(Self {
            alpha,
            ec,
            norm: amplitude * KEV_PER_ERG / integral,
        })
    }

    pub fn cutoff_energy(&self) -> f64 {
        self.ec
    }

    /// Photon flux density (ph cm⁻² s⁻¹ keV⁻¹) at `energy`.
    pub fn eval(&self, energy: f64) -> f64 {
        if energy <= 0.0 {
            return 0.0;
        }
        let log_ratio = energy.ln() - self.ec.ln();
        self.norm * (self.alpha * log_ratio - energy / self.ec).exp()
    }
}

/// Parameters of a time-independent cutoff power law.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstantCplParams {
    /// Energy flux over the model band (erg cm⁻² s⁻¹)
    pub peak_flux: f64,
    /// νFν peak energy (keV)
    pub ep: f64,
    /// Low-energy photon index
    pub alpha: f64,
}

impl ConstantCplParams {
    pub fn validate(&self) -> Result<(), FluxModelError> {
        check_positive("peak_flux", self.peak_flux)?;
        check_positive("ep", self.ep)?;
        cpl_shape(self.alpha).map(|_| ())
    }
}

/// Cutoff power law that does not change with time.
#[derive(Debug, Clone)]
pub struct ConstantCpl {
    params: ConstantCplParams,
    spectrum: CutoffPowerLaw,
    effective_area: EffectiveAreaCurve,
    emin: f64,
    emax: f64,
}

impl ConstantCpl {
    pub fn new(
        params: ConstantCplParams,
        effective_area: EffectiveAreaCurve,
        emin: f64,
        emax: f64,
    ) -> Result<Self, FluxModelError> {
        params.validate()?;
        super::check_energy_range(emin, emax)?;
        let spectrum = CutoffPowerLaw::new(params.peak_flux, params.ep, params.alpha, emin, emax)?;
        Ok(Self {
            params,
            spectrum,
            effective_area,
            emin,
            emax,
        })
    }

    pub fn params(&self) -> &ConstantCplParams {
        &self.params
    }
}

impl SourceFunction for ConstantCpl {
    fn emin(&self) -> f64 {
        self.emin
    }

    fn emax(&self) -> f64 {
        self.emax
    }

    fn index(&self) -> f64 {
        self.params.alpha
    }

    fn effective_area(&self) -> &EffectiveAreaCurve {
        &self.effective_area
    }

    fn spectrum(&self, energies: &[f64], _time: f64) -> Vec<f64> {
        energies.iter().map(|&e| self.spectrum.eval(e)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use burst_math::{logspace, trap_integrate};

    #[test]
    fn test_energy_flux_matches_amplitude() {
        let (emin, emax) = (10.0, 1.0e4);
        for &(ep, alpha) in &[(300.0, -0.66), (50.0, -1.5), (800.0, -0.2), (200.0, -1.0)] {
            let cpl = CutoffPowerLaw::new(1e-6, ep, alpha, emin, emax).unwrap();
            let grid = logspace(emin, emax, 4000);
            let eflux: Vec<f64> = grid.iter().map(|&e| e * cpl.eval(e)).collect();
            let total = trap_integrate(&eflux, &grid).unwrap() / KEV_PER_ERG;
            assert_relative_eq!(total, 1e-6, max_relative = 1e-3);
        }
    }

    #[test]
    fn test_nu_f_nu_peaks_at_ep() {
        let cpl = CutoffPowerLaw::new(1e-6, 300.0, -0.66, 10.0, 1.0e4).unwrap();
        let grid = logspace(10.0, 1.0e4, 20_000);
        let nufnu: Vec<f64> = grid.iter().map(|&e| e * e * cpl.eval(e)).collect();
        let peak = grid[burst_math::argmax(&nufnu).unwrap()];
        assert_relative_eq!(peak, 300.0, max_relative = 1e-2);
    }

    #[test]
    fn test_index_bounds() {
        assert!(matches!(cpl_shape(0.0), Err(FluxModelError::InvalidIndex { .. })));
        assert!(matches!(cpl_shape(0.5), Err(FluxModelError::InvalidIndex { .. })));
        assert!(matches!(cpl_shape(-2.5), Err(FluxModelError::InvalidIndex { .. })));
        assert_eq!(cpl_shape(-2.0).unwrap(), MIN_SHAPE);
        assert_relative_eq!(cpl_shape(-0.5).unwrap(), 1.5);
    }

    #[test]
    fn test_alpha_minus_two_is_usable() {
        let cpl = CutoffPowerLaw::new(1e-7, 100.0, -2.0, 10.0, 1000.0).unwrap();
        assert!(cpl.eval(50.0).is_finite());
        assert!(cpl.eval(50.0) > 0.0);
    }

    #[test]
    fn test_constant_model_ignores_time() {
        let area = EffectiveAreaCurve::flat(1.0, 10.0, 1000.0);
        let params = ConstantCplParams {
            peak_flux: 1e-7,
            ep: 200.0,
            alpha: -1.0,
        };
        let model = ConstantCpl::new(params, area, 10.0, 1000.0).unwrap();
        assert_eq!(
            model.differential_flux(100.0, -5.0),
            model.differential_flux(100.0, 50.0)
        );
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let area = EffectiveAreaCurve::flat(1.0, 10.0, 1000.0);
        let bad_flux = ConstantCplParams {
            peak_flux: -1.0,
            ep: 200.0,
            alpha: -1.0,
        };
        assert!(matches!(
            ConstantCpl::new(bad_flux, area.clone(), 10.0, 1000.0),
            Err(FluxModelError::NonPositive { name: "peak_flux", .. })
        ));

        let good = ConstantCplParams {
            peak_flux: 1.0,
            ep: 200.0,
            alpha: -1.0,
        };
        assert!(matches!(
            ConstantCpl::new(good, area, 1000.0, 10.0),
            Err(FluxModelError::EnergyRange { .. })
        ));
    }
}
