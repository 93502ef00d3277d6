//! Transverse missing-energy likelihood shared by both integrators.
//!
//! The unknowns are the visible-energy fractions (x1, x2) of the two tau
//! legs. In the collinear approximation the full tau four-vector is the
//! visible vector scaled by 1/x, so the predicted neutrino system is the
//! difference between the scaled and the visible legs. The likelihood is
//! the Gaussian residual of that prediction against the measured MET under
//! the event's 2x2 covariance.

use dt_core::{Error, FourVector, MeasuredLepton, MetCovariance, MetVector, Result};
use nalgebra::{Matrix2, Vector2};

/// Lower clamp for the energy fractions: x -> 0 sends the tau momentum to
/// infinity.
pub(crate) const X_MIN: f64 = 0.01;

pub(crate) struct TransverseLikelihood {
    vis1: FourVector,
    vis2: FourVector,
    met: Vector2<f64>,
    inv_cov: Matrix2<f64>,
    /// Strength of the log-mass regularization term; zero disables it.
    kappa: f64,
}

impl TransverseLikelihood {
    pub(crate) fn new(
        legs: &[MeasuredLepton; 2],
        met: MetVector,
        cov: MetCovariance,
        kappa: f64,
    ) -> Result<Self> {
        let m = Matrix2::new(cov.xx, cov.xy, cov.yx, cov.yy);
        let inv_cov = m.try_inverse().ok_or_else(|| {
            Error::Computation(format!(
                "singular MET covariance (det = {}), cannot form likelihood",
                cov.det()
            ))
        })?;
        Ok(Self {
            vis1: legs[0].p4(),
            vis2: legs[1].p4(),
            met: Vector2::new(met.px, met.py),
            inv_cov,
            kappa,
        })
    }

    /// Tau-pair four-vector estimate at the given fractions.
    pub(crate) fn tau_pair_p4(&self, x1: f64, x2: f64) -> FourVector {
        self.vis1.scaled(1.0 / x1) + self.vis2.scaled(1.0 / x2)
    }

    /// Visible di-tau mass (x1 = x2 = 1).
    pub(crate) fn visible_mass(&self) -> f64 {
        (self.vis1 + self.vis2).mass()
    }

    /// Negative log-likelihood at (x1, x2).
    pub(crate) fn nll(&self, x1: f64, x2: f64) -> f64 {
        let nu_px = self.vis1.px * (1.0 / x1 - 1.0) + self.vis2.px * (1.0 / x2 - 1.0);
        let nu_py = self.vis1.py * (1.0 / x1 - 1.0) + self.vis2.py * (1.0 / x2 - 1.0);
        let r = self.met - Vector2::new(nu_px, nu_py);
        let chi2 = (r.transpose() * self.inv_cov * r)[(0, 0)];
        let mut nll = 0.5 * chi2;
        if self.kappa != 0.0 {
            let m = self.tau_pair_p4(x1, x2).mass();
            if m > 0.0 {
                nll += self.kappa * m.ln();
            }
        }
        nll
    }
}
