//! Core traits for the ditau toolkit
//!
//! The mass fitter does not depend on a concrete numerical engine or on a
//! concrete correction table; both arrive through the traits defined here,
//! injected at construction.

use crate::types::{FourVector, MeasuredLepton, MetCovariance, MetVector};
use crate::Result;

/// Result of one di-tau integration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegrationOutcome {
    /// Best-estimate four-vector of the tau pair.
    pub p4: FourVector,
    /// Whether the engine considers the solution reliable. Callers decide
    /// how to treat unreliable solutions; the flag is part of the
    /// contract, not a hint.
    pub valid: bool,
    /// Number of likelihood evaluations spent.
    pub n_evaluations: usize,
}

/// A numerical engine that estimates the di-tau four-vector from the two
/// measured legs and the missing-energy measurement.
///
/// `constraint` fixes the di-tau invariant mass to the given value during
/// the integration (the resonance-mass constraint). Engines without a
/// constrained variant must reject `Some(_)` with a validation error.
pub trait DiTauIntegrator: Send + Sync {
    /// Integrate the likelihood and return the fitted tau-pair four-vector.
    fn integrate(
        &self,
        legs: &[MeasuredLepton; 2],
        met: MetVector,
        cov: MetCovariance,
        constraint: Option<f64>,
    ) -> Result<IntegrationOutcome>;

    /// Engine name for logs and summaries.
    fn name(&self) -> &str;
}

/// Direction of a systematic energy-scale shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnergyScaleShift {
    /// Nominal correction, no shift.
    #[default]
    None,
    /// Shift up by the correction uncertainty.
    Up,
    /// Shift down by the correction uncertainty.
    Down,
}

impl std::str::FromStr for EnergyScaleShift {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(crate::Error::Validation(format!(
                "invalid energy-scale shift '{other}' (expected 'None', 'Up' or 'Down')"
            ))),
        }
    }
}

/// Opaque energy-scale correction service.
///
/// Returns a multiplicative factor applied to a tau leg's momentum before
/// the fit. The fitter treats this as a capability, not an owned resource.
pub trait EnergyScale: Send + Sync {
    /// Correction factor for a leg with the given transverse momentum,
    /// reconstructed decay-mode code and generator-truth match code.
    fn factor(&self, pt: f64, decay_mode: i32, gen_match: i32, shift: EnergyScaleShift) -> f64;
}
