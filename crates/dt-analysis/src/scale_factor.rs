//! Identification scale-factor lookups.
//!
//! Scale factors are data/simulation correction multipliers applied to
//! event weights after the tau-identification cuts. The pipeline treats
//! them as opaque lookup capabilities.

/// A correction-factor table queried by kinematics and generator match.
pub trait ScaleFactor: Send + Sync {
    /// Factor as a function of transverse momentum.
    fn vs_pt(&self, pt: f64, gen_match: i32) -> f64;

    /// Factor as a function of pseudorapidity.
    fn vs_eta(&self, eta: f64, gen_match: i32) -> f64;
}

/// A flat scale factor, mostly useful for tests and MC-only studies.
#[derive(Debug, Clone, Copy)]
pub struct FlatScaleFactor(pub f64);

impl ScaleFactor for FlatScaleFactor {
    fn vs_pt(&self, _pt: f64, _gen_match: i32) -> f64 {
        self.0
    }

    fn vs_eta(&self, _eta: f64, _gen_match: i32) -> f64 {
        self.0
    }
}
