//! Common data types for the ditau toolkit

use serde::{Deserialize, Serialize};

/// Electron mass in GeV.
pub const ELECTRON_MASS: f64 = 0.511e-3;

/// Muon mass in GeV.
pub const MUON_MASS: f64 = 0.105;

/// A Lorentz four-vector stored in Cartesian components (px, py, pz, E).
///
/// Constructed from collider kinematics (pt, eta, phi, mass) and combined
/// by addition; invariant masses are taken from the summed vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FourVector {
    /// x momentum component (GeV).
    pub px: f64,
    /// y momentum component (GeV).
    pub py: f64,
    /// z momentum component (GeV).
    pub pz: f64,
    /// Energy (GeV).
    pub e: f64,
}

impl FourVector {
    /// Build a four-vector from transverse momentum, pseudorapidity,
    /// azimuthal angle and invariant mass.
    pub fn from_pt_eta_phi_m(pt: f64, eta: f64, phi: f64, mass: f64) -> Self {
        let px = pt * phi.cos();
        let py = pt * phi.sin();
        let pz = pt * eta.sinh();
        let e = (px * px + py * py + pz * pz + mass * mass).sqrt();
        Self { px, py, pz, e }
    }

    /// Transverse momentum.
    pub fn pt(&self) -> f64 {
        self.px.hypot(self.py)
    }

    /// Pseudorapidity. Zero for a vector with no transverse momentum.
    pub fn eta(&self) -> f64 {
        let pt = self.pt();
        if pt == 0.0 { 0.0 } else { (self.pz / pt).asinh() }
    }

    /// Azimuthal angle in (-pi, pi].
    pub fn phi(&self) -> f64 {
        self.py.atan2(self.px)
    }

    /// Magnitude of the spatial momentum.
    pub fn p(&self) -> f64 {
        (self.px * self.px + self.py * self.py + self.pz * self.pz).sqrt()
    }

    /// Invariant mass, clamped at zero for slightly spacelike sums from
    /// floating-point rounding.
    pub fn mass(&self) -> f64 {
        let m2 = self.e * self.e
            - (self.px * self.px + self.py * self.py + self.pz * self.pz);
        m2.max(0.0).sqrt()
    }

    /// Multiply all four components by `factor`.
    ///
    /// This is the energy-scale correction semantics: the invariant mass
    /// scales linearly along with the momentum.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            px: self.px * factor,
            py: self.py * factor,
            pz: self.pz * factor,
            e: self.e * factor,
        }
    }
}

impl std::ops::Add for FourVector {
    type Output = FourVector;

    fn add(self, rhs: FourVector) -> FourVector {
        FourVector {
            px: self.px + rhs.px,
            py: self.py + rhs.py,
            pz: self.pz + rhs.pz,
            e: self.e + rhs.e,
        }
    }
}

impl std::iter::Sum for FourVector {
    fn sum<I: Iterator<Item = FourVector>>(iter: I) -> FourVector {
        iter.fold(FourVector { px: 0.0, py: 0.0, pz: 0.0, e: 0.0 }, |a, b| a + b)
    }
}

/// Tau decay classification for one fitted leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TauDecayMode {
    /// Tau decaying to an electron (plus neutrinos).
    Electron,
    /// Tau decaying to a muon (plus neutrinos).
    Muon,
    /// Hadronic tau decay.
    Hadronic,
}

/// One measured tau-decay leg handed to an integrator.
///
/// Immutable per event; built fresh per fit call after any energy-scale
/// correction has been applied to the momentum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasuredLepton {
    /// Decay classification.
    pub decay: TauDecayMode,
    /// Transverse momentum (GeV), energy-scale corrected.
    pub pt: f64,
    /// Pseudorapidity.
    pub eta: f64,
    /// Azimuthal angle.
    pub phi: f64,
    /// Visible invariant mass (GeV).
    pub mass: f64,
}

impl MeasuredLepton {
    /// Construct a measured leg.
    pub fn new(decay: TauDecayMode, pt: f64, eta: f64, phi: f64, mass: f64) -> Self {
        Self { decay, pt, eta, phi, mass }
    }

    /// The visible four-vector of this leg.
    pub fn p4(&self) -> FourVector {
        FourVector::from_pt_eta_phi_m(self.pt, self.eta, self.phi, self.mass)
    }
}

/// Structured per-event identifier: run number, luminosity block, event
/// number. Used as the result-cache key.
///
/// Keying on the concatenated string `"{run}{event}{lumi}"` collides for
/// distinct events whose digits agree (run=1/evt=23/lumi=4 and
/// run=12/evt=3/lumi=4 both give "1234"). The tuple key cannot collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId {
    /// Data-taking run number.
    pub run: u32,
    /// Luminosity block within the run.
    pub lumi: u32,
    /// Event number within the luminosity block.
    pub event: u64,
}

impl EventId {
    /// Construct an identifier.
    pub fn new(run: u32, lumi: u32, event: u64) -> Self {
        Self { run, lumi, event }
    }

    /// The collision-prone concatenated tag found in older lookup files.
    /// Kept only to document the weakness; never used as a key.
    pub fn legacy_tag(&self) -> String {
        format!("{}{}{}", self.run, self.event, self.lumi)
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.run, self.lumi, self.event)
    }
}

/// Missing transverse energy as a 2-vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetVector {
    /// x component (GeV).
    pub px: f64,
    /// y component (GeV).
    pub py: f64,
}

impl MetVector {
    /// Build from magnitude and azimuthal angle.
    pub fn from_mag_phi(met: f64, phi: f64) -> Self {
        Self { px: met * phi.cos(), py: met * phi.sin() }
    }

    /// Magnitude.
    pub fn mag(&self) -> f64 {
        self.px.hypot(self.py)
    }
}

/// 2x2 covariance matrix of the missing-energy measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetCovariance {
    /// xx element (GeV^2).
    pub xx: f64,
    /// xy element (GeV^2).
    pub xy: f64,
    /// yx element (GeV^2).
    pub yx: f64,
    /// yy element (GeV^2).
    pub yy: f64,
}

impl MetCovariance {
    /// Build from the four stored elements.
    pub fn new(xx: f64, xy: f64, yx: f64, yy: f64) -> Self {
        Self { xx, xy, yx, yy }
    }

    /// Determinant.
    pub fn det(&self) -> f64 {
        self.xx * self.yy - self.xy * self.yx
    }
}

/// Outcome class for one event after a `fit` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitStatus {
    /// Not yet visited (event masked out, or fit not run).
    Pending,
    /// Numerically fitted this run with a valid solution.
    Fitted,
    /// Served from the result cache.
    Cached,
    /// Electron-muon pass-through: the input reference mass is definitive.
    PassThrough,
    /// The integrator reported an invalid solution; the stored value is
    /// whatever the algorithm returned and should not be trusted.
    Unreliable,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn four_vector_mass_round_trip() {
        let v = FourVector::from_pt_eta_phi_m(45.0, 0.3, 1.2, 1.777);
        assert_relative_eq!(v.pt(), 45.0, epsilon = 1e-9);
        assert_relative_eq!(v.eta(), 0.3, epsilon = 1e-9);
        assert_relative_eq!(v.phi(), 1.2, epsilon = 1e-9);
        assert_relative_eq!(v.mass(), 1.777, epsilon = 1e-9);
    }

    #[test]
    fn four_vector_pair_mass() {
        // Back-to-back massless legs of equal pt: m = 2*pt.
        let a = FourVector::from_pt_eta_phi_m(50.0, 0.0, 0.0, 0.0);
        let b = FourVector::from_pt_eta_phi_m(50.0, 0.0, std::f64::consts::PI, 0.0);
        assert_relative_eq!((a + b).mass(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn scaling_scales_mass_linearly() {
        let v = FourVector::from_pt_eta_phi_m(40.0, 0.5, -0.7, 0.8);
        let s = v.scaled(1.03);
        assert_relative_eq!(s.pt(), 40.0 * 1.03, epsilon = 1e-9);
        assert_relative_eq!(s.mass(), 0.8 * 1.03, epsilon = 1e-9);
    }

    #[test]
    fn legacy_tag_collides_but_event_id_does_not() {
        let a = EventId::new(1, 4, 23);
        let b = EventId::new(12, 4, 3);
        assert_eq!(a.legacy_tag(), b.legacy_tag());
        assert_ne!(a, b);
    }

    #[test]
    fn met_vector_from_polar() {
        let met = MetVector::from_mag_phi(40.0, 0.0);
        assert_relative_eq!(met.px, 40.0, epsilon = 1e-12);
        assert_relative_eq!(met.py, 0.0, epsilon = 1e-12);
        assert_relative_eq!(met.mag(), 40.0, epsilon = 1e-12);
    }
}
