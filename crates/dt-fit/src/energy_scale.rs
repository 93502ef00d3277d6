//! Tau energy-scale correction table.

use dt_core::{EnergyScale, EnergyScaleShift};

/// Generator-truth match code for a genuine hadronic tau decay.
const GEN_MATCH_HADRONIC_TAU: i32 = 5;

/// Decay-mode-dependent tau energy-scale corrections.
///
/// Nominal multiplicative factors per reconstructed decay mode, with a
/// symmetric uncertainty used for the Up/Down shifted variants. Factors
/// apply only to genuine hadronic taus; any other generator match returns
/// unity.
#[derive(Debug, Clone)]
pub struct TauEnergyScale {
    /// (decay mode, nominal factor, absolute uncertainty).
    corrections: Vec<(i32, f64, f64)>,
}

impl Default for TauEnergyScale {
    fn default() -> Self {
        Self {
            corrections: vec![
                (0, 0.994, 0.008),
                (1, 0.995, 0.006),
                (10, 1.000, 0.007),
                (11, 0.999, 0.012),
            ],
        }
    }
}

impl TauEnergyScale {
    /// Build from an explicit correction table.
    pub fn new(corrections: Vec<(i32, f64, f64)>) -> Self {
        Self { corrections }
    }
}

impl EnergyScale for TauEnergyScale {
    fn factor(&self, _pt: f64, decay_mode: i32, gen_match: i32, shift: EnergyScaleShift) -> f64 {
        if gen_match != GEN_MATCH_HADRONIC_TAU {
            return 1.0;
        }
        let Some(&(_, nominal, unc)) =
            self.corrections.iter().find(|(dm, _, _)| *dm == decay_mode)
        else {
            return 1.0;
        };
        match shift {
            EnergyScaleShift::None => nominal,
            EnergyScaleShift::Up => nominal + unc,
            EnergyScaleShift::Down => nominal - unc,
        }
    }
}
