//! Event-selection cuts.
//!
//! Each cut clears entries in the sample's selection mask; none of them
//! ever re-enables an event. Cutflow bookkeeping lives in
//! [`crate::Group`], which records a step after every cut it applies.

use dt_event::{LightPair, Sample, TauPair};

/// Tau-pair charge-product selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignSelection {
    /// Keep opposite-sign pairs (the signal region).
    OppositeSign,
    /// Keep same-sign pairs (a background control region).
    SameSign,
}

impl std::str::FromStr for SignSelection {
    type Err = dt_core::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "os" | "opposite-sign" => Ok(SignSelection::OppositeSign),
            "ss" | "same-sign" => Ok(SignSelection::SameSign),
            other => Err(dt_core::Error::Validation(format!(
                "unknown sign selection '{other}' (expected 'os' or 'ss')"
            ))),
        }
    }
}

/// Mask out tau pairs with the wrong charge product. Events with a zero
/// charge on either leg survive both selections.
pub fn sign_cut(sample: &mut Sample, sign: SignSelection) {
    for i in 0..sample.n_events() {
        let product = sample.table.charge_3[i] * sample.table.charge_4[i];
        let drop = match sign {
            SignSelection::OppositeSign => product > 0,
            SignSelection::SameSign => product < 0,
        };
        if drop {
            sample.mask[i] = false;
        }
    }
}

/// Veto events with any b-tagged jet (top-quark background suppression).
pub fn btag_cut(sample: &mut Sample) {
    for i in 0..sample.n_events() {
        if sample.table.n_btag[i] > 0 {
            sample.mask[i] = false;
        }
    }
}

/// Relative-isolation thresholds on the Z-candidate light leptons:
/// 0.15 for electron pairs, 0.2 for muon pairs.
pub fn lepton_isolation_cut(sample: &mut Sample) {
    for i in 0..sample.n_events() {
        let max_iso = match sample.channels[i].light {
            LightPair::ElEl => 0.15,
            LightPair::MuMu => 0.2,
        };
        if sample.table.iso_1[i] > max_iso || sample.table.iso_2[i] > max_iso {
            sample.mask[i] = false;
        }
    }
}

/// Tau-vs-jet identification working point on the hadronic legs.
///
/// The trailing leg is a hadronic tau in every channel except
/// electron-muon; the fully-hadronic channel requires both legs.
/// Electron-muon events pass unconditionally.
pub fn tau_id_cut(sample: &mut Sample, working_point: i32) {
    for i in 0..sample.n_events() {
        let pass = match sample.channels[i].taus {
            TauPair::ElectronMuon => true,
            TauPair::ElectronTau | TauPair::MuonTau => {
                sample.table.id_vs_jet_4[i] >= working_point
            }
            TauPair::TauTau => {
                sample.table.id_vs_jet_3[i] >= working_point
                    && sample.table.id_vs_jet_4[i] >= working_point
            }
        };
        if !pass {
            sample.mask[i] = false;
        }
    }
}

/// Generator-truth cleaning for simulation entering a data-driven
/// background estimate: jet-faked contributions are removed here so they
/// can be taken from data instead.
///
/// Match code 15 marks a light lepton descending from a prompt tau; codes
/// above 5 mark an unmatched or jet-faked tau candidate. The fully-
/// hadronic channel drops either faked leg; the semi-leptonic channels
/// drop a prompt-tau lepton on leg 3 or a faked tau on leg 4; the
/// electron-muon channel drops prompt-tau leptons on either leg.
pub fn gen_match_cut(sample: &mut Sample) {
    for i in 0..sample.n_events() {
        let (m3, m4) = (sample.table.gen_match_3[i], sample.table.gen_match_4[i]);
        let drop = match sample.channels[i].taus {
            TauPair::ElectronMuon => m3 == 15 || m4 == 15,
            TauPair::ElectronTau | TauPair::MuonTau => m3 == 15 || m4 > 5,
            TauPair::TauTau => m3 > 5 || m4 > 5,
        };
        if drop {
            sample.mask[i] = false;
        }
    }
}

/// Scalar-sum cut on the tau-pair transverse momenta, applied only to
/// the fully-hadronic channel.
pub fn lt_cut(sample: &mut Sample, threshold: f64) {
    for i in 0..sample.n_events() {
        if sample.channels[i].taus == TauPair::TauTau
            && sample.table.pt_3[i] + sample.table.pt_4[i] < threshold
        {
            sample.mask[i] = false;
        }
    }
}

/// Keep only events whose fitted di-tau mass falls inside `[low, high]`.
/// Must run after the fitter; an unfitted (NaN) mass fails the window.
pub fn mass_window_cut(sample: &mut Sample, low: f64, high: f64) {
    for i in 0..sample.n_events() {
        let m = sample.fitted_mass[i];
        if !(m >= low && m <= high) {
            sample.mask[i] = false;
        }
    }
}
