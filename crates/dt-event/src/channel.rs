//! Decay-channel classification from per-event category codes.

use dt_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// The light lepton pair from the Z-candidate leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightPair {
    /// Electron pair.
    ElEl,
    /// Muon pair.
    MuMu,
}

/// The reconstructed tau-pair decay label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TauPair {
    /// Electron + hadronic tau.
    ElectronTau,
    /// Muon + hadronic tau.
    MuonTau,
    /// Both legs hadronic.
    TauTau,
    /// Electron + muon: both legs fully reconstructed, no missing-energy
    /// ambiguity.
    ElectronMuon,
}

impl TauPair {
    /// Whether at least one leg is a hadronic tau decay.
    pub fn has_hadronic_leg(&self) -> bool {
        !matches!(self, TauPair::ElectronMuon)
    }
}

/// Full channel label for one event: light pair plus tau pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Light lepton pair.
    pub light: LightPair,
    /// Tau decay pair.
    pub taus: TauPair,
}

impl Channel {
    /// Parse the per-event category code (1..=8) stored in the input table.
    ///
    /// Anything outside the eight recognized codes is a data error: no
    /// masked output is computable for such an event.
    pub fn from_category(code: u8) -> Result<Self> {
        let (light, taus) = match code {
            1 => (LightPair::ElEl, TauPair::ElectronTau),
            2 => (LightPair::ElEl, TauPair::MuonTau),
            3 => (LightPair::ElEl, TauPair::TauTau),
            4 => (LightPair::ElEl, TauPair::ElectronMuon),
            5 => (LightPair::MuMu, TauPair::ElectronTau),
            6 => (LightPair::MuMu, TauPair::MuonTau),
            7 => (LightPair::MuMu, TauPair::TauTau),
            8 => (LightPair::MuMu, TauPair::ElectronMuon),
            other => {
                return Err(Error::Validation(format!(
                    "unrecognized event category code {other} (expected 1..=8)"
                )))
            }
        };
        Ok(Self { light, taus })
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ll = match self.light {
            LightPair::ElEl => "ee",
            LightPair::MuMu => "mm",
        };
        let tt = match self.taus {
            TauPair::ElectronTau => "et",
            TauPair::MuonTau => "mt",
            TauPair::TauTau => "tt",
            TauPair::ElectronMuon => "em",
        };
        write!(f, "{ll}{tt}")
    }
}
