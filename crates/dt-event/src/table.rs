//! Fixed-schema columnar event storage.
//!
//! The input ntuple branches live here as named columns (Structure of
//! Arrays). The schema is closed: every branch the fitter or the selection
//! cascade reads has its own field, so there is no positional pairing of
//! anonymous arrays to get wrong.

use dt_core::{Error, EventId, MetCovariance, MetVector, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-sample table of measured observables, consumed read-only.
///
/// Legs 1 and 2 are the light (Z-candidate) lepton pair; legs 3 and 4 are
/// the tau-candidate pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventTable {
    /// Run number per event.
    pub run: Vec<u32>,
    /// Luminosity block per event.
    pub lumi: Vec<u32>,
    /// Event number per event.
    pub event: Vec<u64>,
    /// Channel category code (1..=8).
    pub category: Vec<u8>,

    /// Missing transverse energy magnitude (GeV).
    pub met: Vec<f64>,
    /// Missing transverse energy azimuthal angle.
    pub met_phi: Vec<f64>,
    /// MET covariance xx element (GeV^2).
    pub met_cov_xx: Vec<f64>,
    /// MET covariance xy element (GeV^2).
    pub met_cov_xy: Vec<f64>,
    /// MET covariance yx element (GeV^2).
    pub met_cov_yx: Vec<f64>,
    /// MET covariance yy element (GeV^2).
    pub met_cov_yy: Vec<f64>,

    /// Leading light lepton pt (GeV).
    pub pt_1: Vec<f64>,
    /// Leading light lepton eta.
    pub eta_1: Vec<f64>,
    /// Leading light lepton phi.
    pub phi_1: Vec<f64>,
    /// Trailing light lepton pt (GeV).
    pub pt_2: Vec<f64>,
    /// Trailing light lepton eta.
    pub eta_2: Vec<f64>,
    /// Trailing light lepton phi.
    pub phi_2: Vec<f64>,
    /// Leading light lepton relative isolation.
    pub iso_1: Vec<f64>,
    /// Trailing light lepton relative isolation.
    pub iso_2: Vec<f64>,

    /// Tau-pair leading leg pt (GeV).
    pub pt_3: Vec<f64>,
    /// Tau-pair leading leg eta.
    pub eta_3: Vec<f64>,
    /// Tau-pair leading leg phi.
    pub phi_3: Vec<f64>,
    /// Tau-pair leading leg visible mass (GeV).
    pub m_3: Vec<f64>,
    /// Tau-pair trailing leg pt (GeV).
    pub pt_4: Vec<f64>,
    /// Tau-pair trailing leg eta.
    pub eta_4: Vec<f64>,
    /// Tau-pair trailing leg phi.
    pub phi_4: Vec<f64>,
    /// Tau-pair trailing leg visible mass (GeV).
    pub m_4: Vec<f64>,

    /// Reconstructed decay-mode code, leading tau leg.
    pub decay_mode_3: Vec<i32>,
    /// Reconstructed decay-mode code, trailing tau leg.
    pub decay_mode_4: Vec<i32>,
    /// Generator-truth match code, leading tau leg (5 = true hadronic tau).
    pub gen_match_3: Vec<i32>,
    /// Generator-truth match code, trailing tau leg.
    pub gen_match_4: Vec<i32>,
    /// Electric charge, leading tau leg.
    pub charge_3: Vec<i32>,
    /// Electric charge, trailing tau leg.
    pub charge_4: Vec<i32>,
    /// Tau-vs-jet identification working point, leading tau leg.
    pub id_vs_jet_3: Vec<i32>,
    /// Tau-vs-jet identification working point, trailing tau leg.
    pub id_vs_jet_4: Vec<i32>,

    /// Number of b-tagged jets per event.
    pub n_btag: Vec<u32>,

    /// True-pileup reweighting factor per event.
    pub pileup_weight: Vec<f64>,
    /// Generator-level event weight.
    pub generator_weight: Vec<f64>,

    /// Previously reconstructed di-tau mass carried in the input table.
    /// Definitive for the electron-muon channel, where both legs are
    /// unambiguously reconstructed.
    pub ref_mass: Vec<f64>,
}

macro_rules! check_columns {
    ($table:expr, $n:expr, $( $field:ident ),+ $(,)?) => {
        $(
            if $table.$field.len() != $n {
                return Err(Error::Validation(format!(
                    "column length mismatch for '{}': expected {}, got {}",
                    stringify!($field), $n, $table.$field.len()
                )));
            }
        )+
    };
}

macro_rules! check_finite {
    ($table:expr, $( $field:ident ),+ $(,)?) => {
        $(
            if $table.$field.iter().any(|x| !x.is_finite()) {
                return Err(Error::Validation(format!(
                    "column '{}' contains non-finite values",
                    stringify!($field)
                )));
            }
        )+
    };
}

impl EventTable {
    /// Number of events.
    pub fn n_events(&self) -> usize {
        self.run.len()
    }

    /// Validate column lengths and float finiteness.
    ///
    /// Called by [`crate::Sample::new`]; call it directly when a table is
    /// assembled by hand.
    pub fn validate(&self) -> Result<()> {
        let n = self.n_events();
        check_columns!(
            self, n, lumi, event, category, met, met_phi, met_cov_xx, met_cov_xy, met_cov_yx,
            met_cov_yy, pt_1, eta_1, phi_1, pt_2, eta_2, phi_2, iso_1, iso_2, pt_3, eta_3, phi_3,
            m_3, pt_4, eta_4, phi_4, m_4, decay_mode_3, decay_mode_4, gen_match_3, gen_match_4,
            charge_3, charge_4, id_vs_jet_3, id_vs_jet_4, n_btag, pileup_weight,
            generator_weight, ref_mass,
        );
        check_finite!(
            self, met, met_phi, met_cov_xx, met_cov_xy, met_cov_yx, met_cov_yy, pt_1, eta_1,
            phi_1, pt_2, eta_2, phi_2, iso_1, iso_2, pt_3, eta_3, phi_3, m_3, pt_4, eta_4, phi_4,
            m_4, pileup_weight, generator_weight, ref_mass,
        );
        Ok(())
    }

    /// Load and validate a table from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let table: EventTable = serde_json::from_reader(std::io::BufReader::new(file))?;
        table.validate()?;
        Ok(table)
    }

    /// Identifier of event `i`.
    pub fn event_id(&self, i: usize) -> EventId {
        EventId::new(self.run[i], self.lumi[i], self.event[i])
    }

    /// Missing-energy 2-vector of event `i`.
    pub fn met_vector(&self, i: usize) -> MetVector {
        MetVector::from_mag_phi(self.met[i], self.met_phi[i])
    }

    /// Missing-energy covariance of event `i`.
    pub fn met_covariance(&self, i: usize) -> MetCovariance {
        MetCovariance::new(
            self.met_cov_xx[i],
            self.met_cov_xy[i],
            self.met_cov_yx[i],
            self.met_cov_yy[i],
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn one_event_table() -> EventTable {
        EventTable {
            run: vec![305054],
            lumi: vec![12],
            event: vec![77001],
            category: vec![3],
            met: vec![40.0],
            met_phi: vec![0.0],
            met_cov_xx: vec![400.0],
            met_cov_xy: vec![0.0],
            met_cov_yx: vec![0.0],
            met_cov_yy: vec![400.0],
            pt_1: vec![30.0],
            eta_1: vec![0.1],
            phi_1: vec![0.4],
            pt_2: vec![25.0],
            eta_2: vec![-0.2],
            phi_2: vec![2.8],
            iso_1: vec![0.05],
            iso_2: vec![0.04],
            pt_3: vec![45.0],
            eta_3: vec![0.0],
            phi_3: vec![0.0],
            m_3: vec![0.8],
            pt_4: vec![40.0],
            eta_4: vec![0.3],
            phi_4: vec![1.0],
            m_4: vec![0.8],
            decay_mode_3: vec![0],
            decay_mode_4: vec![0],
            gen_match_3: vec![5],
            gen_match_4: vec![5],
            charge_3: vec![1],
            charge_4: vec![-1],
            id_vs_jet_3: vec![31],
            id_vs_jet_4: vec![31],
            n_btag: vec![0],
            pileup_weight: vec![1.0],
            generator_weight: vec![1.0],
            ref_mass: vec![95.0],
        }
    }

    #[test]
    fn valid_table_passes() {
        one_event_table().validate().unwrap();
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let mut table = one_event_table();
        table.pt_4.push(12.0);
        let err = table.validate().unwrap_err();
        assert!(err.to_string().contains("pt_4"), "unexpected error: {err}");
    }

    #[test]
    fn non_finite_column_is_rejected() {
        let mut table = one_event_table();
        table.met[0] = f64::NAN;
        assert!(table.validate().is_err());
    }

    #[test]
    fn accessors() {
        let table = one_event_table();
        assert_eq!(table.event_id(0), EventId::new(305054, 12, 77001));
        let met = table.met_vector(0);
        assert!((met.px - 40.0).abs() < 1e-12);
        assert_eq!(table.met_covariance(0).det(), 160_000.0);
    }
}
