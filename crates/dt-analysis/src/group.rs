//! Per-category histogram accumulation over one or more samples.

use crate::cuts::{self, SignSelection};
use crate::histogram::Histogram;
use crate::scale_factor::ScaleFactor;
use dt_core::Result;
use dt_event::{Sample, TauPair};
use dt_fit::{FitSummary, MassFitter};
use serde::Serialize;
use std::collections::BTreeMap;

/// The eight analysis categories, in category-code order.
const CATEGORY_LABELS: [&str; 8] =
    ["eeet", "eemt", "eett", "eeem", "mmet", "mmmt", "mmtt", "mmem"];

/// Cutflow step positions (bin centers in the 20-bin cutflow axis).
const STEP_INITIAL: f64 = 0.5;
const STEP_SIGN: f64 = 1.5;
const STEP_BTAG: f64 = 2.5;
const STEP_LEPTON: f64 = 3.5;
const STEP_TAU_ID: f64 = 4.5;
const STEP_GEN_MATCH: f64 = 5.5;
const STEP_LT: f64 = 6.5;
const STEP_MASS_WINDOW: f64 = 7.5;

/// Pipeline knobs for [`Group::process`].
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Tau-pair charge selection.
    pub sign: SignSelection,
    /// Apply the sign, b-tag, isolation and tau-identification cuts.
    pub tight_cuts: bool,
    /// Tau-vs-jet identification working point.
    pub tau_id_working_point: i32,
    /// Remove jet-faked and prompt-tau-lepton contributions from
    /// simulation, for use with a data-driven background estimate.
    pub data_driven: bool,
    /// Multiply anti-lepton identification scale factors into the weights.
    pub apply_scale_factors: bool,
    /// Scalar-sum threshold for the fully-hadronic channel (GeV).
    pub lt_threshold: f64,
    /// Fitted-mass acceptance window (GeV).
    pub mass_window: (f64, f64),
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            sign: SignSelection::OppositeSign,
            tight_cuts: true,
            tau_id_working_point: 15,
            data_driven: true,
            apply_scale_factors: true,
            lt_threshold: 0.0,
            mass_window: (90.0, 180.0),
        }
    }
}

/// Per-category histograms filled by the pipeline, serialized as the
/// analysis output.
#[derive(Debug, Clone, Serialize)]
pub struct HistogramSet {
    /// Fitted di-tau mass.
    pub fitted_mass: BTreeMap<String, Histogram>,
    /// Raw four-body mass from uncorrected vectors.
    pub four_body_mass: BTreeMap<String, Histogram>,
    /// Light pair + fitted tau pair system mass.
    pub system_mass: BTreeMap<String, Histogram>,
    /// System mass under the resonance constraint.
    pub system_mass_constrained: BTreeMap<String, Histogram>,
    /// Scalar sum of the tau-pair transverse momenta.
    pub lt: BTreeMap<String, Histogram>,
    /// Weighted event counts after each selection step.
    pub cutflow: BTreeMap<String, Histogram>,
}

impl HistogramSet {
    fn new() -> Self {
        fn per_category(n_bins: usize, low: f64, high: f64) -> BTreeMap<String, Histogram> {
            CATEGORY_LABELS
                .iter()
                .map(|&label| (label.to_string(), Histogram::new(n_bins, low, high)))
                .collect()
        }
        Self {
            fitted_mass: per_category(10, 0.0, 200.0),
            four_body_mass: per_category(50, 0.0, 500.0),
            system_mass: per_category(50, 0.0, 500.0),
            system_mass_constrained: per_category(50, 0.0, 500.0),
            lt: per_category(10, 0.0, 200.0),
            cutflow: per_category(20, 0.0, 20.0),
        }
    }
}

/// A group of samples sharing one set of category histograms and one set
/// of identification scale-factor tables.
pub struct Group {
    anti_jet: Box<dyn ScaleFactor>,
    anti_ele: Box<dyn ScaleFactor>,
    anti_mu: Box<dyn ScaleFactor>,
    /// Accumulated histograms.
    pub hists: HistogramSet,
}

impl Group {
    /// Build a group around the three anti-lepton scale-factor tables.
    pub fn new(
        anti_jet: Box<dyn ScaleFactor>,
        anti_ele: Box<dyn ScaleFactor>,
        anti_mu: Box<dyn ScaleFactor>,
    ) -> Self {
        Self { anti_jet, anti_ele, anti_mu, hists: HistogramSet::new() }
    }

    /// Record the weighted count of currently selected events at cutflow
    /// position `step`, per category.
    fn fill_cutflow(&mut self, sample: &Sample, step: f64) {
        for i in sample.selected_indices() {
            let label = sample.channels[i].to_string();
            if let Some(hist) = self.hists.cutflow.get_mut(&label) {
                hist.fill(step, sample.weights[i]);
            }
        }
    }

    /// Multiply anti-lepton identification factors into the weights of
    /// selected events, keyed by the generator-truth match codes.
    ///
    /// Codes 1 and 3 are prompt and tau-decay electrons, 2 and 4 the muon
    /// counterparts; code 5 is a true hadronic tau. The fully-hadronic
    /// channel additionally takes the jet-discrimination factor on both
    /// legs.
    fn apply_scale_factors(&self, sample: &mut Sample) {
        for i in sample.selected_indices().collect::<Vec<_>>() {
            let (m3, m4) = (sample.table.gen_match_3[i], sample.table.gen_match_4[i]);
            match sample.channels[i].taus {
                TauPair::ElectronTau | TauPair::MuonTau => {
                    if m4 == 1 || m4 == 3 {
                        sample.weights[i] *= self.anti_ele.vs_eta(sample.table.eta_4[i], m4);
                    }
                    if m4 == 2 || m4 == 4 {
                        sample.weights[i] *= self.anti_mu.vs_eta(sample.table.eta_4[i], m4);
                    }
                }
                TauPair::TauTau => {
                    sample.weights[i] *= self.anti_jet.vs_pt(sample.table.pt_3[i], m3);
                    sample.weights[i] *= self.anti_jet.vs_pt(sample.table.pt_4[i], m4);
                    if m3 == 1 || m3 == 3 {
                        sample.weights[i] *= self.anti_ele.vs_eta(sample.table.eta_3[i], m3);
                    }
                    if m3 == 2 || m3 == 4 {
                        sample.weights[i] *= self.anti_mu.vs_eta(sample.table.eta_3[i], m3);
                    }
                    if m4 == 1 || m4 == 3 {
                        sample.weights[i] *= self.anti_ele.vs_eta(sample.table.eta_4[i], m4);
                    }
                    if m4 == 2 || m4 == 4 {
                        sample.weights[i] *= self.anti_mu.vs_eta(sample.table.eta_4[i], m4);
                    }
                }
                TauPair::ElectronMuon => {}
            }
        }
    }

    /// Fill the mass and LT histograms from the surviving events.
    fn fill_hists(&mut self, sample: &Sample) {
        for i in sample.selected_indices() {
            let label = sample.channels[i].to_string();
            let w = sample.weights[i];
            if let Some(hist) = self.hists.fitted_mass.get_mut(&label) {
                hist.fill(sample.fitted_mass[i], w);
            }
            if let Some(hist) = self.hists.four_body_mass.get_mut(&label) {
                hist.fill(sample.four_body_mass[i], w);
            }
            if let Some(hist) = self.hists.system_mass.get_mut(&label) {
                hist.fill(sample.system_mass[i], w);
            }
            if let Some(hist) = self.hists.system_mass_constrained.get_mut(&label) {
                hist.fill(sample.system_mass_constrained[i], w);
            }
            if let Some(hist) = self.hists.lt.get_mut(&label) {
                hist.fill(sample.table.pt_3[i] + sample.table.pt_4[i], w);
            }
        }
    }

    /// Run the full pipeline over one sample: weight chain, selection
    /// cuts, mass fit, mass window, histogram fills.
    pub fn process(
        &mut self,
        sample: &mut Sample,
        fitter: &MassFitter,
        config: &ProcessConfig,
    ) -> Result<FitSummary> {
        tracing::info!(sample = %sample.name, n_events = sample.n_events(), "processing sample");

        for i in 0..sample.n_events() {
            sample.weights[i] = sample.sample_weight
                * sample.table.pileup_weight[i]
                * sample.table.generator_weight[i];
        }
        self.fill_cutflow(sample, STEP_INITIAL);

        if config.tight_cuts {
            cuts::sign_cut(sample, config.sign);
            self.fill_cutflow(sample, STEP_SIGN);
            cuts::btag_cut(sample);
            self.fill_cutflow(sample, STEP_BTAG);
            cuts::lepton_isolation_cut(sample);
            self.fill_cutflow(sample, STEP_LEPTON);
            cuts::tau_id_cut(sample, config.tau_id_working_point);
            self.fill_cutflow(sample, STEP_TAU_ID);
        }
        if config.data_driven {
            cuts::gen_match_cut(sample);
            self.fill_cutflow(sample, STEP_GEN_MATCH);
            if config.apply_scale_factors {
                self.apply_scale_factors(sample);
            }
        }
        cuts::lt_cut(sample, config.lt_threshold);
        self.fill_cutflow(sample, STEP_LT);

        let summary = fitter.fit(sample)?;

        let (low, high) = config.mass_window;
        cuts::mass_window_cut(sample, low, high);
        self.fill_cutflow(sample, STEP_MASS_WINDOW);
        self.fill_hists(sample);

        tracing::info!(
            sample = %sample.name,
            n_selected = sample.n_selected(),
            n_fitted = summary.n_fitted,
            "sample processed"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale_factor::FlatScaleFactor;
    use dt_event::EventTable;
    use dt_fit::{FitAlgorithm, FitterConfig};

    fn table(n: usize, category: u8) -> EventTable {
        EventTable {
            run: vec![1; n],
            lumi: vec![1; n],
            event: (0..n as u64).collect(),
            category: vec![category; n],
            met: vec![40.0; n],
            met_phi: vec![0.0; n],
            met_cov_xx: vec![400.0; n],
            met_cov_xy: vec![0.0; n],
            met_cov_yx: vec![0.0; n],
            met_cov_yy: vec![400.0; n],
            pt_1: vec![30.0; n],
            eta_1: vec![0.1; n],
            phi_1: vec![0.4; n],
            pt_2: vec![25.0; n],
            eta_2: vec![-0.2; n],
            phi_2: vec![2.8; n],
            iso_1: vec![0.05; n],
            iso_2: vec![0.04; n],
            pt_3: vec![45.0; n],
            eta_3: vec![0.0; n],
            phi_3: vec![0.0; n],
            m_3: vec![0.8; n],
            pt_4: vec![40.0; n],
            eta_4: vec![0.3; n],
            phi_4: vec![1.0; n],
            m_4: vec![0.8; n],
            decay_mode_3: vec![0; n],
            decay_mode_4: vec![0; n],
            gen_match_3: vec![5; n],
            gen_match_4: vec![5; n],
            charge_3: vec![1; n],
            charge_4: vec![-1; n],
            id_vs_jet_3: vec![31; n],
            id_vs_jet_4: vec![31; n],
            n_btag: vec![0; n],
            pileup_weight: vec![1.0; n],
            generator_weight: vec![1.0; n],
            ref_mass: vec![95.0; n],
        }
    }

    fn flat_group(factor: f64) -> Group {
        Group::new(
            Box::new(FlatScaleFactor(factor)),
            Box::new(FlatScaleFactor(factor)),
            Box::new(FlatScaleFactor(factor)),
        )
    }

    #[test]
    fn cutflow_steps_are_monotonically_non_increasing() {
        let mut t = table(4, 3);
        t.charge_4[0] = 1; // fails the sign cut
        t.n_btag[1] = 2; // fails the b-tag veto
        let mut sample = Sample::new("zh125", 0.88, 1.0, t).unwrap();
        let mut group = flat_group(1.0);
        let fitter =
            MassFitter::with_default_engine(FitterConfig::new(FitAlgorithm::LikelihoodScan));
        group.process(&mut sample, &fitter, &ProcessConfig::default()).unwrap();

        let counts = group.hists.cutflow["eett"].counts().to_vec();
        assert_eq!(counts[0], 4.0);
        assert_eq!(counts[1], 3.0);
        assert_eq!(counts[2], 2.0);
        for pair in counts.windows(2).take(7) {
            assert!(pair[1] <= pair[0]);
        }
    }

    #[test]
    fn data_driven_cleaning_removes_faked_taus_from_the_cutflow() {
        let mut t = table(3, 3);
        t.gen_match_4[2] = 6; // jet-faked trailing leg
        let mut sample = Sample::new("dy", 5.0, 1.0, t).unwrap();
        let mut group = flat_group(1.0);
        let fitter =
            MassFitter::with_default_engine(FitterConfig::new(FitAlgorithm::LikelihoodScan));
        group.process(&mut sample, &fitter, &ProcessConfig::default()).unwrap();

        let counts = group.hists.cutflow["eett"].counts();
        assert_eq!(counts[4], 3.0); // tau-ID step, faked leg still present
        assert_eq!(counts[5], 2.0); // gen-match cleaning removes it

        // Disabling the cleaning keeps all three events through that step.
        let mut sample = {
            let mut t = table(3, 3);
            t.gen_match_4[2] = 6;
            Sample::new("dy", 5.0, 1.0, t).unwrap()
        };
        let mut group = flat_group(1.0);
        let config = ProcessConfig { data_driven: false, ..ProcessConfig::default() };
        group.process(&mut sample, &fitter, &config).unwrap();
        assert_eq!(group.hists.cutflow["eett"].counts()[5], 0.0);
        assert_eq!(group.hists.cutflow["eett"].counts()[6], 3.0);
    }

    #[test]
    fn pass_through_events_land_in_fitted_mass_histogram() {
        // em events carry the reference mass (95 GeV), inside the window.
        let mut sample = Sample::new("zh125", 0.88, 1.0, table(3, 4)).unwrap();
        let mut group = flat_group(1.0);
        let fitter =
            MassFitter::with_default_engine(FitterConfig::new(FitAlgorithm::LikelihoodScan));
        let summary = group.process(&mut sample, &fitter, &ProcessConfig::default()).unwrap();

        assert_eq!(summary.n_pass_through, 3);
        let hist = &group.hists.fitted_mass["eeem"];
        assert_eq!(hist.integral(), 3.0);
        assert_eq!(hist.counts()[4], 3.0); // 95 GeV bin
    }

    #[test]
    fn mass_window_empties_out_of_range_fits() {
        // The 85 GeV tau pair scans to well under 90 GeV, so nothing in
        // the fully-hadronic channel survives the default window.
        let mut sample = Sample::new("zh125", 0.88, 1.0, table(2, 3)).unwrap();
        let mut group = flat_group(1.0);
        let fitter =
            MassFitter::with_default_engine(FitterConfig::new(FitAlgorithm::LikelihoodScan));
        group.process(&mut sample, &fitter, &ProcessConfig::default()).unwrap();

        assert_eq!(sample.n_selected(), 0);
        assert_eq!(group.hists.fitted_mass["eett"].integral(), 0.0);
        // The events still appear in the pre-window cutflow steps.
        assert_eq!(group.hists.cutflow["eett"].counts()[6], 2.0);
        assert_eq!(group.hists.cutflow["eett"].counts()[7], 0.0);
    }

    #[test]
    fn scale_factors_multiply_weights_per_leg() {
        let mut sample = Sample::new("zh125", 0.88, 1.0, table(1, 3)).unwrap();
        let group = flat_group(2.0);
        // Both legs are true hadronic taus: two anti-jet factors apply.
        group.apply_scale_factors(&mut sample);
        assert_eq!(sample.weights[0], 4.0);

        // A tau-decay electron on the trailing leg of an et event takes
        // one anti-electron factor.
        let mut t = table(1, 1);
        t.gen_match_4[0] = 3;
        let mut sample = Sample::new("zh125", 0.88, 1.0, t).unwrap();
        group.apply_scale_factors(&mut sample);
        assert_eq!(sample.weights[0], 2.0);

        // em events take no factors at all.
        let mut sample = Sample::new("zh125", 0.88, 1.0, table(1, 4)).unwrap();
        group.apply_scale_factors(&mut sample);
        assert_eq!(sample.weights[0], 1.0);
    }

    #[test]
    fn weight_chain_includes_sample_and_event_weights() {
        let mut t = table(1, 4);
        t.pileup_weight[0] = 0.9;
        t.generator_weight[0] = 1.1;
        let mut sample = Sample::new("zh125", 0.88, 2.0, t).unwrap();
        let mut group = flat_group(1.0);
        let fitter =
            MassFitter::with_default_engine(FitterConfig::new(FitAlgorithm::LikelihoodScan));
        group.process(&mut sample, &fitter, &ProcessConfig::default()).unwrap();
        approx::assert_relative_eq!(sample.weights[0], 2.0 * 0.9 * 1.1);
    }
}
