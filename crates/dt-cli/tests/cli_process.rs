// The sample literal below has enough keys to outgrow the default
// `json!` expansion depth.
#![recursion_limit = "256"]

use std::path::PathBuf;
use std::process::{Command, Output};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_ditau"))
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

fn write_em_sample(dir: &std::path::Path, n: usize) -> PathBuf {
    let sample = serde_json::json!({
        "name": "zh125",
        "cross_section": 0.88,
        "sample_weight": 1.0,
        "table": {
            "run": vec![305054u32; n],
            "lumi": vec![12u32; n],
            "event": (0..n as u64).collect::<Vec<_>>(),
            "category": vec![4u8; n], // eeem
            "met": vec![40.0; n],
            "met_phi": vec![0.0; n],
            "met_cov_xx": vec![400.0; n],
            "met_cov_xy": vec![0.0; n],
            "met_cov_yx": vec![0.0; n],
            "met_cov_yy": vec![400.0; n],
            "pt_1": vec![30.0; n],
            "eta_1": vec![0.1; n],
            "phi_1": vec![0.4; n],
            "pt_2": vec![25.0; n],
            "eta_2": vec![-0.2; n],
            "phi_2": vec![2.8; n],
            "iso_1": vec![0.05; n],
            "iso_2": vec![0.04; n],
            "pt_3": vec![45.0; n],
            "eta_3": vec![0.0; n],
            "phi_3": vec![0.0; n],
            "m_3": vec![0.8; n],
            "pt_4": vec![40.0; n],
            "eta_4": vec![0.3; n],
            "phi_4": vec![1.0; n],
            "m_4": vec![0.8; n],
            "decay_mode_3": vec![0; n],
            "decay_mode_4": vec![0; n],
            "gen_match_3": vec![5; n],
            "gen_match_4": vec![5; n],
            "charge_3": vec![1; n],
            "charge_4": vec![-1; n],
            "id_vs_jet_3": vec![31; n],
            "id_vs_jet_4": vec![31; n],
            "n_btag": vec![0u32; n],
            "pileup_weight": vec![1.0; n],
            "generator_weight": vec![1.0; n],
            "ref_mass": vec![95.0; n],
        }
    });
    let path = dir.join("zh125.json");
    std::fs::write(&path, serde_json::to_string(&sample).unwrap()).unwrap();
    path
}

#[test]
fn process_fills_per_category_histograms() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_em_sample(dir.path(), 3);
    let out = dir.path().join("hists.json");

    let output = run(&[
        "process",
        "--input",
        input.to_str().unwrap(),
        "--algorithm",
        "likelihood-scan",
        "--output",
        out.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let v: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(v["n_selected"], 3);

    // All three 95-GeV pass-through events land in one fitted-mass bin.
    let bins = v["histograms"]["fitted_mass"]["eeem"]["bins"].as_array().unwrap();
    let total: f64 = bins.iter().map(|b| b.as_f64().unwrap()).sum();
    assert_eq!(total, 3.0);
    assert_eq!(bins[4].as_f64().unwrap(), 3.0);

    // Other categories stay empty.
    let mmtt: f64 = v["histograms"]["fitted_mass"]["mmtt"]["bins"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b.as_f64().unwrap())
        .sum();
    assert_eq!(mmtt, 0.0);

    // The cutflow records every selection step through the mass window.
    let cutflow = v["histograms"]["cutflow"]["eeem"]["bins"].as_array().unwrap();
    assert_eq!(cutflow[0].as_f64().unwrap(), 3.0);
    assert_eq!(cutflow[7].as_f64().unwrap(), 3.0);
}

#[test]
fn same_sign_selection_empties_an_opposite_sign_sample() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_em_sample(dir.path(), 2);

    let output = run(&[
        "process",
        "--input",
        input.to_str().unwrap(),
        "--algorithm",
        "likelihood-scan",
        "--sign",
        "ss",
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let v: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(v["n_selected"], 0);
    let bins = v["histograms"]["fitted_mass"]["eeem"]["bins"].as_array().unwrap();
    assert!(bins.iter().all(|b| b.as_f64().unwrap() == 0.0));
}
