//! Di-tau reconstruction CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use dt_analysis::{FlatScaleFactor, Group, ProcessConfig, SignSelection};
use dt_core::EnergyScaleShift;
use dt_event::{Sample, DEFAULT_FLUSH_EVERY};
use dt_fit::{FitAlgorithm, FitSummary, FitterConfig, MassFitter};

#[derive(Parser)]
#[command(name = "ditau")]
#[command(about = "Di-tau invariant-mass reconstruction and histogram pipeline")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit the di-tau mass for every selected event of one sample
    Fit {
        /// Input sample file (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Fit algorithm: markov-chain or likelihood-scan
        #[arg(long, default_value = "markov-chain")]
        algorithm: String,

        /// Tau energy-scale shift: none, up or down
        #[arg(long, default_value = "none")]
        shift: String,

        /// Directory holding per-sample fit caches (Markov-chain mode)
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Resonance mass for the constrained second pass (GeV)
        #[arg(long, default_value = "125.0")]
        constraint_mass: f64,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the full pipeline: cuts, fit, mass window, histograms
    Process {
        /// Input sample file (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Fit algorithm: markov-chain or likelihood-scan
        #[arg(long, default_value = "markov-chain")]
        algorithm: String,

        /// Tau energy-scale shift: none, up or down
        #[arg(long, default_value = "none")]
        shift: String,

        /// Directory holding per-sample fit caches (Markov-chain mode)
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Tau-pair charge selection: os or ss
        #[arg(long, default_value = "os")]
        sign: String,

        /// Scalar-sum threshold for the fully-hadronic channel (GeV)
        #[arg(long, default_value = "0.0")]
        lt_threshold: f64,

        /// Output file for histograms (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Fit { input, algorithm, shift, cache_dir, constraint_mass, output } => cmd_fit(
            &input,
            &algorithm,
            &shift,
            cache_dir.as_ref(),
            constraint_mass,
            output.as_ref(),
        ),
        Commands::Process { input, algorithm, shift, cache_dir, sign, lt_threshold, output } => {
            cmd_process(
                &input,
                &algorithm,
                &shift,
                cache_dir.as_ref(),
                &sign,
                lt_threshold,
                output.as_ref(),
            )
        }
    }
}

fn load_sample(input: &PathBuf, cache_dir: Option<&PathBuf>) -> Result<Sample> {
    tracing::info!(path = %input.display(), "loading sample");
    let mut sample = Sample::from_path(input)?;
    tracing::info!(sample = %sample.name, n_events = sample.n_events(), "sample loaded");
    if let Some(dir) = cache_dir {
        std::fs::create_dir_all(dir)?;
        sample.attach_cache(dir, DEFAULT_FLUSH_EVERY);
    }
    Ok(sample)
}

fn build_fitter(algorithm: &str, shift: &str, constraint_mass: f64) -> Result<MassFitter> {
    let mut config = FitterConfig::new(algorithm.parse::<FitAlgorithm>()?);
    config.shift = shift.parse::<EnergyScaleShift>()?;
    config.constraint_mass = constraint_mass;
    Ok(MassFitter::with_default_engine(config))
}

fn summary_json(summary: &FitSummary) -> serde_json::Value {
    serde_json::json!({
        "n_selected": summary.n_selected,
        "n_fitted": summary.n_fitted,
        "n_cached": summary.n_cached,
        "n_pass_through": summary.n_pass_through,
        "n_unreliable": summary.n_unreliable,
        "n_evaluations": summary.n_evaluations,
    })
}

fn cmd_fit(
    input: &PathBuf,
    algorithm: &str,
    shift: &str,
    cache_dir: Option<&PathBuf>,
    constraint_mass: f64,
    output: Option<&PathBuf>,
) -> Result<()> {
    let mut sample = load_sample(input, cache_dir)?;
    let fitter = build_fitter(algorithm, shift, constraint_mass)?;
    let summary = fitter.fit(&mut sample)?;
    tracing::info!(
        n_fitted = summary.n_fitted,
        n_cached = summary.n_cached,
        n_unreliable = summary.n_unreliable,
        "fit complete"
    );

    // Masked (never-fitted) events serialize as null masses.
    let output_json = serde_json::json!({
        "sample": sample.name,
        "n_events": sample.n_events(),
        "summary": summary_json(&summary),
        "fitted_mass": sample.fitted_mass,
        "four_body_mass": sample.four_body_mass,
        "system_mass": sample.system_mass,
        "system_mass_constrained": sample.system_mass_constrained,
        "fit_status": sample.fit_status,
    });
    write_json(output, output_json)
}

fn cmd_process(
    input: &PathBuf,
    algorithm: &str,
    shift: &str,
    cache_dir: Option<&PathBuf>,
    sign: &str,
    lt_threshold: f64,
    output: Option<&PathBuf>,
) -> Result<()> {
    let mut sample = load_sample(input, cache_dir)?;
    let fitter = build_fitter(algorithm, shift, 125.0)?;

    let mut group = Group::new(
        Box::new(FlatScaleFactor(1.0)),
        Box::new(FlatScaleFactor(1.0)),
        Box::new(FlatScaleFactor(1.0)),
    );
    let config = ProcessConfig {
        sign: sign.parse::<SignSelection>()?,
        lt_threshold,
        ..ProcessConfig::default()
    };
    let summary = group.process(&mut sample, &fitter, &config)?;

    let output_json = serde_json::json!({
        "sample": sample.name,
        "n_events": sample.n_events(),
        "n_selected": sample.n_selected(),
        "summary": summary_json(&summary),
        "histograms": group.hists,
    });
    write_json(output, output_json)
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
