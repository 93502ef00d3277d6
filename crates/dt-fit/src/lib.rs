//! # dt-fit
//!
//! The mass-reconstruction core: per-event numerical estimation of the
//! di-tau invariant mass from measured legs and missing transverse energy.
//!
//! Two engines implement [`dt_core::DiTauIntegrator`]:
//! - [`MarkovChainIntegrator`]: stochastic likelihood integration over the
//!   unknown visible-energy fractions, higher fidelity, supports a
//!   resonance-mass constraint, results cached per sample.
//! - [`LikelihoodScanIntegrator`]: deterministic one-pass grid scan,
//!   cheap enough that nothing is cached.
//!
//! [`MassFitter`] orchestrates either engine over a sample's selected
//! events, consults the sample's [`dt_event::FitCache`], applies
//! energy-scale corrections and derives the dependent system masses.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod energy_scale;
pub mod fitter;
mod likelihood;
pub mod markov;
pub mod scan;

pub use energy_scale::TauEnergyScale;
pub use fitter::{FitAlgorithm, FitSummary, FitterConfig, MassFitter};
pub use markov::MarkovChainIntegrator;
pub use scan::LikelihoodScanIntegrator;
