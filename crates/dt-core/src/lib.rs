//! # dt-core
//!
//! Core types and traits for the ditau mass-reconstruction toolkit.
//!
//! This crate provides:
//! - The shared [`Error`]/[`Result`] types.
//! - Four-vector algebra and the measured-lepton data model.
//! - Structured event identifiers used as cache keys.
//! - The [`DiTauIntegrator`] and [`EnergyScale`] traits that decouple the
//!   mass fitter from concrete numerical engines and correction tables.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{DiTauIntegrator, EnergyScale, EnergyScaleShift, IntegrationOutcome};
pub use types::{
    EventId, FitStatus, FourVector, MeasuredLepton, MetCovariance, MetVector, TauDecayMode,
    ELECTRON_MASS, MUON_MASS,
};
