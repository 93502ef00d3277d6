//! # dt-analysis
//!
//! The selection-and-aggregation pipeline around the mass fitter: cut
//! cascade, weight chain, scale-factor application and per-category
//! histogram accumulation. This crate consumes fitter outputs; none of the
//! mass-reconstruction logic lives here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cuts;
pub mod group;
pub mod histogram;
pub mod scale_factor;

pub use cuts::SignSelection;
pub use group::{Group, HistogramSet, ProcessConfig};
pub use histogram::Histogram;
pub use scale_factor::{FlatScaleFactor, ScaleFactor};
