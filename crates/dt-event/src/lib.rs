//! # dt-event
//!
//! Event-level data for the ditau toolkit.
//!
//! This crate provides:
//! - A fixed-schema columnar [`EventTable`] (SoA layout) validated at
//!   construction.
//! - [`Channel`] parsing from per-event category codes.
//! - [`Sample`]: one physics process's table plus the mutable per-event
//!   state (selection mask, weights, fitted-mass columns) and the owned
//!   [`FitCache`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod channel;
pub mod sample;
pub mod table;

pub use cache::{CacheRecord, CachedMasses, FitCache, DEFAULT_FLUSH_EVERY};
pub use channel::{Channel, LightPair, TauPair};
pub use sample::Sample;
pub use table::EventTable;
