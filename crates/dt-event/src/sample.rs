//! One physics process's events plus the mutable per-event pipeline state.

use crate::cache::FitCache;
use crate::channel::Channel;
use crate::table::EventTable;
use dt_core::{FitStatus, Result};
use serde::Deserialize;
use std::path::Path;

/// A sample: immutable event table, parsed channels, and the per-event
/// mutable arrays (selection mask, weights, fitted-mass outputs) sized to
/// the event count.
///
/// A sample is exclusively owned by the single pipeline invocation that
/// loaded it, and in turn owns its result cache and backing file.
/// Concurrent runs over the same sample name and cache directory are not
/// supported: the periodic full-file cache rewrite is last-writer-wins.
#[derive(Debug)]
pub struct Sample {
    /// Sample name (also the cache file stem).
    pub name: String,
    /// Theoretical cross-section (pb).
    pub cross_section: f64,
    /// Per-sample normalization weight (luminosity x cross-section over
    /// the total generated weight).
    pub sample_weight: f64,
    /// The measured observables, read-only.
    pub table: EventTable,
    /// Channel label per event, parsed once at load.
    pub channels: Vec<Channel>,
    /// Selection mask; cuts clear entries, the fitter visits survivors.
    pub mask: Vec<bool>,
    /// Per-event weights, multiplied in place by correction factors.
    pub weights: Vec<f64>,
    /// Fitted di-tau mass per event (NaN until fitted).
    pub fitted_mass: Vec<f64>,
    /// Raw four-body mass from uncorrected tau vectors (NaN until filled).
    pub four_body_mass: Vec<f64>,
    /// Light pair + fitted tau pair system mass (NaN until filled).
    pub system_mass: Vec<f64>,
    /// System mass under the resonance-mass constraint (NaN until filled).
    pub system_mass_constrained: Vec<f64>,
    /// Per-event fit outcome classification.
    pub fit_status: Vec<FitStatus>,

    cache: Option<FitCache>,
}

/// Serialized form of a sample input file.
#[derive(Debug, Deserialize)]
struct SampleFile {
    name: String,
    cross_section: f64,
    sample_weight: f64,
    table: EventTable,
}

impl Sample {
    /// Build a sample from a validated table, sizing all mutable arrays.
    pub fn new(
        name: impl Into<String>,
        cross_section: f64,
        sample_weight: f64,
        table: EventTable,
    ) -> Result<Self> {
        table.validate()?;
        let n = table.n_events();
        let channels =
            table.category.iter().map(|&c| Channel::from_category(c)).collect::<Result<Vec<_>>>()?;
        Ok(Self {
            name: name.into(),
            cross_section,
            sample_weight,
            table,
            channels,
            mask: vec![true; n],
            weights: vec![1.0; n],
            fitted_mass: vec![f64::NAN; n],
            four_body_mass: vec![f64::NAN; n],
            system_mass: vec![f64::NAN; n],
            system_mass_constrained: vec![f64::NAN; n],
            fit_status: vec![FitStatus::Pending; n],
            cache: None,
        })
    }

    /// Load a sample from a JSON input file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let parsed: SampleFile = serde_json::from_reader(std::io::BufReader::new(file))?;
        Self::new(parsed.name, parsed.cross_section, parsed.sample_weight, parsed.table)
    }

    /// Number of events.
    pub fn n_events(&self) -> usize {
        self.table.n_events()
    }

    /// Number of events currently passing the mask.
    pub fn n_selected(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    /// Indices of events passing the mask, in event order.
    pub fn selected_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.mask.iter().enumerate().filter(|(_, &m)| m).map(|(i, _)| i)
    }

    /// Attach a persisted fit cache under `dir`, keyed by the sample name.
    pub fn attach_cache(&mut self, dir: &Path, flush_every: usize) {
        self.cache = Some(FitCache::open_for_sample(dir, &self.name, flush_every));
    }

    /// The attached cache, if any.
    pub fn cache(&self) -> Option<&FitCache> {
        self.cache.as_ref()
    }

    /// Mutable access to the attached cache, if any.
    pub fn cache_mut(&mut self) -> Option<&mut FitCache> {
        self.cache.as_mut()
    }
}
