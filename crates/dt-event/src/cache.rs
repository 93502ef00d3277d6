//! Persisted fit-result cache, one file per sample.
//!
//! The cache maps a structured [`EventId`] to the masses of an already
//! computed fit, so expensive integrations survive pipeline re-runs.
//! Entries are never invalidated: if the upstream inputs change, the
//! caller must delete the backing file.

use dt_core::{Error, EventId, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Default number of newly computed entries between periodic flushes.
pub const DEFAULT_FLUSH_EVERY: usize = 2500;

/// Cached mass fields for one event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CachedMasses {
    /// Fitted di-tau mass (GeV).
    pub fitted: f64,
    /// Light pair + fitted tau pair system mass (GeV).
    pub system: f64,
    /// System mass under the resonance-mass constraint (GeV).
    pub system_constrained: f64,
}

/// On-disk record: identifier plus masses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Event identifier (the cache key).
    pub id: EventId,
    /// Cached mass fields.
    pub masses: CachedMasses,
}

/// In-memory cache with full-file JSON persistence.
#[derive(Debug)]
pub struct FitCache {
    path: PathBuf,
    entries: HashMap<EventId, CachedMasses>,
    recomputed: usize,
    flush_every: usize,
    flushes: usize,
}

impl FitCache {
    /// Open the cache backed by `path`.
    ///
    /// A missing or unreadable file is not fatal: it means this is the
    /// first run for the sample (or the file was deliberately deleted),
    /// so the cache starts empty.
    pub fn open(path: impl Into<PathBuf>, flush_every: usize) -> Self {
        let path = path.into();
        let entries = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<Vec<CacheRecord>>(&bytes) {
                Ok(records) => {
                    tracing::debug!(
                        path = %path.display(),
                        n = records.len(),
                        "loaded fit cache"
                    );
                    records.into_iter().map(|r| (r.id, r.masses)).collect()
                }
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        %err,
                        "fit cache unreadable, starting empty"
                    );
                    HashMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    %err,
                    "fit cache unreadable, starting empty"
                );
                HashMap::new()
            }
        };
        Self { path, entries, recomputed: 0, flush_every: flush_every.max(1), flushes: 0 }
    }

    /// Open under `dir` with the conventional `<sample>.json` file name.
    pub fn open_for_sample(dir: &Path, sample_name: &str, flush_every: usize) -> Self {
        Self::open(dir.join(format!("{sample_name}.json")), flush_every)
    }

    /// Look up a previously fitted event.
    pub fn lookup(&self, id: &EventId) -> Option<&CachedMasses> {
        self.entries.get(id)
    }

    /// Insert or overwrite an entry.
    pub fn insert(&mut self, id: EventId, masses: CachedMasses) {
        self.entries.insert(id, masses);
    }

    /// Record one cache miss that required recomputation; flushes at every
    /// multiple of the configured cadence. Misses from absent keys count
    /// toward the threshold even if the subsequent fit turns out cheap.
    pub fn note_recompute(&mut self) -> Result<()> {
        self.recomputed += 1;
        if self.recomputed % self.flush_every == 0 {
            self.flush()?;
        }
        Ok(())
    }

    /// Rewrite the backing file with the full current contents.
    ///
    /// A failed flush is fatal for the sample's run: the in-memory cache
    /// would be silently lost and a partially written file is worse than
    /// no file.
    pub fn flush(&mut self) -> Result<()> {
        let mut records: Vec<CacheRecord> =
            self.entries.iter().map(|(id, masses)| CacheRecord { id: *id, masses: *masses }).collect();
        records.sort_by_key(|r| (r.id.run, r.id.lumi, r.id.event));

        let json = serde_json::to_vec(&records)
            .map_err(|e| Error::Cache(format!("serializing {}: {e}", self.path.display())))?;
        std::fs::write(&self.path, json)
            .map_err(|e| Error::Cache(format!("writing {}: {e}", self.path.display())))?;
        self.flushes += 1;
        tracing::debug!(path = %self.path.display(), n = records.len(), "flushed fit cache");
        Ok(())
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total recomputations recorded since opening.
    pub fn recomputed(&self) -> usize {
        self.recomputed
    }

    /// Number of flushes performed since opening.
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
