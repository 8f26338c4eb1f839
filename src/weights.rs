//! Scoring weights: validation, file loading, and the versioned store.
//!
//! Initial weights come from a config file resolved env-first:
//! 1) $SYNERGY_WEIGHTS_PATH
//! 2) config/weights.toml
//! 3) config/weights.json
//! falling back to the built-in seed when nothing is found. Runtime updates
//! go through `SynergyService::set_weights_and_recompute`, which replaces the
//! whole vector atomically and rescoring follows before the call returns.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

pub const ENV_WEIGHTS_PATH: &str = "SYNERGY_WEIGHTS_PATH";

/// Five named coefficients, one per season metric used in scoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynergyWeights {
    pub w_teammate_delta: f64,
    pub w_lap_stdev: f64,
    pub w_qualifying: f64,
    pub w_race: f64,
    pub w_dnf: f64,
}

impl Default for SynergyWeights {
    fn default() -> Self {
        Self {
            w_teammate_delta: 2.0,
            w_lap_stdev: 1.5,
            w_qualifying: 0.5,
            w_race: 1.0,
            w_dnf: 3.0,
        }
    }
}

impl SynergyWeights {
    /// Reject malformed vectors before any process-wide state changes.
    pub fn validate(&self) -> Result<()> {
        let named = [
            ("w_teammate_delta", self.w_teammate_delta),
            ("w_lap_stdev", self.w_lap_stdev),
            ("w_qualifying", self.w_qualifying),
            ("w_race", self.w_race),
            ("w_dnf", self.w_dnf),
        ];
        for (name, v) in named {
            if !v.is_finite() {
                bail!("weight {name} is not a finite number: {v}");
            }
        }
        Ok(())
    }
}

/// Load weights from an explicit path. Supports TOML or JSON formats.
pub fn load_weights_from(path: &Path) -> Result<SynergyWeights> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading weights from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let w = parse_weights(&content, ext.as_str())?;
    w.validate()?;
    Ok(w)
}

/// Load weights using env var + fallbacks; the built-in seed when no config
/// file exists.
pub fn load_weights_default() -> Result<SynergyWeights> {
    if let Ok(p) = std::env::var(ENV_WEIGHTS_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_weights_from(&pb);
        } else {
            return Err(anyhow!("SYNERGY_WEIGHTS_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/weights.toml");
    if toml_p.exists() {
        return load_weights_from(&toml_p);
    }
    let json_p = PathBuf::from("config/weights.json");
    if json_p.exists() {
        return load_weights_from(&json_p);
    }
    Ok(SynergyWeights::default())
}

fn parse_weights(s: &str, hint_ext: &str) -> Result<SynergyWeights> {
    if hint_ext == "toml" {
        if let Ok(w) = toml::from_str::<SynergyWeights>(s) {
            return Ok(w);
        }
    }
    if let Ok(w) = serde_json::from_str::<SynergyWeights>(s) {
        return Ok(w);
    }
    if hint_ext != "toml" {
        if let Ok(w) = toml::from_str::<SynergyWeights>(s) {
            return Ok(w);
        }
    }
    Err(anyhow!("unsupported weights format"))
}

/// Process-wide current weights. Replaced wholesale, never field-by-field,
/// so readers can only ever observe one complete generation.
#[derive(Debug)]
pub struct WeightStore {
    inner: RwLock<Versioned>,
}

#[derive(Debug, Clone, Copy)]
struct Versioned {
    weights: SynergyWeights,
    version: u64,
}

impl WeightStore {
    pub fn new(initial: SynergyWeights) -> Self {
        Self {
            inner: RwLock::new(Versioned {
                weights: initial,
                version: 1,
            }),
        }
    }

    pub fn current(&self) -> SynergyWeights {
        self.inner.read().expect("weight store lock poisoned").weights
    }

    pub fn version(&self) -> u64 {
        self.inner.read().expect("weight store lock poisoned").version
    }

    /// Swap in a new generation; returns the new version. Callers are
    /// expected to have validated the vector and to rescore history before
    /// reporting completion (see `SynergyService`).
    pub fn replace(&self, weights: SynergyWeights) -> u64 {
        let mut guard = self.inner.write().expect("weight store lock poisoned");
        guard.weights = weights;
        guard.version += 1;
        guard.version
    }
}
