//! Roulette session state
//!
//! Owned by the UI layer. The save codec only reads it on encode and builds
//! a fresh one on decode.

use crate::demon::Demon;
use crate::save::SaveError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level keys written by the encoder itself
pub const RESERVED_FIELDS: [&str; 8] = [
    "playing",
    "selectedLists",
    "demons",
    "current",
    "percent",
    "percents",
    "completedDemonNames",
    "version",
];

/// Which list tiers feed the pool
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(default)]
pub struct SelectedLists {
    pub main: bool,
    pub extended: bool,
    pub legacy: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RouletteState {
    /// A round is in progress
    pub playing: bool,

    pub selected_lists: SelectedLists,

    /// Candidate pool, in roll order
    pub demons: Vec<Demon>,

    /// Demon currently rolled
    pub current: Option<Demon>,

    /// Progress required on `current`
    pub percent: f64,

    /// Progress history, oldest first
    pub percents: Vec<f64>,

    pub completed_demon_names: Vec<String>,

    /// Save schema version (0 = legacy)
    pub version: u32,

    /// Top-level fields this build does not know about, carried through
    /// decode and encode untouched
    pub extra: BTreeMap<String, rmpv::Value>,
}

impl RouletteState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_completed(&self, name: &str) -> bool {
        self.completed_demon_names.iter().any(|n| n == name)
    }

    pub fn validate(&self) -> Result<(), SaveError> {
        if !self.percent.is_finite() {
            return Err(SaveError::NonFinite { field: "percent".to_string() });
        }

        if self.percents.iter().any(|p| !p.is_finite()) {
            return Err(SaveError::NonFinite { field: "percents".to_string() });
        }

        if let Some(key) = self.extra.keys().find(|k| RESERVED_FIELDS.contains(&k.as_str())) {
            return Err(SaveError::ReservedField { key: key.clone() });
        }

        Ok(())
    }
}
