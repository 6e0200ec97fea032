//! Battle configuration.
//!
//! [`BattleConfig`] carries the tunables of one engagement. Every field has a
//! default, so a JSON document only needs the fields it changes.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::board::map::MapKind;

/// Errors that can occur while loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// The battle ends once this turn has been played.
    pub turn_limit: u32,
    /// Lines kept in the battle message log.
    pub log_capacity: usize,
    /// Debug mode: AP checks still apply but nothing is deducted.
    pub free_ap: bool,
    /// Upper bound on AI actions per unit per turn.
    pub ai_cycles_per_unit: u32,
    /// Seed for dice and tie-breaks; `None` draws from entropy.
    pub seed: Option<u64>,
    pub map: MapKind,
    /// Always place a town on the first qualifying junction of a random map.
    pub force_town: bool,
}

impl Default for BattleConfig {
    fn default() -> Self {
        BattleConfig {
            turn_limit: 8,
            log_capacity: 18,
            free_ap: false,
            ai_cycles_per_unit: 20,
            seed: None,
            map: MapKind::Scripted,
            force_town: true,
        }
    }
}

impl BattleConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        BattleConfig::from_json_str(&data)
    }
}
