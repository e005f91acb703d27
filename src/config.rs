//! Configuration management and validation.
//!
//! Provides the import settings: which table receives the players, how
//! undrafted players and free agents are encoded, and whether writes are
//! verified. Settings come from defaults, an optional JSON file, and
//! command-line overrides, in that order.

use crate::constants::{
    DEFAULT_WEIGHT_OFFSET, FREE_AGENT_TEAM_ID, MAX_DRAFT_PICK, MAX_DRAFT_ROUND,
    MAX_IDENTIFIER_LEN, PLAYER_TABLE, UNDRAFTED_PICK, UNDRAFTED_ROUND,
};
use crate::error::{RosterError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings for one import run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Table that receives player records
    pub player_table: String,

    /// Read every written field back and compare
    pub verify_writes: bool,

    /// Draft round written when the CSV has none
    pub undrafted_round: u32,

    /// Draft pick written when the CSV has none
    pub undrafted_pick: u32,

    /// Team id written for players without a club
    pub free_agent_team_id: u32,

    /// Pounds subtracted from weight before storing
    pub weight_offset: i32,

    /// Seed for the jersey exhaustion fallback (random when unset)
    pub jersey_seed: Option<u64>,

    /// Show a progress bar while importing rows
    pub show_progress: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            player_table: PLAYER_TABLE.to_string(),
            verify_writes: true,
            undrafted_round: UNDRAFTED_ROUND,
            undrafted_pick: UNDRAFTED_PICK,
            free_agent_team_id: FREE_AGENT_TEAM_ID,
            weight_offset: DEFAULT_WEIGHT_OFFSET,
            jersey_seed: None,
            show_progress: true,
        }
    }
}

impl ImportConfig {
    /// Load settings from a JSON file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ImportConfig = serde_json::from_str(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Default location: `<config dir>/roster-import/config.json`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("roster-import").join("config.json"))
    }

    /// Load from an explicit path, else the default location if present, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_config_path().filter(|path| path.exists()) {
                Some(path) => Self::from_file(&path),
                None => Ok(Self::default()),
            },
        }
    }

    pub fn with_player_table(mut self, table: impl Into<String>) -> Self {
        self.player_table = table.into();
        self
    }

    pub fn without_verification(mut self) -> Self {
        self.verify_writes = false;
        self
    }

    pub fn with_jersey_seed(mut self, seed: u64) -> Self {
        self.jersey_seed = Some(seed);
        self
    }

    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.player_table.is_empty() || self.player_table.len() > MAX_IDENTIFIER_LEN {
            return Err(RosterError::Configuration {
                message: format!(
                    "player table name {:?} must be 1-{} characters",
                    self.player_table, MAX_IDENTIFIER_LEN
                ),
            });
        }
        if self.undrafted_round == 0 || self.undrafted_round > MAX_DRAFT_ROUND {
            return Err(RosterError::Configuration {
                message: format!(
                    "undrafted round {} outside 1-{}",
                    self.undrafted_round, MAX_DRAFT_ROUND
                ),
            });
        }
        if self.undrafted_pick > MAX_DRAFT_PICK {
            return Err(RosterError::Configuration {
                message: format!(
                    "undrafted pick {} above {}",
                    self.undrafted_pick, MAX_DRAFT_PICK
                ),
            });
        }
        Ok(())
    }
}
