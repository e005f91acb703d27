//! Core data structures for roster imports.
//!
//! Defines the input row type produced by the CSV reader and the run report
//! the importer hands back to the operator.

use crate::constants::attributes;
use crate::error::{FinalizeStep, Result};
use crate::jersey::PoolExhausted;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One player's attributes, keyed by attribute name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerRow {
    values: HashMap<String, String>,
}

impl PlayerRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute, returning the row for chaining
    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(attribute, value);
        self
    }

    pub fn insert(&mut self, attribute: impl Into<String>, value: impl Into<String>) {
        self.values.insert(attribute.into(), value.into());
    }

    /// Trimmed attribute value, or `None` when missing or blank
    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.values
            .get(attribute)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// Normalised position code
    pub fn position(&self) -> Option<String> {
        self.get(attributes::POSITION)
            .map(|position| position.to_ascii_uppercase())
    }

    /// Name used in log lines
    pub fn display_name(&self) -> String {
        match (
            self.get(attributes::FIRST_NAME),
            self.get(attributes::LAST_NAME),
        ) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(name), None) | (None, Some(name)) => name.to_string(),
            (None, None) => "<unnamed>".to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PlayerRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = PlayerRow::new();
        for (attribute, value) in iter {
            row.insert(attribute, value);
        }
        row
    }
}

/// A row that did not make it into the roster intact
#[derive(Debug, Clone, Serialize)]
pub struct SkippedRow {
    pub row: usize,
    pub player: String,
    pub reason: String,
    /// Some fields were written before the row failed
    pub partially_written: bool,
}

/// A field whose read-back differed from the written value
#[derive(Debug, Clone, Serialize)]
pub struct VerificationFailure {
    pub row: usize,
    pub record: i32,
    pub message: String,
}

/// Result of each finalization step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FinalizeOutcome {
    pub compacted: bool,
    pub saved: bool,
    pub closed: bool,
}

impl FinalizeOutcome {
    pub fn failed_steps(&self) -> Vec<FinalizeStep> {
        let mut steps = Vec::new();
        if !self.compacted {
            steps.push(FinalizeStep::Compact);
        }
        if !self.saved {
            steps.push(FinalizeStep::Save);
        }
        if !self.closed {
            steps.push(FinalizeStep::Close);
        }
        steps
    }

    pub fn is_clean(&self) -> bool {
        self.compacted && self.saved && self.closed
    }
}

/// Run log for one import session
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub roster_path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub rows_read: usize,
    pub rows_imported: usize,
    pub skipped: Vec<SkippedRow>,
    pub verification_failures: Vec<VerificationFailure>,
    pub pool_exhausted: Vec<PoolExhausted>,
    pub finalize: Option<FinalizeOutcome>,
    pub processing_time_ms: u128,
}

impl ImportReport {
    pub fn new(roster_path: impl Into<PathBuf>) -> Self {
        Self {
            roster_path: roster_path.into(),
            started_at: Utc::now(),
            rows_read: 0,
            rows_imported: 0,
            skipped: Vec::new(),
            verification_failures: Vec::new(),
            pool_exhausted: Vec::new(),
            finalize: None,
            processing_time_ms: 0,
        }
    }

    /// Every row imported, every write verified, roster saved and closed
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
            && self.verification_failures.is_empty()
            && self.finalize.is_some_and(|outcome| outcome.is_clean())
    }

    /// Success rate as a percentage of rows read
    pub fn success_rate(&self) -> f64 {
        if self.rows_read == 0 {
            100.0
        } else {
            (self.rows_imported as f64 / self.rows_read as f64) * 100.0
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
