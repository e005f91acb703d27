//! Import session lifecycle.
//!
//! An [`ImportSession`] owns the engine handle for one roster file and walks
//! it through `Unopened -> Opened -> Planned -> Sized -> Importing ->
//! Finalized`. Rows are planned before the table is sized, so only rows that
//! planned cleanly get a record. Any session-level failure moves it to
//! `Failed` and releases the handle; row failures are recorded in the
//! [`ImportReport`] and never stop the batch.
//! Dropping a session with a handle still open closes it.

#[cfg(test)]
pub mod tests;

use crate::accessor::TypedFieldAccessor;
use crate::builder::{PlanContext, PositionRegistry, RecordPlan};
use crate::config::ImportConfig;
use crate::engine::{Engine, EngineHandle};
use crate::error::{FinalizeStep, Result, RosterError};
use crate::jersey::{AllocationState, JerseyNumberAllocator};
use crate::models::{FinalizeOutcome, ImportReport, PlayerRow, SkippedRow, VerificationFailure};
use crate::schema::SchemaCatalog;

use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Lifecycle position of an [`ImportSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unopened,
    Opened,
    Planned,
    Sized,
    Importing,
    Finalized,
    Failed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Unopened => "unopened",
            SessionState::Opened => "opened",
            SessionState::Planned => "planned",
            SessionState::Sized => "sized",
            SessionState::Importing => "importing",
            SessionState::Finalized => "finalized",
            SessionState::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row that planned cleanly, waiting for its record
struct PlannedRow {
    row: usize,
    player: String,
    code: &'static str,
    plan: RecordPlan,
}

/// One import of CSV rows into one roster file
pub struct ImportSession<E: Engine> {
    engine: E,
    config: ImportConfig,
    registry: PositionRegistry,
    state: SessionState,
    handle: Option<EngineHandle>,
    catalog: Option<SchemaCatalog>,
    allocator: JerseyNumberAllocator,
    allocation: AllocationState,
    planned: Vec<PlannedRow>,
    report: ImportReport,
}

impl<E: Engine> ImportSession<E> {
    pub fn new(engine: E, config: ImportConfig) -> Self {
        let allocator = JerseyNumberAllocator::new(config.jersey_seed);
        Self {
            engine,
            config,
            registry: PositionRegistry::standard(),
            state: SessionState::Unopened,
            handle: None,
            catalog: None,
            allocator,
            allocation: AllocationState::new(),
            planned: Vec::new(),
            report: ImportReport::new(""),
        }
    }

    /// Replace the position dispatch table
    pub fn with_registry(mut self, registry: PositionRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Schema snapshot taken when the roster was opened
    pub fn catalog(&self) -> Option<&SchemaCatalog> {
        self.catalog.as_ref()
    }

    pub fn allocation_state(&self) -> &AllocationState {
        &self.allocation
    }

    pub fn report(&self) -> &ImportReport {
        &self.report
    }

    /// Open the roster file and read its schema
    pub fn open(&mut self, path: &Path) -> Result<()> {
        self.expect_state(SessionState::Unopened)?;
        self.report = ImportReport::new(path);

        let handle = self.engine.open(path);
        if !handle.is_valid() {
            error!("Engine refused to open {}", path.display());
            self.state = SessionState::Failed;
            return Err(RosterError::SessionOpen {
                path: path.to_path_buf(),
            });
        }
        self.handle = Some(handle);
        debug!("Opened {} as {}", path.display(), handle);

        let catalog = match SchemaCatalog::load(&self.engine, handle) {
            Ok(catalog) => catalog,
            Err(e) => return Err(self.fail("schema discovery", e)),
        };
        if catalog.table(&self.config.player_table).is_err() {
            let e = RosterError::Schema {
                table: self.config.player_table.clone(),
                reason: "player table missing or unreadable".to_string(),
            };
            return Err(self.fail("schema discovery", e));
        }

        info!(
            "Opened {} ({} tables)",
            path.display(),
            catalog.tables().len()
        );
        self.catalog = Some(catalog);
        self.state = SessionState::Opened;
        Ok(())
    }

    /// Plan a record for every row, in input order
    ///
    /// Rows that fail dispatch or planning are reported as skipped here and
    /// never get a record index. Returns the number of planned records.
    pub fn plan(&mut self, rows: &[PlayerRow]) -> Result<usize> {
        self.expect_state(SessionState::Opened)?;
        self.report.rows_read = rows.len();

        let catalog = self.catalog.as_ref().ok_or(RosterError::InvalidState {
            expected: SessionState::Opened.as_str(),
            actual: SessionState::Unopened.as_str(),
        })?;
        let mut ctx = PlanContext {
            catalog,
            allocator: &mut self.allocator,
            state: &mut self.allocation,
            config: &self.config,
        };

        for (index, row) in rows.iter().enumerate() {
            let planned = self
                .registry
                .dispatch(row)
                .and_then(|builder| {
                    builder
                        .plan(row, &mut ctx)
                        .map(|plan| (builder.code(), plan))
                });

            match planned {
                Ok((code, plan)) => self.planned.push(PlannedRow {
                    row: index,
                    player: row.display_name(),
                    code,
                    plan,
                }),
                Err(e) => {
                    warn!("Row {}: skipped ({})", index, e);
                    self.report.skipped.push(SkippedRow {
                        row: index,
                        player: row.display_name(),
                        reason: e.to_string(),
                        partially_written: false,
                    });
                }
            }
        }

        self.report.pool_exhausted = self.allocation.exhausted_events().to_vec();
        debug!(
            "Planned {} of {} rows",
            self.planned.len(),
            self.report.rows_read
        );
        self.state = SessionState::Planned;
        Ok(self.planned.len())
    }

    /// Resize the player table to hold exactly the planned records
    pub fn size(&mut self) -> Result<()> {
        self.expect_state(SessionState::Planned)?;
        let handle = self.open_handle()?;
        let table = self.config.player_table.clone();

        let capacity = match i32::try_from(self.planned.len()) {
            Ok(capacity) => capacity,
            Err(_) => {
                let e = RosterError::SessionSize {
                    table,
                    capacity: i32::MAX,
                };
                return Err(self.fail("resize", e));
            }
        };

        if !self.engine.resize_table(handle, &table, capacity) {
            let e = RosterError::SessionSize { table, capacity };
            return Err(self.fail("resize", e));
        }

        debug!("Sized {} to {} records", table, capacity);
        self.state = SessionState::Sized;
        Ok(())
    }

    /// Write the planned records; record `n` holds the `n`th planned row
    pub fn import(&mut self) -> Result<&ImportReport> {
        self.expect_state(SessionState::Sized)?;
        let handle = self.open_handle()?;
        self.state = SessionState::Importing;

        let start_time = Instant::now();
        let planned = std::mem::take(&mut self.planned);

        let progress = if self.config.show_progress {
            let pb = ProgressBar::new(planned.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb.set_message("Importing players");
            pb
        } else {
            ProgressBar::hidden()
        };

        let catalog = self.catalog.as_ref().ok_or(RosterError::InvalidState {
            expected: SessionState::Opened.as_str(),
            actual: SessionState::Unopened.as_str(),
        })?;
        let table = self.config.player_table.as_str();
        let mut accessor = TypedFieldAccessor::new(&mut self.engine, handle, catalog)
            .with_verification(self.config.verify_writes);

        for (record, entry) in (0i32..).zip(planned.iter()) {
            progress.inc(1);

            match entry.plan.write(&mut accessor, table, record) {
                Ok(outcome) => {
                    self.report.rows_imported += 1;
                    for failure in outcome.verification_failures {
                        self.report.verification_failures.push(VerificationFailure {
                            row: entry.row,
                            record,
                            message: failure.to_string(),
                        });
                    }
                }
                Err(failure) => {
                    let partially_written = failure.fields_written > 0;
                    if partially_written {
                        error!(
                            "Row {} ({}): record {} partially written ({} fields) before: {}",
                            entry.row, entry.code, record, failure.fields_written, failure.error
                        );
                    } else {
                        warn!(
                            "Row {} ({}): skipped ({})",
                            entry.row, entry.code, failure.error
                        );
                    }
                    self.report.skipped.push(SkippedRow {
                        row: entry.row,
                        player: entry.player.clone(),
                        reason: failure.error.to_string(),
                        partially_written,
                    });
                }
            }
        }
        progress.finish_with_message("Import complete");

        self.report.skipped.sort_by_key(|skipped| skipped.row);
        self.report.processing_time_ms = start_time.elapsed().as_millis();

        info!(
            "Imported {}/{} rows into {} records",
            self.report.rows_imported,
            self.report.rows_read,
            planned.len()
        );
        Ok(&self.report)
    }

    /// Compact, save and close, checking each step
    pub fn finalize(&mut self) -> Result<FinalizeOutcome> {
        self.expect_state(SessionState::Importing)?;
        let handle = self.open_handle()?;

        let compacted = self.engine.compact(handle);
        if !compacted {
            error!("Compacting {} failed", self.report.roster_path.display());
        }
        let saved = self.engine.save(handle);
        if !saved {
            error!(
                "Saving {} failed; changes may be lost",
                self.report.roster_path.display()
            );
        }
        let closed = self.engine.close(handle);
        if !closed {
            error!("Closing {} failed", self.report.roster_path.display());
        }
        self.handle = None;

        let outcome = FinalizeOutcome {
            compacted,
            saved,
            closed,
        };
        self.report.finalize = Some(outcome);

        let failed: Vec<FinalizeStep> = outcome.failed_steps();
        if failed.is_empty() {
            info!("Saved {}", self.report.roster_path.display());
            self.state = SessionState::Finalized;
            Ok(outcome)
        } else {
            self.state = SessionState::Failed;
            Err(RosterError::Finalize { steps: failed })
        }
    }

    /// Open, plan, size, import and finalize in one call
    ///
    /// The report stays available through [`ImportSession::report`] when a
    /// later step fails.
    pub fn run(&mut self, path: &Path, rows: &[PlayerRow]) -> Result<ImportReport> {
        self.open(path)?;
        self.plan(rows)?;
        self.size()?;
        self.import()?;
        self.finalize()?;
        Ok(self.report.clone())
    }

    fn expect_state(&self, expected: SessionState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(RosterError::InvalidState {
                expected: expected.as_str(),
                actual: self.state.as_str(),
            })
        }
    }

    fn open_handle(&self) -> Result<EngineHandle> {
        self.handle.ok_or(RosterError::InvalidState {
            expected: SessionState::Opened.as_str(),
            actual: self.state.as_str(),
        })
    }

    /// Record a session-level failure and release the handle
    fn fail(&mut self, operation: &str, e: RosterError) -> RosterError {
        error!("Session failed during {}: {}", operation, e);
        self.state = SessionState::Failed;
        self.close();
        e
    }

    /// Best-effort close; a no-op when nothing is open
    fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            if self.engine.close(handle) {
                debug!("Closed {}", handle);
            } else {
                warn!("Engine failed to close {}", handle);
            }
        }
    }
}

impl<E: Engine> Drop for ImportSession<E> {
    fn drop(&mut self) {
        if self.handle.is_some() {
            warn!("Session dropped while {}; closing roster", self.state);
            self.close();
        }
    }
}
