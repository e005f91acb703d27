//! Position-aware record building.
//!
//! A [`RecordBuilder`] turns one [`PlayerRow`] into a [`RecordPlan`]: the
//! ordered field writes for a single player record. Every value is converted
//! and parsed against the live field layout before the jersey number is
//! allocated, and nothing reaches the engine while planning. A row that fails
//! planning has therefore written nothing and reserved no number. The plan's
//! writes are issued later through the [`TypedFieldAccessor`].
//!
//! Dispatch from position code to builder goes through [`PositionRegistry`].

pub mod convert;
pub mod recipes;

use crate::accessor::{TypedFieldAccessor, TypedValue};
use crate::config::ImportConfig;
use crate::constants::attributes;
use crate::error::{RosterError, Result};
use crate::jersey::{Allocation, AllocationState, JerseyNumberAllocator};
use crate::models::PlayerRow;
use crate::schema::SchemaCatalog;
use std::collections::HashMap;
use tracing::{debug, warn};

pub use recipes::{POSITION_RECIPES, PositionGroup, PositionRecipe};

/// One engine field and the typed value destined for it
#[derive(Debug, Clone, PartialEq)]
pub struct FieldWrite {
    pub field: &'static str,
    pub value: TypedValue,
}

/// Every write for one record, in issue order
#[derive(Debug, Clone)]
pub struct RecordPlan {
    pub writes: Vec<FieldWrite>,
    pub jersey: Allocation,
}

impl RecordPlan {
    pub fn value_of(&self, field: &str) -> Option<&TypedValue> {
        self.writes
            .iter()
            .find(|write| write.field == field)
            .map(|write| &write.value)
    }

    pub fn fields(&self) -> Vec<&'static str> {
        self.writes.iter().map(|write| write.field).collect()
    }

    /// Issue the writes against `record`, in order
    ///
    /// A verification failure is recorded and the remaining writes continue;
    /// any other error stops the record where it is.
    pub fn write(
        &self,
        accessor: &mut TypedFieldAccessor<'_>,
        table: &str,
        record: i32,
    ) -> std::result::Result<BuildOutcome, BuildFailure> {
        let mut fields_written = 0;
        let mut verification_failures = Vec::new();

        for write in &self.writes {
            match accessor.set(table, write.field, record, &write.value) {
                Ok(()) => fields_written += 1,
                Err(error @ RosterError::WriteVerification { .. }) => {
                    // The engine accepted the value; it just stored something else
                    warn!("Record {}: {}", record, error);
                    fields_written += 1;
                    verification_failures.push(error);
                }
                Err(error) => {
                    return Err(BuildFailure {
                        error,
                        fields_written,
                    });
                }
            }
        }

        debug!(
            "Wrote record {} ({} fields, #{})",
            record, fields_written, self.jersey.number
        );
        Ok(BuildOutcome {
            record,
            jersey: self.jersey,
            fields_written,
            verification_failures,
        })
    }
}

/// Writes parsed so far for a record whose jersey number is still open
pub struct PlanDraft<'a> {
    catalog: &'a SchemaCatalog,
    table: &'a str,
    writes: Vec<FieldWrite>,
    jersey_slot: Option<usize>,
}

impl<'a> PlanDraft<'a> {
    pub fn new(catalog: &'a SchemaCatalog, table: &'a str) -> Self {
        Self {
            catalog,
            table,
            writes: Vec::new(),
            jersey_slot: None,
        }
    }

    /// Parse a value by the field's declared type and queue it
    pub fn push(&mut self, field: &'static str, raw: &str) -> Result<()> {
        let descriptor = self.catalog.field(self.table, field)?;
        let value = TypedValue::parse(self.table, descriptor, raw)?;
        self.writes.push(FieldWrite { field, value });
        Ok(())
    }

    /// Queue a write only when the row carries the attribute
    pub fn push_opt(&mut self, field: &'static str, raw: Option<&str>) -> Result<()> {
        match raw {
            Some(raw) => self.push(field, raw),
            None => Ok(()),
        }
    }

    /// Hold the jersey write's place; the field must accept a number
    pub fn push_jersey(&mut self, field: &'static str) -> Result<()> {
        self.push(field, "0")?;
        self.jersey_slot = Some(self.writes.len() - 1);
        Ok(())
    }

    /// Fill in the allocated jersey number
    pub fn finish(mut self, jersey: Allocation) -> Result<RecordPlan> {
        if let Some(write) = self.jersey_slot.and_then(|slot| self.writes.get_mut(slot)) {
            let descriptor = self.catalog.field(self.table, write.field)?;
            write.value = TypedValue::parse(self.table, descriptor, &jersey.number.to_string())?;
        }
        Ok(RecordPlan {
            writes: self.writes,
            jersey,
        })
    }
}

/// Everything a builder needs while one session plans rows
pub struct PlanContext<'a> {
    pub catalog: &'a SchemaCatalog,
    pub allocator: &'a mut JerseyNumberAllocator,
    pub state: &'a mut AllocationState,
    pub config: &'a ImportConfig,
}

/// A record written in full, possibly with fields that failed verification
#[derive(Debug)]
pub struct BuildOutcome {
    pub record: i32,
    pub jersey: Allocation,
    pub fields_written: usize,
    pub verification_failures: Vec<RosterError>,
}

/// A record abandoned part way; `fields_written` writes already reached the engine
#[derive(Debug)]
pub struct BuildFailure {
    pub error: RosterError,
    pub fields_written: usize,
}

/// Field-assignment recipe for one roster position
pub trait RecordBuilder: Send + Sync {
    /// Position code this builder handles
    fn code(&self) -> &'static str;

    /// Resolve and parse every field value for a row, allocating its jersey
    /// number last
    fn plan(&self, row: &PlayerRow, ctx: &mut PlanContext<'_>) -> Result<RecordPlan>;
}

/// Lookup table from position code to builder
pub struct PositionRegistry {
    builders: HashMap<&'static str, Box<dyn RecordBuilder>>,
}

impl PositionRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// Registry holding every standard position recipe
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for recipe in POSITION_RECIPES {
            registry.register(Box::new(*recipe));
        }
        registry
    }

    /// Add or replace the builder for its position code
    pub fn register(&mut self, builder: Box<dyn RecordBuilder>) {
        self.builders.insert(builder.code(), builder);
    }

    pub fn get(&self, code: &str) -> Option<&dyn RecordBuilder> {
        self.builders.get(code).map(|builder| builder.as_ref())
    }

    /// Builder for a row's position
    pub fn dispatch(&self, row: &PlayerRow) -> Result<&dyn RecordBuilder> {
        let position = row.position().ok_or_else(|| RosterError::MissingAttribute {
            attribute: attributes::POSITION.to_string(),
        })?;
        self.get(&position)
            .ok_or(RosterError::UnrecognizedPosition { position })
    }

    /// Registered position codes, sorted
    pub fn codes(&self) -> Vec<&'static str> {
        let mut codes: Vec<_> = self.builders.keys().copied().collect();
        codes.sort_unstable();
        codes
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }
}

impl Default for PositionRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
