//! Schema discovery for roster files.
//!
//! Queries the engine for its table and field metadata when a roster file
//! is opened. Field layout is specific to each file, so a catalog is never
//! reused across sessions.

use crate::constants::MAX_IDENTIFIER_LEN;
use crate::engine::{Engine, EngineHandle, RawField};
use crate::error::{RosterError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Value encodings a field may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    String,
    Binary,
    SignedInt,
    UnsignedInt,
    Float,
    /// Variable-length text, accessed like `String`
    Varchar,
}

impl FieldType {
    /// Decode the engine's numeric type code
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(FieldType::String),
            1 => Some(FieldType::Binary),
            2 => Some(FieldType::SignedInt),
            3 => Some(FieldType::UnsignedInt),
            4 => Some(FieldType::Float),
            0xD | 0xE => Some(FieldType::Varchar),
            _ => None,
        }
    }

    /// The engine's numeric type code
    pub fn code(&self) -> i32 {
        match self {
            FieldType::String => 0,
            FieldType::Binary => 1,
            FieldType::SignedInt => 2,
            FieldType::UnsignedInt => 3,
            FieldType::Float => 4,
            FieldType::Varchar => 0xD,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, FieldType::String | FieldType::Varchar)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Binary => "binary",
            FieldType::SignedInt => "signed int",
            FieldType::UnsignedInt => "unsigned int",
            FieldType::Float => "float",
            FieldType::Varchar => "varchar",
        };
        f.write_str(name)
    }
}

/// Table metadata as reported by the engine
///
/// A snapshot taken at discovery time. Record counts go stale as soon as the
/// client adds or resizes records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub field_count: i32,
    pub capacity: i32,
    pub record_count: i32,
    pub deleted_count: i32,
    pub next_deleted_record: i32,
    pub flag0: bool,
    pub flag1: bool,
    pub flag2: bool,
    pub flag3: bool,
    pub non_allocated: bool,
    pub has_varchar: bool,
    pub has_compressed_varchar: bool,
}

/// Field metadata decoded from the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    /// Declared width in bits
    pub size_bits: u32,
    pub field_type: FieldType,
}

impl FieldDescriptor {
    /// Bytes of text the field can hold
    pub fn text_capacity(&self) -> usize {
        (self.size_bits / 8) as usize
    }

    /// Size of the caller-owned buffer a text read needs, including the terminator
    pub fn text_buffer_len(&self) -> usize {
        self.text_capacity() + 1
    }
}

/// A table together with its ordered fields
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub descriptor: TableDescriptor,
    pub fields: Vec<FieldDescriptor>,
}

impl TableSchema {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Catalog of every readable table in an open roster file
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    tables: Vec<TableSchema>,
}

impl SchemaCatalog {
    /// Query the engine for every table descriptor, in engine order
    pub fn discover(engine: &dyn Engine, handle: EngineHandle) -> Result<Vec<TableDescriptor>> {
        let count = table_count(engine, handle)?;

        let mut tables = Vec::with_capacity(count as usize);
        for index in 0..count {
            tables.push(table_at(engine, handle, index)?);
        }

        debug!("Discovered {} tables", tables.len());
        Ok(tables)
    }

    /// Query the engine for a table's fields, in declaration order
    pub fn fields_of(
        engine: &dyn Engine,
        handle: EngineHandle,
        table: &TableDescriptor,
    ) -> Result<Vec<FieldDescriptor>> {
        let mut fields = Vec::with_capacity(table.field_count.max(0) as usize);

        for index in 0..table.field_count {
            let raw = engine
                .field_properties(handle, &table.name, index)
                .ok_or_else(|| RosterError::Schema {
                    table: table.name.clone(),
                    reason: format!("field property query failed for index {}", index),
                })?;
            fields.push(decode_field(&table.name, raw)?);
        }

        if fields.len() as i32 != table.field_count {
            return Err(RosterError::Schema {
                table: table.name.clone(),
                reason: format!(
                    "expected {} fields, engine returned {}",
                    table.field_count,
                    fields.len()
                ),
            });
        }

        Ok(fields)
    }

    /// Build the full catalog, skipping any table that cannot be read
    ///
    /// Only an unreadable table count fails the load; whether a particular
    /// table is required is up to the caller.
    pub fn load(engine: &dyn Engine, handle: EngineHandle) -> Result<Self> {
        let count = table_count(engine, handle)?;
        let mut tables = Vec::with_capacity(count as usize);

        for index in 0..count {
            let loaded = table_at(engine, handle, index).and_then(|descriptor| {
                let fields = Self::fields_of(engine, handle, &descriptor)?;
                Ok(TableSchema { descriptor, fields })
            });
            match loaded {
                Ok(table) => tables.push(table),
                Err(e) => warn!("Skipping table #{}: {}", index, e),
            }
        }

        debug!("Loaded {} of {} tables", tables.len(), count);
        Ok(Self { tables })
    }

    pub fn tables(&self) -> &[TableSchema] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Result<&TableSchema> {
        self.tables
            .iter()
            .find(|table| table.descriptor.name == name)
            .ok_or_else(|| RosterError::UnknownTable {
                table: name.to_string(),
            })
    }

    pub fn field(&self, table: &str, field: &str) -> Result<&FieldDescriptor> {
        self.table(table)?
            .field(field)
            .ok_or_else(|| RosterError::UnknownField {
                table: table.to_string(),
                field: field.to_string(),
            })
    }

    /// Human-readable listing of every table and field
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for table in &self.tables {
            let d = &table.descriptor;
            out.push_str(&format!(
                "{:<8} records {}/{} (deleted {}), {} fields\n",
                d.name, d.record_count, d.capacity, d.deleted_count, d.field_count
            ));
            for field in &table.fields {
                out.push_str(&format!(
                    "    {:<8} {:<12} {} bits\n",
                    field.name,
                    field.field_type.to_string(),
                    field.size_bits
                ));
            }
        }
        out
    }
}

fn table_count(engine: &dyn Engine, handle: EngineHandle) -> Result<i32> {
    let count = engine.table_count(handle);
    if count < 0 {
        return Err(RosterError::Schema {
            table: "*".to_string(),
            reason: format!("engine reported table count {}", count),
        });
    }
    Ok(count)
}

/// Descriptor for the table at `index`, checked for consistency
fn table_at(engine: &dyn Engine, handle: EngineHandle, index: i32) -> Result<TableDescriptor> {
    let descriptor = engine
        .table_properties(handle, index)
        .ok_or_else(|| RosterError::Schema {
            table: format!("#{}", index),
            reason: "table property query failed".to_string(),
        })?;
    validate_table(&descriptor)?;
    Ok(descriptor)
}

fn validate_table(descriptor: &TableDescriptor) -> Result<()> {
    check_identifier(&descriptor.name, &descriptor.name)?;

    if descriptor.record_count > descriptor.capacity {
        return Err(RosterError::Schema {
            table: descriptor.name.clone(),
            reason: format!(
                "record count {} exceeds capacity {}",
                descriptor.record_count, descriptor.capacity
            ),
        });
    }
    if descriptor.field_count < 0 {
        return Err(RosterError::Schema {
            table: descriptor.name.clone(),
            reason: format!("negative field count {}", descriptor.field_count),
        });
    }
    Ok(())
}

fn decode_field(table: &str, raw: RawField) -> Result<FieldDescriptor> {
    check_identifier(table, &raw.name)?;

    let field_type = FieldType::from_code(raw.type_code).ok_or_else(|| RosterError::Schema {
        table: table.to_string(),
        reason: format!("field {} has unknown type code {}", raw.name, raw.type_code),
    })?;

    Ok(FieldDescriptor {
        name: raw.name,
        size_bits: raw.size_bits,
        field_type,
    })
}

fn check_identifier(table: &str, name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_IDENTIFIER_LEN {
        return Err(RosterError::Schema {
            table: table.to_string(),
            reason: format!("invalid identifier {:?}", name),
        });
    }
    Ok(())
}
