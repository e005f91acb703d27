//! Typed field access over the engine boundary.
//!
//! Converts between the untyped strings coming out of the CSV and the typed
//! representations the engine stores, checking every call against the
//! field's declared type from the [`SchemaCatalog`]. Values are never cached
//! here; the engine is the only source of truth for stored data.

use crate::engine::{Engine, EngineHandle, text_from_buffer};
use crate::error::{RosterError, Result};
use crate::schema::{FieldDescriptor, FieldType, SchemaCatalog};
use std::fmt;
use tracing::{trace, warn};

/// A field value tagged with its encoding
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Text(String),
    SignedInt(i32),
    UnsignedInt(u32),
    Float(f32),
}

impl TypedValue {
    pub fn tag(&self) -> &'static str {
        match self {
            TypedValue::Text(_) => "text",
            TypedValue::SignedInt(_) => "signed int",
            TypedValue::UnsignedInt(_) => "unsigned int",
            TypedValue::Float(_) => "float",
        }
    }

    /// Whether this value may be stored in a field of the given type
    pub fn fits(&self, field_type: FieldType) -> bool {
        match self {
            TypedValue::Text(_) => field_type.is_text(),
            TypedValue::SignedInt(_) => field_type == FieldType::SignedInt,
            TypedValue::UnsignedInt(_) => field_type == FieldType::UnsignedInt,
            TypedValue::Float(_) => field_type == FieldType::Float,
        }
    }

    /// Parse a CSV string according to a field's declared type
    pub fn parse(table: &str, field: &FieldDescriptor, raw: &str) -> Result<Self> {
        let value = raw.trim();
        let invalid = |reason: &str| RosterError::InvalidValue {
            field: field.name.clone(),
            value: raw.to_string(),
            reason: reason.to_string(),
        };

        match field.field_type {
            FieldType::String | FieldType::Varchar => Ok(TypedValue::Text(value.to_string())),
            FieldType::SignedInt => {
                let parsed = parse_integer(value).ok_or_else(|| invalid("not an integer"))?;
                i32::try_from(parsed)
                    .map(TypedValue::SignedInt)
                    .map_err(|_| invalid("out of range for a signed 32-bit field"))
            }
            FieldType::UnsignedInt => {
                let parsed = parse_integer(value).ok_or_else(|| invalid("not an integer"))?;
                u32::try_from(parsed)
                    .map(TypedValue::UnsignedInt)
                    .map_err(|_| invalid("out of range for an unsigned 32-bit field"))
            }
            FieldType::Float => value
                .parse::<f32>()
                .ok()
                .filter(|parsed| parsed.is_finite())
                .map(TypedValue::Float)
                .ok_or_else(|| invalid("not a finite number")),
            FieldType::Binary => Err(RosterError::TypeMismatch {
                table: table.to_string(),
                field: field.name.clone(),
                declared: FieldType::Binary,
                supplied: "text",
            }),
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Text(text) => write!(f, "{:?}", text),
            TypedValue::SignedInt(value) => write!(f, "{}", value),
            TypedValue::UnsignedInt(value) => write!(f, "{}", value),
            TypedValue::Float(value) => write!(f, "{}", value),
        }
    }
}

/// Parse an integer, accepting integral decimals such as `72.0`
fn parse_integer(value: &str) -> Option<i64> {
    if let Ok(parsed) = value.parse::<i64>() {
        return Some(parsed);
    }
    let parsed = value.parse::<f64>().ok()?;
    if parsed.is_finite() && parsed.fract() == 0.0 && parsed.abs() < i64::MAX as f64 {
        Some(parsed as i64)
    } else {
        None
    }
}

/// Typed get/set calls against one open database
pub struct TypedFieldAccessor<'a> {
    engine: &'a mut dyn Engine,
    handle: EngineHandle,
    catalog: &'a SchemaCatalog,
    verify_writes: bool,
}

impl<'a> TypedFieldAccessor<'a> {
    pub fn new(engine: &'a mut dyn Engine, handle: EngineHandle, catalog: &'a SchemaCatalog) -> Self {
        Self {
            engine,
            handle,
            catalog,
            verify_writes: true,
        }
    }

    /// Enable or disable read-back verification after each write
    pub fn with_verification(mut self, verify_writes: bool) -> Self {
        self.verify_writes = verify_writes;
        self
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        self.catalog
    }

    /// Read a field value using the read call matching its declared type
    pub fn get(&self, table: &str, field: &str, record: i32) -> Result<TypedValue> {
        let descriptor = self.catalog.field(table, field)?;
        let failed = |operation| RosterError::FieldAccess {
            operation,
            table: table.to_string(),
            field: field.to_string(),
            record,
        };

        match descriptor.field_type {
            FieldType::String | FieldType::Varchar => {
                // Sized from the live descriptor; the engine writes into this buffer
                let mut buffer = vec![0u8; descriptor.text_buffer_len()];
                if !self
                    .engine
                    .get_text(self.handle, table, field, record, &mut buffer)
                {
                    return Err(failed("get_text"));
                }
                Ok(TypedValue::Text(text_from_buffer(&buffer)))
            }
            FieldType::SignedInt => self
                .engine
                .get_integer(self.handle, table, field, record)
                .map(TypedValue::SignedInt)
                .ok_or_else(|| failed("get_integer")),
            FieldType::UnsignedInt => self
                .engine
                .get_integer(self.handle, table, field, record)
                .map(|value| TypedValue::UnsignedInt(value as u32))
                .ok_or_else(|| failed("get_integer")),
            FieldType::Float => self
                .engine
                .get_float(self.handle, table, field, record)
                .map(TypedValue::Float)
                .ok_or_else(|| failed("get_float")),
            FieldType::Binary => Err(RosterError::TypeMismatch {
                table: table.to_string(),
                field: field.to_string(),
                declared: FieldType::Binary,
                supplied: "typed read",
            }),
        }
    }

    /// Write a value, then read it back when verification is enabled
    pub fn set(&mut self, table: &str, field: &str, record: i32, value: &TypedValue) -> Result<()> {
        let descriptor = self.catalog.field(table, field)?;
        if !value.fits(descriptor.field_type) {
            return Err(RosterError::TypeMismatch {
                table: table.to_string(),
                field: field.to_string(),
                declared: descriptor.field_type,
                supplied: value.tag(),
            });
        }

        let written = match value {
            TypedValue::Text(text) => {
                if text.len() > descriptor.text_capacity() {
                    warn!(
                        "{}.{} holds {} bytes, value {:?} is {} bytes",
                        table,
                        field,
                        descriptor.text_capacity(),
                        text,
                        text.len()
                    );
                }
                self.engine
                    .set_text(self.handle, table, field, record, text)
            }
            TypedValue::SignedInt(number) => {
                self.engine
                    .set_integer(self.handle, table, field, record, *number)
            }
            TypedValue::UnsignedInt(number) => {
                self.engine
                    .set_integer(self.handle, table, field, record, *number as i32)
            }
            TypedValue::Float(number) => {
                self.engine
                    .set_float(self.handle, table, field, record, *number)
            }
        };

        if !written {
            return Err(RosterError::FieldAccess {
                operation: "set",
                table: table.to_string(),
                field: field.to_string(),
                record,
            });
        }
        trace!("{}.{}[{}] = {}", table, field, record, value);

        if self.verify_writes {
            let read_back = self.get(table, field, record)?;
            if &read_back != value {
                return Err(RosterError::WriteVerification {
                    table: table.to_string(),
                    field: field.to_string(),
                    record,
                    written: value.to_string(),
                    read_back: read_back.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Parse a CSV string by the field's declared type and write it
    pub fn set_from_str(
        &mut self,
        table: &str,
        field: &str,
        record: i32,
        raw: &str,
    ) -> Result<TypedValue> {
        let descriptor = self.catalog.field(table, field)?;
        let value = TypedValue::parse(table, descriptor, raw)?;
        self.set(table, field, record, &value)?;
        Ok(value)
    }
}
