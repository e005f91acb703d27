//! In-process engine backed by a JSON roster file.
//!
//! Behaves like the native engine wherever the importer has to be careful:
//! fixed-width text is cut to the field size, integers are masked to the
//! field's bit width, text reads fill a caller-owned buffer, and an open file
//! stays locked until its handle is closed. Failure points can be injected to
//! exercise the importer's error paths.

use super::{Engine, EngineHandle, RawField};
use crate::error::Result;
use crate::schema::{FieldDescriptor, FieldType, TableDescriptor};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A single stored field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoredValue {
    Text(String),
    Integer(i32),
    Float(f32),
    Bytes(Vec<u8>),
}

impl StoredValue {
    fn default_for(field: &FieldDescriptor) -> Self {
        match field.field_type {
            FieldType::String | FieldType::Varchar => StoredValue::Text(String::new()),
            FieldType::SignedInt | FieldType::UnsignedInt => StoredValue::Integer(0),
            FieldType::Float => StoredValue::Float(0.0),
            FieldType::Binary => StoredValue::Bytes(vec![0; field.text_capacity()]),
        }
    }
}

/// A table with its field layout and records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryTable {
    pub name: String,
    pub capacity: i32,
    pub fields: Vec<FieldDescriptor>,
    #[serde(default)]
    pub records: Vec<Vec<StoredValue>>,
}

impl MemoryTable {
    pub fn new(name: impl Into<String>, capacity: i32) -> Self {
        Self {
            name: name.into(),
            capacity,
            fields: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Append a field; existing records receive the field's default value
    pub fn with_field(mut self, name: impl Into<String>, size_bits: u32, field_type: FieldType) -> Self {
        let field = FieldDescriptor {
            name: name.into(),
            size_bits,
            field_type,
        };
        for record in &mut self.records {
            record.push(StoredValue::default_for(&field));
        }
        self.fields.push(field);
        self
    }

    /// Allocate `count` default records
    pub fn with_records(mut self, count: usize) -> Self {
        self.resize(count);
        self.capacity = self.capacity.max(count as i32);
        self
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn value(&self, field: &str, record: usize) -> Option<&StoredValue> {
        let index = self.field_index(field)?;
        self.records.get(record)?.get(index)
    }

    fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    fn resize(&mut self, count: usize) {
        let fields = &self.fields;
        self.records.resize_with(count, || {
            fields.iter().map(StoredValue::default_for).collect()
        });
    }

    fn descriptor(&self) -> TableDescriptor {
        TableDescriptor {
            name: self.name.clone(),
            field_count: self.fields.len() as i32,
            capacity: self.capacity,
            record_count: self.records.len() as i32,
            deleted_count: 0,
            next_deleted_record: -1,
            flag0: false,
            flag1: false,
            flag2: false,
            flag3: false,
            non_allocated: false,
            has_varchar: self
                .fields
                .iter()
                .any(|field| field.field_type == FieldType::Varchar),
            has_compressed_varchar: false,
        }
    }
}

/// Contents of one roster file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryDatabase {
    pub tables: Vec<MemoryTable>,
}

impl MemoryDatabase {
    pub fn new(tables: Vec<MemoryTable>) -> Self {
        Self { tables }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn table(&self, name: &str) -> Option<&MemoryTable> {
        self.tables.iter().find(|table| table.name == name)
    }

    fn table_mut(&mut self, name: &str) -> Option<&mut MemoryTable> {
        self.tables.iter_mut().find(|table| table.name == name)
    }
}

/// Engine operations that can be made to fail
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Open,
    TableProperties,
    /// Field property queries for the named table
    FieldProperties(String),
    Resize,
    Compact,
    Save,
    Close,
    /// Writes to the named field report failure
    Set(String),
    /// Writes to the named field report success but store a different value
    CorruptWrite(String),
}

/// Number of field reads and writes the engine has served
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub gets: usize,
    pub sets: usize,
}

#[derive(Debug)]
struct OpenDatabase {
    path: PathBuf,
    database: MemoryDatabase,
    on_disk: bool,
}

/// In-process engine implementation
#[derive(Debug, Default)]
pub struct MemoryEngine {
    stored: HashMap<PathBuf, MemoryDatabase>,
    open: HashMap<i32, OpenDatabase>,
    next_handle: i32,
    fail_points: HashSet<FailPoint>,
    gets: Cell<usize>,
    sets: usize,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a roster file that exists only in memory
    pub fn insert_database(&mut self, path: impl Into<PathBuf>, tables: Vec<MemoryTable>) {
        self.stored.insert(path.into(), MemoryDatabase::new(tables));
    }

    /// Last saved state of a roster file held in memory
    pub fn database(&self, path: impl AsRef<Path>) -> Option<&MemoryDatabase> {
        self.stored.get(path.as_ref())
    }

    /// Unsaved state of an open database
    pub fn open_database(&self, handle: EngineHandle) -> Option<&MemoryDatabase> {
        self.open.get(&handle.0).map(|open| &open.database)
    }

    pub fn open_handles(&self) -> usize {
        self.open.len()
    }

    pub fn fail_on(&mut self, point: FailPoint) {
        self.fail_points.insert(point);
    }

    pub fn call_counts(&self) -> CallCounts {
        CallCounts {
            gets: self.gets.get(),
            sets: self.sets,
        }
    }

    fn fails(&self, point: &FailPoint) -> bool {
        self.fail_points.contains(point)
    }

    fn table(&self, handle: EngineHandle, table: &str) -> Option<&MemoryTable> {
        self.open.get(&handle.0)?.database.table(table)
    }

    /// Locate a field's descriptor and stored value for a read
    fn read(
        &self,
        handle: EngineHandle,
        table: &str,
        field: &str,
        record: i32,
    ) -> Option<(&FieldDescriptor, &StoredValue)> {
        self.gets.set(self.gets.get() + 1);
        let table = self.table(handle, table)?;
        let index = table.field_index(field)?;
        let value = table.records.get(usize::try_from(record).ok()?)?.get(index)?;
        Some((&table.fields[index], value))
    }

    /// Store a value after checking the field accepts it
    fn write(
        &mut self,
        handle: EngineHandle,
        table: &str,
        field: &str,
        record: i32,
        encode: impl FnOnce(&FieldDescriptor) -> Option<StoredValue>,
    ) -> bool {
        self.sets += 1;
        if self.fails(&FailPoint::Set(field.to_string())) {
            return false;
        }
        let corrupt = self.fails(&FailPoint::CorruptWrite(field.to_string()));

        let Some(open) = self.open.get_mut(&handle.0) else {
            return false;
        };
        let Some(table) = open.database.table_mut(table) else {
            return false;
        };
        let Some(index) = table.field_index(field) else {
            return false;
        };
        let Some(slot) = usize::try_from(record)
            .ok()
            .and_then(|record| table.records.get_mut(record))
        else {
            return false;
        };

        match encode(&table.fields[index]) {
            Some(value) => {
                slot[index] = if corrupt { corrupted(value) } else { value };
                true
            }
            None => false,
        }
    }
}

impl Engine for MemoryEngine {
    fn open(&mut self, path: &Path) -> EngineHandle {
        if self.fails(&FailPoint::Open) {
            return EngineHandle::INVALID;
        }
        if self.open.values().any(|open| open.path == path) {
            warn!("{} is already open", path.display());
            return EngineHandle::INVALID;
        }

        let (database, on_disk) = match self.stored.get(path) {
            Some(database) => (database.clone(), false),
            None => match MemoryDatabase::load(path) {
                Ok(database) => (database, true),
                Err(e) => {
                    debug!("Cannot load {}: {}", path.display(), e);
                    return EngineHandle::INVALID;
                }
            },
        };

        let handle = self.next_handle;
        self.next_handle += 1;
        self.open.insert(
            handle,
            OpenDatabase {
                path: path.to_path_buf(),
                database,
                on_disk,
            },
        );
        EngineHandle(handle)
    }

    fn table_count(&self, handle: EngineHandle) -> i32 {
        self.open
            .get(&handle.0)
            .map_or(-1, |open| open.database.tables.len() as i32)
    }

    fn table_properties(&self, handle: EngineHandle, index: i32) -> Option<TableDescriptor> {
        if self.fails(&FailPoint::TableProperties) {
            return None;
        }
        let open = self.open.get(&handle.0)?;
        let table = open.database.tables.get(usize::try_from(index).ok()?)?;
        Some(table.descriptor())
    }

    fn field_properties(&self, handle: EngineHandle, table: &str, index: i32) -> Option<RawField> {
        if self.fails(&FailPoint::FieldProperties(table.to_string())) {
            return None;
        }
        let field = self
            .table(handle, table)?
            .fields
            .get(usize::try_from(index).ok()?)?;
        Some(RawField {
            name: field.name.clone(),
            size_bits: field.size_bits,
            type_code: field.field_type.code(),
        })
    }

    fn get_text(
        &self,
        handle: EngineHandle,
        table: &str,
        field: &str,
        record: i32,
        buffer: &mut [u8],
    ) -> bool {
        let Some((_, StoredValue::Text(text))) = self.read(handle, table, field, record) else {
            return false;
        };
        if buffer.is_empty() {
            return false;
        }

        let bytes = text.as_bytes();
        let len = bytes.len().min(buffer.len() - 1);
        buffer[..len].copy_from_slice(&bytes[..len]);
        buffer[len] = 0;
        true
    }

    fn get_integer(
        &self,
        handle: EngineHandle,
        table: &str,
        field: &str,
        record: i32,
    ) -> Option<i32> {
        match self.read(handle, table, field, record)? {
            (_, StoredValue::Integer(value)) => Some(*value),
            _ => None,
        }
    }

    fn get_float(
        &self,
        handle: EngineHandle,
        table: &str,
        field: &str,
        record: i32,
    ) -> Option<f32> {
        match self.read(handle, table, field, record)? {
            (_, StoredValue::Float(value)) => Some(*value),
            _ => None,
        }
    }

    fn set_text(
        &mut self,
        handle: EngineHandle,
        table: &str,
        field: &str,
        record: i32,
        value: &str,
    ) -> bool {
        self.write(handle, table, field, record, |descriptor| {
            descriptor
                .field_type
                .is_text()
                .then(|| StoredValue::Text(fit_text(value, descriptor.text_capacity())))
        })
    }

    fn set_integer(
        &mut self,
        handle: EngineHandle,
        table: &str,
        field: &str,
        record: i32,
        value: i32,
    ) -> bool {
        self.write(handle, table, field, record, |descriptor| {
            matches!(
                descriptor.field_type,
                FieldType::SignedInt | FieldType::UnsignedInt
            )
            .then(|| StoredValue::Integer(fit_integer(descriptor, value)))
        })
    }

    fn set_float(
        &mut self,
        handle: EngineHandle,
        table: &str,
        field: &str,
        record: i32,
        value: f32,
    ) -> bool {
        self.write(handle, table, field, record, |descriptor| {
            (descriptor.field_type == FieldType::Float).then_some(StoredValue::Float(value))
        })
    }

    fn resize_table(&mut self, handle: EngineHandle, table: &str, capacity: i32) -> bool {
        if self.fails(&FailPoint::Resize) || capacity < 0 {
            return false;
        }
        let Some(table) = self
            .open
            .get_mut(&handle.0)
            .and_then(|open| open.database.table_mut(table))
        else {
            return false;
        };

        table.resize(capacity as usize);
        table.capacity = table.capacity.max(capacity);
        true
    }

    fn compact(&mut self, handle: EngineHandle) -> bool {
        if self.fails(&FailPoint::Compact) {
            return false;
        }
        let Some(open) = self.open.get_mut(&handle.0) else {
            return false;
        };
        for table in &mut open.database.tables {
            table.capacity = table.records.len() as i32;
        }
        true
    }

    fn save(&mut self, handle: EngineHandle) -> bool {
        if self.fails(&FailPoint::Save) {
            return false;
        }
        let Some(open) = self.open.get(&handle.0) else {
            return false;
        };

        if open.on_disk {
            if let Err(e) = open.database.write(&open.path) {
                warn!("Failed to write {}: {}", open.path.display(), e);
                return false;
            }
        } else {
            self.stored.insert(open.path.clone(), open.database.clone());
        }
        true
    }

    fn close(&mut self, handle: EngineHandle) -> bool {
        if self.fails(&FailPoint::Close) {
            return false;
        }
        self.open.remove(&handle.0).is_some()
    }
}

/// Cut text to the field's byte capacity without splitting a character
fn fit_text(value: &str, capacity: usize) -> String {
    if value.len() <= capacity {
        return value.to_string();
    }
    let mut end = capacity;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

/// Mask an integer to the field's declared bit width
fn fit_integer(field: &FieldDescriptor, value: i32) -> i32 {
    let bits = field.size_bits;
    if bits == 0 || bits >= 32 {
        return value;
    }
    match field.field_type {
        FieldType::UnsignedInt => ((value as u32) & ((1u32 << bits) - 1)) as i32,
        _ => {
            let shift = 32 - bits;
            (value << shift) >> shift
        }
    }
}

fn corrupted(value: StoredValue) -> StoredValue {
    match value {
        StoredValue::Text(text) => StoredValue::Text(text.chars().rev().collect()),
        StoredValue::Integer(value) => StoredValue::Integer(value ^ 1),
        StoredValue::Float(value) => StoredValue::Float(value + 1.0),
        StoredValue::Bytes(bytes) => StoredValue::Bytes(bytes),
    }
}
