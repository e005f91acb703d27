//! Binding to the native `tdbaccess` library.
//!
//! Every call crosses the C ABI with NUL-terminated names. Text reads use a
//! caller-owned buffer; the library copies at most the field's size into it.
//! Table resizing has no native call and is done by adding or removing
//! records one at a time.

use super::{Engine, EngineHandle, RawField};
use crate::schema::TableDescriptor;
use std::ffi::{CStr, CString, c_char, c_int};
use std::path::Path;
use tracing::{debug, warn};

/// Longest table or field name plus terminator
const NAME_BUFFER_LEN: usize = 9;

#[repr(C)]
struct TdbTableProperties {
    name: *mut c_char,
    field_count: c_int,
    capacity: c_int,
    record_count: c_int,
    deleted_count: c_int,
    next_deleted_record: c_int,
    flag0: bool,
    flag1: bool,
    flag2: bool,
    flag3: bool,
    non_allocated: bool,
    has_varchar: bool,
    has_compressed_varchar: bool,
}

#[repr(C)]
struct TdbFieldProperties {
    name: *mut c_char,
    size: c_int,
    field_type: c_int,
}

#[link(name = "tdbaccess")]
unsafe extern "system" {
    fn TDBOpen(path: *const c_char) -> c_int;
    fn TDBClose(db: c_int) -> bool;
    fn TDBSave(db: c_int) -> bool;
    fn TDBDatabaseCompact(db: c_int) -> bool;
    fn TDBDatabaseGetTableCount(db: c_int) -> c_int;
    fn TDBTableGetProperties(db: c_int, index: c_int, props: *mut TdbTableProperties) -> bool;
    fn TDBFieldGetProperties(
        db: c_int,
        table: *const c_char,
        index: c_int,
        props: *mut TdbFieldProperties,
    ) -> bool;
    fn TDBFieldGetValueAsString(
        db: c_int,
        table: *const c_char,
        field: *const c_char,
        record: c_int,
        out: *mut *mut c_char,
    ) -> bool;
    fn TDBFieldGetValueAsInteger(
        db: c_int,
        table: *const c_char,
        field: *const c_char,
        record: c_int,
    ) -> c_int;
    fn TDBFieldGetValueAsFloat(
        db: c_int,
        table: *const c_char,
        field: *const c_char,
        record: c_int,
    ) -> f32;
    fn TDBFieldSetValueAsString(
        db: c_int,
        table: *const c_char,
        field: *const c_char,
        record: c_int,
        value: *const c_char,
    ) -> bool;
    fn TDBFieldSetValueAsInteger(
        db: c_int,
        table: *const c_char,
        field: *const c_char,
        record: c_int,
        value: c_int,
    ) -> bool;
    fn TDBFieldSetValueAsFloat(
        db: c_int,
        table: *const c_char,
        field: *const c_char,
        record: c_int,
        value: f32,
    ) -> bool;
    fn TDBTableRecordAdd(db: c_int, table: *const c_char, allow_expand: bool) -> c_int;
    fn TDBTableRecordRemove(db: c_int, table: *const c_char, record: c_int) -> bool;
}

/// The native engine
#[derive(Debug, Default)]
pub struct TdbLibrary {
    _private: (),
}

impl TdbLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    fn find_table(&self, handle: EngineHandle, name: &str) -> Option<TableDescriptor> {
        (0..self.table_count(handle))
            .filter_map(|index| self.table_properties(handle, index))
            .find(|table| table.name == name)
    }
}

fn c_string(value: &str) -> Option<CString> {
    match CString::new(value) {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("{:?} contains a NUL byte", value);
            None
        }
    }
}

fn name_from_buffer(buffer: &[u8; NAME_BUFFER_LEN]) -> String {
    CStr::from_bytes_until_nul(buffer)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl Engine for TdbLibrary {
    fn open(&mut self, path: &Path) -> EngineHandle {
        let Some(path_c) = path.to_str().and_then(c_string) else {
            return EngineHandle::INVALID;
        };
        // SAFETY: path_c is a valid NUL-terminated string for the call's duration
        let handle = unsafe { TDBOpen(path_c.as_ptr()) };
        debug!("TDBOpen({}) = {}", path.display(), handle);
        EngineHandle(handle)
    }

    fn table_count(&self, handle: EngineHandle) -> i32 {
        // SAFETY: plain integer call
        unsafe { TDBDatabaseGetTableCount(handle.0) }
    }

    fn table_properties(&self, handle: EngineHandle, index: i32) -> Option<TableDescriptor> {
        let mut name = [0u8; NAME_BUFFER_LEN];
        let mut props = TdbTableProperties {
            name: name.as_mut_ptr().cast(),
            field_count: 0,
            capacity: 0,
            record_count: 0,
            deleted_count: 0,
            next_deleted_record: 0,
            flag0: false,
            flag1: false,
            flag2: false,
            flag3: false,
            non_allocated: false,
            has_varchar: false,
            has_compressed_varchar: false,
        };
        // SAFETY: props.name points at a buffer large enough for any table name
        if !unsafe { TDBTableGetProperties(handle.0, index, &mut props) } {
            return None;
        }
        Some(TableDescriptor {
            name: name_from_buffer(&name),
            field_count: props.field_count,
            capacity: props.capacity,
            record_count: props.record_count,
            deleted_count: props.deleted_count,
            next_deleted_record: props.next_deleted_record,
            flag0: props.flag0,
            flag1: props.flag1,
            flag2: props.flag2,
            flag3: props.flag3,
            non_allocated: props.non_allocated,
            has_varchar: props.has_varchar,
            has_compressed_varchar: props.has_compressed_varchar,
        })
    }

    fn field_properties(&self, handle: EngineHandle, table: &str, index: i32) -> Option<RawField> {
        let table_c = c_string(table)?;
        let mut name = [0u8; NAME_BUFFER_LEN];
        let mut props = TdbFieldProperties {
            name: name.as_mut_ptr().cast(),
            size: 0,
            field_type: 0,
        };
        // SAFETY: both strings outlive the call; props.name has room for any field name
        if !unsafe { TDBFieldGetProperties(handle.0, table_c.as_ptr(), index, &mut props) } {
            return None;
        }
        Some(RawField {
            name: name_from_buffer(&name),
            size_bits: u32::try_from(props.size).ok()?,
            type_code: props.field_type,
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
        let (Some(table_c), Some(field_c)) = (c_string(table), c_string(field)) else {
            return false;
        };
        if buffer.is_empty() {
            return false;
        }
        let mut out: *mut c_char = buffer.as_mut_ptr().cast();
        // SAFETY: out points at buffer.len() writable bytes. This call cannot see the field's
        // width; the caller must size the buffer to the declared width plus a terminator.
        unsafe {
            TDBFieldGetValueAsString(handle.0, table_c.as_ptr(), field_c.as_ptr(), record, &mut out)
        }
    }

    fn get_integer(
        &self,
        handle: EngineHandle,
        table: &str,
        field: &str,
        record: i32,
    ) -> Option<i32> {
        let table_c = c_string(table)?;
        let field_c = c_string(field)?;
        // SAFETY: both strings outlive the call
        Some(unsafe {
            TDBFieldGetValueAsInteger(handle.0, table_c.as_ptr(), field_c.as_ptr(), record)
        })
    }

    fn get_float(
        &self,
        handle: EngineHandle,
        table: &str,
        field: &str,
        record: i32,
    ) -> Option<f32> {
        let table_c = c_string(table)?;
        let field_c = c_string(field)?;
        // SAFETY: both strings outlive the call
        Some(unsafe {
            TDBFieldGetValueAsFloat(handle.0, table_c.as_ptr(), field_c.as_ptr(), record)
        })
    }

    fn set_text(
        &mut self,
        handle: EngineHandle,
        table: &str,
        field: &str,
        record: i32,
        value: &str,
    ) -> bool {
        let (Some(table_c), Some(field_c), Some(value_c)) =
            (c_string(table), c_string(field), c_string(value))
        else {
            return false;
        };
        // SAFETY: all strings outlive the call
        unsafe {
            TDBFieldSetValueAsString(
                handle.0,
                table_c.as_ptr(),
                field_c.as_ptr(),
                record,
                value_c.as_ptr(),
            )
        }
    }

    fn set_integer(
        &mut self,
        handle: EngineHandle,
        table: &str,
        field: &str,
        record: i32,
        value: i32,
    ) -> bool {
        let (Some(table_c), Some(field_c)) = (c_string(table), c_string(field)) else {
            return false;
        };
        // SAFETY: both strings outlive the call
        unsafe {
            TDBFieldSetValueAsInteger(handle.0, table_c.as_ptr(), field_c.as_ptr(), record, value)
        }
    }

    fn set_float(
        &mut self,
        handle: EngineHandle,
        table: &str,
        field: &str,
        record: i32,
        value: f32,
    ) -> bool {
        let (Some(table_c), Some(field_c)) = (c_string(table), c_string(field)) else {
            return false;
        };
        // SAFETY: both strings outlive the call
        unsafe {
            TDBFieldSetValueAsFloat(handle.0, table_c.as_ptr(), field_c.as_ptr(), record, value)
        }
    }

    fn resize_table(&mut self, handle: EngineHandle, table: &str, capacity: i32) -> bool {
        let Some(table_c) = c_string(table) else {
            return false;
        };
        let Some(descriptor) = self.find_table(handle, table) else {
            warn!("Table {} not found for resize", table);
            return false;
        };

        let mut records = descriptor.record_count;
        while records > capacity {
            records -= 1;
            // SAFETY: table_c outlives the call
            if !unsafe { TDBTableRecordRemove(handle.0, table_c.as_ptr(), records) } {
                warn!("Removing {} record {} failed", table, records);
                return false;
            }
        }
        while records < capacity {
            // SAFETY: table_c outlives the call
            if unsafe { TDBTableRecordAdd(handle.0, table_c.as_ptr(), true) } < 0 {
                warn!("Adding {} record {} failed", table, records);
                return false;
            }
            records += 1;
        }
        true
    }

    fn compact(&mut self, handle: EngineHandle) -> bool {
        // SAFETY: plain integer call
        unsafe { TDBDatabaseCompact(handle.0) }
    }

    fn save(&mut self, handle: EngineHandle) -> bool {
        // SAFETY: plain integer call
        unsafe { TDBSave(handle.0) }
    }

    fn close(&mut self, handle: EngineHandle) -> bool {
        // SAFETY: plain integer call
        unsafe { TDBClose(handle.0) }
    }
}
