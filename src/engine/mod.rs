//! Boundary to the external database engine.
//!
//! The importer only ever talks to the engine through the [`Engine`] trait,
//! which mirrors the capability set the native library exposes. Concrete
//! bindings live in submodules:
//! - [`memory`] - in-process engine backed by a JSON roster file
//! - `tdb` - foreign-function binding to the native `tdbaccess` library
//!   (requires the `tdbaccess` feature)

pub mod memory;
#[cfg(feature = "tdbaccess")]
pub mod tdb;

use crate::constants::INVALID_HANDLE;
use crate::schema::TableDescriptor;
use std::fmt;
use std::path::Path;

/// Index of an open database inside the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineHandle(pub i32);

impl EngineHandle {
    pub const INVALID: EngineHandle = EngineHandle(INVALID_HANDLE);

    pub fn is_valid(&self) -> bool {
        self.0 >= 0
    }
}

impl fmt::Display for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "db#{}", self.0)
    }
}

/// Field properties exactly as the engine reports them, before decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawField {
    pub name: String,
    pub size_bits: u32,
    pub type_code: i32,
}

/// Capability set of the external engine
///
/// Calls are synchronous and report failure the way the native library does:
/// an invalid handle, a `false` success flag, or no value. Typed error
/// reporting is layered on top by [`crate::accessor::TypedFieldAccessor`].
pub trait Engine {
    /// Open a roster file, returning [`EngineHandle::INVALID`] on failure
    fn open(&mut self, path: &Path) -> EngineHandle;

    /// Number of tables in the database, negative on failure
    fn table_count(&self, handle: EngineHandle) -> i32;

    fn table_properties(&self, handle: EngineHandle, index: i32) -> Option<TableDescriptor>;

    fn field_properties(&self, handle: EngineHandle, table: &str, index: i32) -> Option<RawField>;

    /// Copy a text value into a caller-owned, NUL-terminated buffer
    ///
    /// The engine writes at most `buffer.len() - 1` bytes; a buffer that is
    /// too small silently truncates the value.
    fn get_text(
        &self,
        handle: EngineHandle,
        table: &str,
        field: &str,
        record: i32,
        buffer: &mut [u8],
    ) -> bool;

    fn get_integer(&self, handle: EngineHandle, table: &str, field: &str, record: i32)
    -> Option<i32>;

    fn get_float(&self, handle: EngineHandle, table: &str, field: &str, record: i32)
    -> Option<f32>;

    fn set_text(
        &mut self,
        handle: EngineHandle,
        table: &str,
        field: &str,
        record: i32,
        value: &str,
    ) -> bool;

    fn set_integer(
        &mut self,
        handle: EngineHandle,
        table: &str,
        field: &str,
        record: i32,
        value: i32,
    ) -> bool;

    fn set_float(
        &mut self,
        handle: EngineHandle,
        table: &str,
        field: &str,
        record: i32,
        value: f32,
    ) -> bool;

    /// Allocate records so the table holds exactly `capacity` of them
    fn resize_table(&mut self, handle: EngineHandle, table: &str, capacity: i32) -> bool;

    fn compact(&mut self, handle: EngineHandle) -> bool;

    fn save(&mut self, handle: EngineHandle) -> bool;

    fn close(&mut self, handle: EngineHandle) -> bool;
}

/// Forward every engine call through a pointer type
macro_rules! forward_engine {
    ($($pointer:ty),*) => {$(
        impl<E: Engine + ?Sized> Engine for $pointer {
            fn open(&mut self, path: &Path) -> EngineHandle {
                (**self).open(path)
            }

            fn table_count(&self, handle: EngineHandle) -> i32 {
                (**self).table_count(handle)
            }

            fn table_properties(&self, handle: EngineHandle, index: i32) -> Option<TableDescriptor> {
                (**self).table_properties(handle, index)
            }

            fn field_properties(&self, handle: EngineHandle, table: &str, index: i32) -> Option<RawField> {
                (**self).field_properties(handle, table, index)
            }

            fn get_text(
                &self,
                handle: EngineHandle,
                table: &str,
                field: &str,
                record: i32,
                buffer: &mut [u8],
            ) -> bool {
                (**self).get_text(handle, table, field, record, buffer)
            }

            fn get_integer(
                &self,
                handle: EngineHandle,
                table: &str,
                field: &str,
                record: i32,
            ) -> Option<i32> {
                (**self).get_integer(handle, table, field, record)
            }

            fn get_float(
                &self,
                handle: EngineHandle,
                table: &str,
                field: &str,
                record: i32,
            ) -> Option<f32> {
                (**self).get_float(handle, table, field, record)
            }

            fn set_text(
                &mut self,
                handle: EngineHandle,
                table: &str,
                field: &str,
                record: i32,
                value: &str,
            ) -> bool {
                (**self).set_text(handle, table, field, record, value)
            }

            fn set_integer(
                &mut self,
                handle: EngineHandle,
                table: &str,
                field: &str,
                record: i32,
                value: i32,
            ) -> bool {
                (**self).set_integer(handle, table, field, record, value)
            }

            fn set_float(
                &mut self,
                handle: EngineHandle,
                table: &str,
                field: &str,
                record: i32,
                value: f32,
            ) -> bool {
                (**self).set_float(handle, table, field, record, value)
            }

            fn resize_table(&mut self, handle: EngineHandle, table: &str, capacity: i32) -> bool {
                (**self).resize_table(handle, table, capacity)
            }

            fn compact(&mut self, handle: EngineHandle) -> bool {
                (**self).compact(handle)
            }

            fn save(&mut self, handle: EngineHandle) -> bool {
                (**self).save(handle)
            }

            fn close(&mut self, handle: EngineHandle) -> bool {
                (**self).close(handle)
            }
        }
    )*};
}

forward_engine!(Box<E>, &mut E);

/// Read a NUL-terminated byte buffer filled by the engine
pub fn text_from_buffer(buffer: &[u8]) -> String {
    let end = buffer.iter().position(|b| *b == 0).unwrap_or(buffer.len());
    String::from_utf8_lossy(&buffer[..end]).into_owned()
}
