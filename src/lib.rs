//! Roster Import Library
//!
//! Imports scraped player attribute records into a fixed-schema roster
//! database reached through an external engine.
//!
//! This library provides tools for:
//! - Discovering table and field metadata from the engine at session start
//! - Typed get/set of field values, checked against each field's declared type
//! - Building one player record per CSV row from a position-specific recipe
//! - Allocating collision-free jersey numbers per team
//! - Running an import session that always releases the roster file

pub mod accessor;
pub mod builder;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod input;
pub mod jersey;
pub mod models;
pub mod schema;
pub mod session;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;

    pub use args::{Args, Commands, EngineKind};
}

// Re-export commonly used types
pub use accessor::{TypedFieldAccessor, TypedValue};
pub use builder::{PositionRegistry, RecordBuilder};
pub use config::ImportConfig;
pub use engine::memory::MemoryEngine;
pub use engine::{Engine, EngineHandle};
pub use error::{Result, RosterError};
pub use jersey::{AllocationState, JerseyNumberAllocator};
pub use models::{ImportReport, PlayerRow};
pub use schema::{FieldType, SchemaCatalog};
pub use session::{ImportSession, SessionState};
