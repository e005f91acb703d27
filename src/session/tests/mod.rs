//! Scenario tests for the import session
//!
//! Sessions run against an in-memory roster with the standard player table
//! layout.

pub mod failures;

use crate::config::ImportConfig;
use crate::constants::fields;
use crate::engine::memory::{MemoryEngine, MemoryTable, StoredValue};
use crate::models::PlayerRow;
use crate::schema::FieldType;

pub const ROSTER: &str = "roster.db";

/// Standard player table layout with `records` existing records
pub fn player_table(records: usize) -> MemoryTable {
    let mut table = MemoryTable::new("PLAY", records as i32)
        .with_field(fields::FIRST_NAME, 96, FieldType::String)
        .with_field(fields::LAST_NAME, 96, FieldType::String)
        .with_field(fields::POSITION, 5, FieldType::UnsignedInt)
        .with_field(fields::TEAM_ID, 10, FieldType::UnsignedInt)
        .with_field(fields::JERSEY_NUMBER, 7, FieldType::UnsignedInt)
        .with_field(fields::HEIGHT, 7, FieldType::UnsignedInt)
        .with_field(fields::WEIGHT, 8, FieldType::UnsignedInt)
        .with_field(fields::AGE, 6, FieldType::UnsignedInt)
        .with_field(fields::YEARS_PRO, 5, FieldType::UnsignedInt)
        .with_field(fields::DRAFT_ROUND, 4, FieldType::UnsignedInt)
        .with_field(fields::DRAFT_PICK, 6, FieldType::UnsignedInt);

    for rating in [
        fields::OVERALL,
        fields::SPEED,
        fields::STRENGTH,
        fields::AWARENESS,
        fields::AGILITY,
        fields::ACCELERATION,
        fields::STAMINA,
        fields::INJURY,
        fields::TOUGHNESS,
        fields::THROW_POWER,
        fields::THROW_ACCURACY,
        fields::CARRYING,
        fields::BREAK_TACKLE,
        fields::CATCHING,
        fields::JUMPING,
        fields::KICK_RETURN,
        fields::RUN_BLOCKING,
        fields::PASS_BLOCKING,
        fields::TACKLE,
        fields::KICK_POWER,
        fields::KICK_ACCURACY,
    ] {
        table = table.with_field(rating, 7, FieldType::UnsignedInt);
    }

    table.with_records(records)
}

/// Team table carried by real roster files; the importer never writes it
pub fn team_table() -> MemoryTable {
    MemoryTable::new("TEAM", 32)
        .with_field("TDNA", 128, FieldType::String)
        .with_field("TGID", 10, FieldType::UnsignedInt)
        .with_records(32)
}

/// Engine holding one roster file with a team table and an empty player table
pub fn engine_with_roster() -> MemoryEngine {
    let mut engine = MemoryEngine::new();
    engine.insert_database(ROSTER, vec![team_table(), player_table(0)]);
    engine
}

pub fn quiet_config() -> ImportConfig {
    ImportConfig::default()
        .with_jersey_seed(2024)
        .without_progress()
}

pub fn player(first: &str, last: &str, position: &str, team: &str) -> PlayerRow {
    PlayerRow::new()
        .with("first_name", first)
        .with("last_name", last)
        .with("position", position)
        .with("team", team)
        .with("height", "74")
        .with("weight", "220")
        .with("age", "26")
        .with("overall", "80")
}

/// Integer stored in the last saved state of the roster
pub fn saved_integer(engine: &MemoryEngine, field: &str, record: usize) -> Option<i32> {
    match engine.database(ROSTER)?.table("PLAY")?.value(field, record)? {
        StoredValue::Integer(value) => Some(*value),
        _ => None,
    }
}

pub fn saved_text(engine: &MemoryEngine, field: &str, record: usize) -> Option<String> {
    match engine.database(ROSTER)?.table("PLAY")?.value(field, record)? {
        StoredValue::Text(value) => Some(value.clone()),
        _ => None,
    }
}

pub fn saved_record_count(engine: &MemoryEngine) -> usize {
    engine
        .database(ROSTER)
        .and_then(|database| database.table("PLAY"))
        .map_or(0, |table| table.record_count())
}
