//! Integration tests for the import pipeline
//!
//! These tests run the full CSV -> session -> roster file workflow against
//! JSON roster files on disk, the way the `roster-import` binary does.

use roster_import::engine::memory::{MemoryDatabase, MemoryTable, StoredValue};
use roster_import::input::read_players;
use roster_import::{
    Engine, FieldType, ImportConfig, ImportSession, MemoryEngine, RosterError, SchemaCatalog,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const PLAYERS_CSV: &str = "\
first_name,last_name,position,team,jersey_number,height,weight,age,years_pro,draft_round,draft_pick,overall,speed,throw_power,catching,tackle,kick_power,kick_accuracy
Josh,Allen,QB,BUF,17,6-5,237,28,7,1,7,91,80,99,,,,
Mitch,Trubisky,QB,BUF,,6-3,219,30,8,,,70,72,88,,,,
James,Cook,HB,BUF,4,71,190,25,3,2,63,82,93,,70,,,
Tyler,Bass,K,BUF,2,70,183,27,5,5,185,78,,,,,92,88
Pat,McAfee,KR,IND,,,,,,,,,,,,,,
Von,Miller,ROLB,BUF,40,75,250,35,14,1,2,80,78,,40,85,,
";

/// Player table with the fields the CSV above touches
fn player_table() -> MemoryTable {
    let mut table = MemoryTable::new("PLAY", 0)
        .with_field("PFNA", 96, FieldType::String)
        .with_field("PLNA", 96, FieldType::String)
        .with_field("PPOS", 5, FieldType::UnsignedInt)
        .with_field("TGID", 10, FieldType::UnsignedInt)
        .with_field("PJEN", 7, FieldType::UnsignedInt)
        .with_field("PHGT", 7, FieldType::UnsignedInt)
        .with_field("PWGT", 8, FieldType::UnsignedInt)
        .with_field("PAGE", 6, FieldType::UnsignedInt)
        .with_field("PYRP", 5, FieldType::UnsignedInt)
        .with_field("PDRO", 4, FieldType::UnsignedInt)
        .with_field("PDPI", 8, FieldType::UnsignedInt);
    for rating in [
        "POVR", "PSPD", "PSTR", "PAWR", "PAGI", "PACC", "PSTA", "PINJ", "PTGH", "PTHP", "PTHA",
        "PCAR", "PBTK", "PCTH", "PJMP", "PKRT", "PRBK", "PPBK", "PTAK", "PKPR", "PKAC",
    ] {
        table = table.with_field(rating, 7, FieldType::UnsignedInt);
    }
    table
}

/// Write a roster file and the players CSV into a temp directory
fn setup_files(csv: &str) -> (TempDir, PathBuf, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let roster = temp_dir.path().join("roster.json");
    let players = temp_dir.path().join("players.csv");

    MemoryDatabase::new(vec![player_table()])
        .write(&roster)
        .unwrap();
    fs::write(&players, csv).unwrap();

    (temp_dir, roster, players)
}

fn config() -> ImportConfig {
    ImportConfig::default().with_jersey_seed(1).without_progress()
}

fn value(database: &MemoryDatabase, field: &str, record: usize) -> StoredValue {
    database
        .table("PLAY")
        .unwrap()
        .value(field, record)
        .unwrap()
        .clone()
}

#[test]
fn test_import_writes_roster_file() {
    let (_temp_dir, roster, players) = setup_files(PLAYERS_CSV);
    let rows = read_players(&players).unwrap();
    assert_eq!(rows.len(), 6);

    let mut session = ImportSession::new(MemoryEngine::new(), config());
    let report = session.run(&roster, &rows).unwrap();

    assert_eq!(report.rows_read, 6);
    assert_eq!(report.rows_imported, 5);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].row, 4);
    assert!(report.verification_failures.is_empty());
    assert!(report.finalize.is_some_and(|outcome| outcome.is_clean()));
    assert!(!report.is_clean());

    let saved = MemoryDatabase::load(&roster).unwrap();
    assert_eq!(saved.table("PLAY").unwrap().record_count(), 5);

    // Allen keeps 17, Trubisky gets the first free QB number
    assert_eq!(value(&saved, "PJEN", 0), StoredValue::Integer(17));
    assert_eq!(value(&saved, "PJEN", 1), StoredValue::Integer(1));
    // Undrafted defaults only when the round is blank
    assert_eq!(value(&saved, "PDRO", 1), StoredValue::Integer(15));
    assert_eq!(value(&saved, "PDPI", 1), StoredValue::Integer(63));
    assert_eq!(value(&saved, "PDRO", 2), StoredValue::Integer(2));
    // Height in inches, weight less the offset
    assert_eq!(value(&saved, "PHGT", 1), StoredValue::Integer(75));
    assert_eq!(value(&saved, "PWGT", 0), StoredValue::Integer(77));
    // Kicker ratings are written for kickers only
    assert_eq!(value(&saved, "PKPR", 3), StoredValue::Integer(92));
    assert_eq!(value(&saved, "PKPR", 0), StoredValue::Integer(0));
    // The skipped kick returner does not shift later records
    assert_eq!(
        value(&saved, "PLNA", 4),
        StoredValue::Text("Miller".to_string())
    );
    assert_eq!(value(&saved, "PPOS", 4), StoredValue::Integer(15));
}

#[test]
fn test_reimport_replaces_previous_roster() {
    let (_temp_dir, roster, players) = setup_files(PLAYERS_CSV);
    let rows = read_players(&players).unwrap();

    let mut engine = MemoryEngine::new();
    ImportSession::new(&mut engine, config())
        .run(&roster, &rows)
        .unwrap();

    let fewer = &rows[..2];
    ImportSession::new(&mut engine, config())
        .run(&roster, fewer)
        .unwrap();

    let saved = MemoryDatabase::load(&roster).unwrap();
    assert_eq!(saved.table("PLAY").unwrap().record_count(), 2);
    assert_eq!(engine.open_handles(), 0);
}

#[test]
fn test_report_json_written() {
    let (temp_dir, roster, players) = setup_files(PLAYERS_CSV);
    let rows = read_players(&players).unwrap();

    let mut session = ImportSession::new(MemoryEngine::new(), config());
    let report = session.run(&roster, &rows).unwrap();

    let report_path = temp_dir.path().join("reports").join("import.json");
    report.write_json(&report_path).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(json["rows_imported"], 5);
    assert_eq!(json["skipped"][0]["player"], "Pat McAfee");
    assert_eq!(json["finalize"]["saved"], true);
}

#[test]
fn test_roster_without_player_table_is_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let roster = temp_dir.path().join("roster.json");
    let empty = MemoryDatabase::new(vec![MemoryTable::new("TEAM", 0)]);
    empty.write(&roster).unwrap();
    let before = fs::read_to_string(&roster).unwrap();

    let mut session = ImportSession::new(MemoryEngine::new(), config());
    let rows = roster_import::input::read_players_from(PLAYERS_CSV.as_bytes()).unwrap();
    let result = session.run(&roster, &rows);

    assert!(matches!(result, Err(RosterError::Schema { .. })));
    assert_eq!(fs::read_to_string(&roster).unwrap(), before);
}

#[test]
fn test_custom_player_table_name() {
    let temp_dir = TempDir::new().unwrap();
    let roster = temp_dir.path().join("roster.json");
    let mut table = player_table();
    table.name = "PLYR".to_string();
    MemoryDatabase::new(vec![table]).write(&roster).unwrap();

    let rows = roster_import::input::read_players_from(PLAYERS_CSV.as_bytes()).unwrap();
    let mut session = ImportSession::new(MemoryEngine::new(), config().with_player_table("PLYR"));
    let report = session.run(&roster, &rows).unwrap();
    assert_eq!(report.rows_imported, 5);
}

#[test]
fn test_catalog_describes_roster_file() {
    let (_temp_dir, roster, _players) = setup_files(PLAYERS_CSV);

    let mut engine = MemoryEngine::new();
    let handle = engine.open(Path::new(&roster));
    let catalog = SchemaCatalog::load(&engine, handle).unwrap();
    assert!(engine.close(handle));

    let description = catalog.describe();
    assert!(description.starts_with("PLAY"));
    assert!(description.contains("PKAC"));
    assert_eq!(catalog.table("PLAY").unwrap().fields.len(), 32);
}
