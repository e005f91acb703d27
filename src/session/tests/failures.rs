//! Session and row failure handling tests

use super::*;
use crate::engine::memory::FailPoint;
use crate::error::{FinalizeStep, RosterError};
use crate::session::{ImportSession, SessionState};
use std::path::Path;

#[test]
fn test_open_failure_leaves_nothing_to_close() {
    let mut engine = engine_with_roster();
    engine.fail_on(FailPoint::Open);

    let mut session = ImportSession::new(&mut engine, quiet_config());
    let result = session.open(Path::new(ROSTER));

    match result {
        Err(RosterError::SessionOpen { path }) => assert_eq!(path, Path::new(ROSTER)),
        other => panic!("Expected SessionOpen, got {:?}", other),
    }
    assert_eq!(session.state(), SessionState::Failed);
}

#[test]
fn test_unknown_roster_path_fails_to_open() {
    let mut engine = MemoryEngine::new();
    let mut session = ImportSession::new(&mut engine, quiet_config());

    let result = session.run(Path::new("/nonexistent/roster.json"), &[]);
    assert!(matches!(result, Err(RosterError::SessionOpen { .. })));
}

#[test]
fn test_missing_player_table_is_fatal_and_closes() {
    let mut engine = MemoryEngine::new();
    engine.insert_database(ROSTER, vec![team_table()]);
    {
        let mut session = ImportSession::new(&mut engine, quiet_config());
        let result = session.open(Path::new(ROSTER));
        assert!(matches!(result, Err(RosterError::Schema { .. })));
        assert_eq!(session.state(), SessionState::Failed);
    }
    assert_eq!(engine.open_handles(), 0);
}

#[test]
fn test_unreadable_player_fields_are_fatal() {
    let mut engine = engine_with_roster();
    engine.fail_on(FailPoint::FieldProperties("PLAY".to_string()));
    {
        let mut session = ImportSession::new(&mut engine, quiet_config());
        let result = session.open(Path::new(ROSTER));
        assert!(matches!(result, Err(RosterError::Schema { table, .. }) if table == "PLAY"));
    }
    assert_eq!(engine.open_handles(), 0);
}

#[test]
fn test_unreadable_other_table_is_tolerated() {
    let mut engine = engine_with_roster();
    engine.fail_on(FailPoint::FieldProperties("TEAM".to_string()));

    let mut session = ImportSession::new(&mut engine, quiet_config());
    session.open(Path::new(ROSTER)).unwrap();
    let catalog = session.catalog().unwrap();
    assert_eq!(catalog.tables().len(), 1);
    assert!(catalog.table("TEAM").is_err());
}

#[test]
fn test_inconsistent_other_table_is_tolerated() {
    let mut team = team_table();
    team.capacity = 1;
    let mut engine = MemoryEngine::new();
    engine.insert_database(ROSTER, vec![team, player_table(0)]);
    let rows = vec![player("Josh", "Allen", "QB", "BUF")];

    let report = {
        let mut session = ImportSession::new(&mut engine, quiet_config());
        let report = session.run(Path::new(ROSTER), &rows).unwrap();
        assert!(session.catalog().unwrap().table("TEAM").is_err());
        report
    };

    assert_eq!(report.rows_imported, 1);
    assert_eq!(saved_record_count(&engine), 1);
}

#[test]
fn test_inconsistent_player_table_is_fatal() {
    let mut play = player_table(3);
    play.capacity = 1;
    let mut engine = MemoryEngine::new();
    engine.insert_database(ROSTER, vec![team_table(), play]);
    {
        let mut session = ImportSession::new(&mut engine, quiet_config());
        let result = session.open(Path::new(ROSTER));
        assert!(matches!(result, Err(RosterError::Schema { table, .. }) if table == "PLAY"));
        assert_eq!(session.state(), SessionState::Failed);
    }
    assert_eq!(engine.open_handles(), 0);
}

#[test]
fn test_resize_failure_closes_roster() {
    let mut engine = engine_with_roster();
    engine.fail_on(FailPoint::Resize);
    {
        let mut session = ImportSession::new(&mut engine, quiet_config());
        let rows = vec![player("Josh", "Allen", "QB", "BUF")];
        let result = session.run(Path::new(ROSTER), &rows);

        match result {
            Err(RosterError::SessionSize { table, capacity }) => {
                assert_eq!(table, "PLAY");
                assert_eq!(capacity, 1);
            }
            other => panic!("Expected SessionSize, got {:?}", other),
        }
        assert_eq!(session.state(), SessionState::Failed);
    }
    assert_eq!(engine.open_handles(), 0);
}

#[test]
fn test_failed_save_still_closes() {
    let mut engine = engine_with_roster();
    engine.fail_on(FailPoint::Save);
    let rows = vec![player("Josh", "Allen", "QB", "BUF")];
    {
        let mut session = ImportSession::new(&mut engine, quiet_config());
        let result = session.run(Path::new(ROSTER), &rows);

        match result {
            Err(RosterError::Finalize { steps }) => assert_eq!(steps, vec![FinalizeStep::Save]),
            other => panic!("Expected Finalize, got {:?}", other),
        }
        let outcome = session.report().finalize.unwrap();
        assert!(outcome.compacted);
        assert!(!outcome.saved);
        assert!(outcome.closed);
        assert_eq!(session.report().rows_imported, 1);
        assert_eq!(session.state(), SessionState::Failed);
    }
    assert_eq!(engine.open_handles(), 0);
    assert_eq!(saved_record_count(&engine), 0);
}

#[test]
fn test_every_finalize_step_checked_independently() {
    let mut engine = engine_with_roster();
    engine.fail_on(FailPoint::Compact);
    engine.fail_on(FailPoint::Close);

    let mut session = ImportSession::new(&mut engine, quiet_config());
    let result = session.run(Path::new(ROSTER), &[]);

    match result {
        Err(e @ RosterError::Finalize { .. }) => {
            assert_eq!(e.to_string(), "Finalize failed at compact, close");
        }
        other => panic!("Expected Finalize, got {:?}", other),
    }
    let outcome = session.report().finalize.unwrap();
    assert!(outcome.saved);
}

#[test]
fn test_unrecognised_position_makes_no_engine_calls() {
    let mut engine = engine_with_roster();
    let rows = vec![player("Devin", "Hester", "KR", "CHI")];

    let report = {
        let mut session = ImportSession::new(&mut engine, quiet_config());
        session.run(Path::new(ROSTER), &rows).unwrap()
    };

    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].reason.contains("Unrecognized position"));
    assert!(!report.skipped[0].partially_written);
    assert_eq!(engine.call_counts().gets, 0);
    assert_eq!(engine.call_counts().sets, 0);
    assert_eq!(saved_record_count(&engine), 0);
}

#[test]
fn test_blank_position_is_skipped() {
    let mut engine = engine_with_roster();
    let rows = vec![
        player("Unknown", "Player", "", "CHI"),
        player("Caleb", "Williams", "QB", "CHI"),
    ];

    let mut session = ImportSession::new(&mut engine, quiet_config());
    let report = session.run(Path::new(ROSTER), &rows).unwrap();

    assert_eq!(report.rows_imported, 1);
    assert!(report.skipped[0].reason.contains("position"));
}

#[test]
fn test_bad_row_does_not_stop_batch() {
    let mut engine = engine_with_roster();
    let rows = vec![
        player("Joe", "Burrow", "QB", "CIN"),
        player("Ja'Marr", "Chase", "WR", "XYZ"),
        player("Tee", "Higgins", "WR", "CIN").with("weight", "one ninety"),
        player("Trey", "Hendrickson", "RE", "CIN"),
    ];

    let report = {
        let mut session = ImportSession::new(&mut engine, quiet_config());
        session.run(Path::new(ROSTER), &rows).unwrap()
    };

    assert_eq!(report.rows_imported, 2);
    let skipped: Vec<usize> = report.skipped.iter().map(|skip| skip.row).collect();
    assert_eq!(skipped, vec![1, 2]);
    assert!(report.skipped.iter().all(|skip| !skip.partially_written));
    // Failed rows get no record
    assert_eq!(saved_record_count(&engine), 2);
    assert_eq!(saved_text(&engine, fields::LAST_NAME, 1).as_deref(), Some("Hendrickson"));
}

#[test]
fn test_failed_rows_leave_no_blank_records() {
    let mut engine = engine_with_roster();
    let rows = vec![
        player("Ja'Marr", "Chase", "WR", "XYZ"),
        player("Tee", "Higgins", "WR", "CIN").with("weight", "one ninety"),
        player("Kyler", "Murray", "QB", "ARI").with("jersey_number", "0"),
    ];

    let report = {
        let mut session = ImportSession::new(&mut engine, quiet_config());
        session.run(Path::new(ROSTER), &rows).unwrap()
    };

    assert_eq!(report.rows_imported, 1);
    assert_eq!(report.skipped.len(), 2);
    assert_eq!(saved_record_count(&engine), 1);

    let mut seen = std::collections::HashSet::new();
    for record in 0..saved_record_count(&engine) {
        let team = saved_integer(&engine, fields::TEAM_ID, record);
        let jersey = saved_integer(&engine, fields::JERSEY_NUMBER, record);
        assert!(seen.insert((team, jersey)), "record {} repeats a number", record);
    }
    assert_eq!(saved_text(&engine, fields::LAST_NAME, 0).as_deref(), Some("Murray"));
    assert_eq!(saved_integer(&engine, fields::JERSEY_NUMBER, 0), Some(0));
}

#[test]
fn test_unparseable_rating_reserves_no_number() {
    let mut engine = engine_with_roster();
    let rows = vec![player("Joe", "Burrow", "QB", "CIN").with("overall", "ninety")];

    let mut session = ImportSession::new(&mut engine, quiet_config());
    let report = session.run(Path::new(ROSTER), &rows).unwrap();

    assert_eq!(report.rows_imported, 0);
    assert!(!report.skipped[0].partially_written);
    assert!(report.skipped[0].reason.contains("ninety"));
    assert!(session.allocation_state().assigned("CIN").is_empty());
    assert_eq!(session.engine().call_counts().sets, 0);
    drop(session);
    assert_eq!(saved_record_count(&engine), 0);
}

#[test]
fn test_engine_write_failure_marks_row_partially_written() {
    let mut engine = engine_with_roster();
    engine.fail_on(FailPoint::Set(fields::HEIGHT.to_string()));
    let rows = vec![player("Derrick", "Henry", "HB", "BAL")];

    let mut session = ImportSession::new(&mut engine, quiet_config());
    let report = session.run(Path::new(ROSTER), &rows).unwrap();

    assert_eq!(report.rows_imported, 0);
    assert!(report.skipped[0].partially_written);
    assert!(report.skipped[0].reason.contains("PHGT"));
}

#[test]
fn test_verification_failures_are_recorded_and_row_kept() {
    let mut engine = engine_with_roster();
    engine.fail_on(FailPoint::CorruptWrite(fields::AGE.to_string()));
    let rows = vec![
        player("Nick", "Chubb", "HB", "CLE"),
        player("Myles", "Garrett", "RE", "CLE"),
    ];

    let mut session = ImportSession::new(&mut engine, quiet_config());
    let report = session.run(Path::new(ROSTER), &rows).unwrap();

    assert_eq!(report.rows_imported, 2);
    assert_eq!(report.verification_failures.len(), 2);
    assert_eq!(report.verification_failures[1].record, 1);
    assert!(report.verification_failures[0].message.contains("PAGE"));
    assert!(!report.is_clean());
}

#[test]
fn test_verification_disabled_skips_read_back() {
    let mut engine = engine_with_roster();
    engine.fail_on(FailPoint::CorruptWrite(fields::AGE.to_string()));
    let rows = vec![player("Nick", "Chubb", "HB", "CLE")];

    let report = {
        let mut session =
            ImportSession::new(&mut engine, quiet_config().without_verification());
        session.run(Path::new(ROSTER), &rows).unwrap()
    };

    assert!(report.verification_failures.is_empty());
    assert_eq!(engine.call_counts().gets, 0);
}

#[test]
fn test_oversized_rating_fails_verification() {
    let mut engine = engine_with_roster();
    let rows = vec![player("Aaron", "Donald", "DT", "LAR").with("strength", "150")];

    let mut session = ImportSession::new(&mut engine, quiet_config());
    let report = session.run(Path::new(ROSTER), &rows).unwrap();

    assert_eq!(report.rows_imported, 1);
    assert_eq!(report.verification_failures.len(), 1);
    assert!(report.verification_failures[0].message.contains("PSTR"));
}
