use std::time::Duration;

use pneuma::history::HistoryDb;
use pneuma::session::{Phase, Session, SessionConfig};
use tempfile::tempdir;

fn quick_config() -> SessionConfig {
    SessionConfig {
        breaths_per_round: 2,
        breath_interval_ms: 10,
        recovery_ms: 10,
        rounds_planned: 1,
    }
}

fn run_one_session(session: &mut Session, hold_ms: u64) {
    session.start();
    session.advance(Duration::from_millis(20));
    assert_eq!(session.phase, Phase::Hold);
    session.advance(Duration::from_millis(hold_ms));
    session.end_hold();
    session.advance(Duration::from_millis(10));
}

#[test]
fn completed_session_is_persisted() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("history.db");

    let mut session = Session::new(quick_config()).unwrap();
    session.history = HistoryDb::open(&db_path).ok();

    run_one_session(&mut session, 1500);
    assert_eq!(session.phase, Phase::Complete);

    let db = HistoryDb::open(&db_path).unwrap();
    let stored = db.recent_sessions().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].rounds.len(), 1);
    assert_eq!(stored[0].rounds[0].breaths_completed, 2);
    assert_eq!(stored[0].rounds[0].hold_duration_secs, 1);
    assert_eq!(
        stored[0].session_id,
        session.last_summary().unwrap().session_id
    );
}

#[test]
fn consecutive_sessions_stack_most_recent_first() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("history.db");

    let mut session = Session::new(quick_config()).unwrap();
    session.history = HistoryDb::open(&db_path).ok();

    run_one_session(&mut session, 1000);
    let first_id = session.last_summary().unwrap().session_id.clone();

    // Starting from Complete begins a fresh session with a fresh id.
    run_one_session(&mut session, 2000);
    let second_id = session.last_summary().unwrap().session_id.clone();
    assert_ne!(first_id, second_id);

    let db = HistoryDb::open(&db_path).unwrap();
    let stored = db.recent_sessions().unwrap();
    assert_eq!(stored.len(), 2);
    // Insertion order is the tiebreak when both land in the same second.
    let ids: Vec<_> = stored.iter().map(|s| s.session_id.as_str()).collect();
    assert!(ids.contains(&first_id.as_str()));
    assert!(ids.contains(&second_id.as_str()));
}

#[test]
fn abandoned_session_with_rounds_is_persisted() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("history.db");

    let config = SessionConfig {
        rounds_planned: 3,
        ..quick_config()
    };
    let mut session = Session::new(config).unwrap();
    session.history = HistoryDb::open(&db_path).ok();

    run_one_session(&mut session, 1000);
    assert_eq!(session.phase, Phase::Idle);
    assert_eq!(session.current_round, 2);

    session.abandon();

    let db = HistoryDb::open(&db_path).unwrap();
    let stored = db.recent_sessions().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].rounds.len(), 1);
}

#[test]
fn abandoned_session_without_rounds_is_not_persisted() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("history.db");

    let mut session = Session::new(quick_config()).unwrap();
    session.history = HistoryDb::open(&db_path).ok();

    session.start();
    session.advance(Duration::from_millis(10));
    session.abandon();

    let db = HistoryDb::open(&db_path).unwrap();
    assert!(db.recent_sessions().unwrap().is_empty());
}

#[test]
fn unreachable_history_store_does_not_block_completion() {
    let mut session = Session::new(quick_config()).unwrap();
    // No store attached at all: the controller still completes and keeps
    // its in-memory summary.
    session.history = None;

    run_one_session(&mut session, 500);
    assert_eq!(session.phase, Phase::Complete);
    assert!(session.last_summary().is_some());
}
