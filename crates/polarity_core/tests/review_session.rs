use polarity_core::{
    AuditEntry, Detection, Point, ReviewSession, SessionConfig, SessionError, StoreError,
};
use std::fs;

fn detections() -> Vec<Detection> {
    vec![
        Detection::new(1, (5.0, 5.0), (7.0, 9.0)),
        Detection::new(2, (20.0, 4.0), (18.0, 1.0)),
    ]
}

#[test]
fn bootstrap_writes_snapshot_and_empty_log() {
    let dir = tempfile::tempdir().unwrap();
    let config = SessionConfig::in_dir(dir.path());

    let session = ReviewSession::bootstrap(config.clone(), detections()).unwrap();

    assert_eq!(session.store().identifiers(), vec![1, 2]);
    let snapshot = fs::read_to_string(&config.snapshot_path).unwrap();
    assert_eq!(snapshot.lines().count(), 2);
    assert_eq!(fs::read_to_string(&config.audit_log_path).unwrap(), "");
}

#[test]
fn edits_are_flushed_and_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = SessionConfig::in_dir(dir.path());

    let mut session = ReviewSession::bootstrap(config.clone(), detections()).unwrap();
    let added = session
        .add(2, Point::new(20.0, 4.0), Point::new(25.0, 3.0))
        .unwrap();
    session.update_centroid(1, Point::new(6.0, 5.0)).unwrap();
    session.deactivate(2).unwrap();
    session.update_marker(added, Point::new(24.0, 2.0)).unwrap();

    let log = fs::read_to_string(&config.audit_log_path).unwrap();
    assert_eq!(log.lines().count(), 4);

    let reopened = ReviewSession::open(config).unwrap();
    assert_eq!(reopened.store(), session.store());
}

#[test]
fn undo_and_redo_append_to_the_log() {
    let dir = tempfile::tempdir().unwrap();
    let config = SessionConfig::in_dir(dir.path());
    let mut session = ReviewSession::bootstrap(config.clone(), detections()).unwrap();

    session.deactivate(1).unwrap();
    session.update_marker(1, Point::new(0.0, 0.0)).unwrap();
    session.undo().unwrap().unwrap();

    let log = fs::read_to_string(&config.audit_log_path).unwrap();
    let lines: Vec<serde_json::Value> = log
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[2]["field"], "marker");
    assert_eq!(lines[2]["value"], serde_json::json!([7.0, 9.0]));

    let reopened = ReviewSession::open(config.clone()).unwrap();
    assert_eq!(reopened.store(), session.store());

    session.redo().unwrap().unwrap();
    assert!(session.redo().unwrap().is_none());
    assert!(session.undo().unwrap().is_some());
    session.redo().unwrap().unwrap();
    assert_eq!(
        fs::read_to_string(&config.audit_log_path)
            .unwrap()
            .lines()
            .count(),
        6
    );
    let reopened = ReviewSession::open(config).unwrap();
    assert_eq!(reopened.store(), session.store());
    assert_eq!(
        reopened.store().get(1).unwrap().marker(),
        Point::new(0.0, 0.0)
    );
}

#[test]
fn edits_after_reopen_keep_earlier_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let config = SessionConfig::in_dir(dir.path());

    let mut first = ReviewSession::bootstrap(config.clone(), detections()).unwrap();
    let added = first
        .add(2, Point::new(20.0, 4.0), Point::new(25.0, 3.0))
        .unwrap();
    drop(first);

    let mut second = ReviewSession::open(config.clone()).unwrap();
    assert!(second.store().contains(added));
    assert!(!second.store().can_undo());
    second.update_marker(1, Point::new(0.0, 0.0)).unwrap();

    let third = ReviewSession::open(config.clone()).unwrap();
    assert!(third.store().contains(added));
    assert_eq!(third.store(), second.store());
    assert_eq!(
        fs::read_to_string(&config.audit_log_path)
            .unwrap()
            .lines()
            .count(),
        2
    );
}

#[test]
fn undone_add_in_later_session_replays_as_delete() {
    let dir = tempfile::tempdir().unwrap();
    let config = SessionConfig::in_dir(dir.path());

    let mut first = ReviewSession::bootstrap(config.clone(), detections()).unwrap();
    first.deactivate(2).unwrap();
    drop(first);

    let mut second = ReviewSession::open(config.clone()).unwrap();
    let added = second
        .add(1, Point::new(1.0, 1.0), Point::new(2.0, 2.0))
        .unwrap();
    let step = second.undo().unwrap().unwrap();
    assert_eq!(step.entry, AuditEntry::Delete { target_id: added });
    assert!(second.undo().unwrap().is_none());

    let third = ReviewSession::open(config).unwrap();
    assert!(!third.store().contains(added));
    assert!(!third.store().get(2).unwrap().is_active());
    assert_eq!(third.store(), second.store());
}

#[test]
fn open_without_audit_log_uses_snapshot_only() {
    let dir = tempfile::tempdir().unwrap();
    let config = SessionConfig::in_dir(dir.path());
    ReviewSession::bootstrap(config.clone(), detections()).unwrap();
    fs::remove_file(&config.audit_log_path).unwrap();

    let session = ReviewSession::open(config).unwrap();
    assert_eq!(session.store().len(), 2);
}

#[test]
fn open_without_snapshot_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ReviewSession::open(SessionConfig::in_dir(dir.path())).unwrap_err();
    assert!(matches!(err, SessionError::Io(_)));
}

#[test]
fn edit_on_missing_id_leaves_log_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let config = SessionConfig::in_dir(dir.path());
    let mut session = ReviewSession::bootstrap(config.clone(), detections()).unwrap();
    session.deactivate(1).unwrap();
    let before = fs::read_to_string(&config.audit_log_path).unwrap();

    let err = session.deactivate(42).unwrap_err();
    assert!(matches!(err, SessionError::Store(StoreError::NotFound(42))));
    assert!(session.pending().is_empty());
    assert_eq!(fs::read_to_string(&config.audit_log_path).unwrap(), before);
}

#[test]
fn corrupt_log_fails_open_with_line_number() {
    let dir = tempfile::tempdir().unwrap();
    let config = SessionConfig::in_dir(dir.path());
    ReviewSession::bootstrap(config.clone(), detections()).unwrap();
    fs::write(
        &config.audit_log_path,
        "{\"target_id\":1,\"action\":\"update\",\"field\":\"active\",\"value\":false}\n{oops\n",
    )
    .unwrap();

    match ReviewSession::open(config) {
        Err(SessionError::Codec(err)) => assert_eq!(err.line(), Some(2)),
        other => panic!("expected codec error, got {other:?}"),
    }
}
