mod common;

use common::{five_records, workbench, write_file};
use std::collections::BTreeSet;
use xcal_core::{
    open_db_in_memory, Command, EngineConfig, Session, SessionError, Workbench, WorkbenchError,
};

#[test]
fn commands_follow_engine_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "plan.ics", &five_records());
    let mut session = Session::new(workbench(), open_db_in_memory().unwrap());

    assert_eq!(
        session.available_commands(None).unwrap(),
        BTreeSet::from([Command::Open, Command::Status, Command::Query])
    );

    session.workbench_mut().open(&path).unwrap();
    let loaded = session.available_commands(None).unwrap();
    assert!(loaded.contains(&Command::StoreAll));
    assert!(loaded.contains(&Command::TodoList));
    assert!(!loaded.contains(&Command::StoreSelected));
    assert!(!loaded.contains(&Command::Undo));
    assert!(!loaded.contains(&Command::ClearDatabase));

    let focused = session.available_commands(Some(5)).unwrap();
    assert!(focused.contains(&Command::StoreSelected));
    assert!(focused.contains(&Command::ShowSelected));
    assert!(!session
        .available_commands(Some(6))
        .unwrap()
        .contains(&Command::StoreSelected));

    session.workbench_mut().remove_todos(&[2]).unwrap();
    assert!(session.available_commands(None).unwrap().contains(&Command::Undo));

    session.store_selected(1).unwrap();
    let state = session.command_state(None).unwrap();
    assert!(state.database_non_empty);
    assert!(state.undo_pending);
    assert!(session
        .available_commands(None)
        .unwrap()
        .contains(&Command::ClearDatabase));

    session.clear_db().unwrap();
    assert!(!session.command_state(None).unwrap().database_non_empty);
}

#[test]
fn persistence_needs_a_loaded_calendar() {
    let mut session = Session::new(workbench(), open_db_in_memory().unwrap());
    match session.store_all().unwrap_err() {
        SessionError::Workbench(WorkbenchError::NothingLoaded) => {}
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn shared_session_serves_threads() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "plan.ics", &five_records());
    let mut session = Session::new(workbench(), open_db_in_memory().unwrap());
    session.workbench_mut().open(&path).unwrap();
    let shared = session.into_shared();

    std::thread::scope(|scope| {
        scope.spawn(|| shared.store_all().unwrap().inserted());
        scope.spawn(|| shared.with_workbench(|workbench| workbench.rows().len()));
    });

    let counts = shared.count_db().unwrap();
    assert_eq!((counts.organizers, counts.events, counts.todos), (2, 2, 3));
    assert!(shared.command_state(None).unwrap().database_non_empty);

    let session = shared.into_inner();
    assert_eq!(session.workbench().working_set().unwrap().len(), 5);
}

#[test]
fn open_from_config_creates_the_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig {
        database_path: dir.path().join("calendar.sqlite3"),
        connect_attempts: 1,
        ..EngineConfig::default()
    };

    let session = Session::open(&config).unwrap();
    assert!(session.count_db().unwrap().is_empty());
    assert!(config.database_path.exists());
    assert!(!session.workbench().is_loaded());
}

#[test]
fn unreachable_database_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig {
        database_path: dir.path().join("no-such-dir").join("calendar.sqlite3"),
        connect_attempts: 1,
        ..EngineConfig::default()
    };

    assert!(matches!(Session::open(&config), Err(SessionError::Db(_))));
}

#[test]
fn calendar_work_needs_no_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "plan.ics", &five_records());
    let config = EngineConfig {
        database_path: dir.path().join("no-such-dir").join("calendar.sqlite3"),
        connect_attempts: 1,
        ..EngineConfig::default()
    };

    let mut workbench = Workbench::from_config(&config).unwrap();
    workbench.open(&path).unwrap();
    assert_eq!(workbench.rows().len(), 5);
    assert!(!config.database_path.exists());
}
