mod common;

use common::{five_records, three_records, workbench, write_file};
use xcal_core::{open_db_in_memory, ComponentKind, Session, UndoState, WorkbenchError};

#[test]
fn opening_selects_every_record_without_touching_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "team.ics", &three_records());

    let mut session = Session::new(workbench(), open_db_in_memory().unwrap());
    let report = session.workbench_mut().open(&path).unwrap();

    assert_eq!(report.records, 3);
    assert_eq!(report.delta, 4 + 7 + 5 + 7);
    assert!(report.info.is_none());

    let workbench = session.workbench();
    assert_eq!(workbench.working_set().unwrap().members(), &[0, 1, 2]);
    assert_eq!(workbench.display_title(), "team.ics");
    assert!(!workbench.undo_log().is_pending());
    assert!(session.count_db().unwrap().is_empty());
}

#[test]
fn removal_batch_and_undo_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "plan.ics", &five_records());
    let mut workbench = workbench();
    let opened = workbench.open(&path).unwrap();
    assert_eq!(opened.delta, 33);

    let candidates = workbench.todo_candidates();
    assert_eq!(
        candidates.iter().map(|c| c.position).collect::<Vec<_>>(),
        vec![2, 4, 5]
    );

    let removal = workbench.remove_todos(&[4, 2]).unwrap();
    assert_eq!(removal.removed, 2);
    assert_eq!(removal.delta, -10);
    assert_eq!(workbench.working_set().unwrap().members(), &[0, 2, 4]);
    assert_eq!(workbench.undo_log().len(), 2);
    assert_eq!(workbench.undo_log().state(), UndoState::Pending);
    assert_eq!(workbench.display_title(), "plan.ics*");

    let undone = workbench.undo().unwrap().unwrap();
    assert_eq!(undone.restored, 2);
    assert_eq!(undone.delta, 10);
    assert_eq!(workbench.working_set().unwrap().members(), &[0, 1, 2, 3, 4]);
    assert_eq!(workbench.undo_log().len(), 0);
    assert!(workbench.undo().unwrap().is_none());

    assert_eq!(opened.delta + removal.delta + undone.delta, 33);
    assert_eq!(workbench.previous_line_count(), 33);
}

#[test]
fn removal_rejects_non_todos_and_bad_positions_without_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "plan.ics", &five_records());
    let mut workbench = workbench();
    workbench.open(&path).unwrap();

    match workbench.remove_todos(&[2, 3]).unwrap_err() {
        WorkbenchError::NotATodo { position } => assert_eq!(position, 3),
        other => panic!("unexpected error: {other}"),
    }
    match workbench.remove_todos(&[9]).unwrap_err() {
        WorkbenchError::InvalidPosition { position, len } => {
            assert_eq!(position, 9);
            assert_eq!(len, 5);
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(workbench.working_set().unwrap().len(), 5);
    assert_eq!(workbench.undo_log().len(), 0);
    assert!(!workbench.is_unsaved());
}

#[test]
fn save_writes_working_set_and_clears_undo() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "plan.ics", &five_records());
    let copy = dir.path().join("copy.ics");
    let mut workbench = workbench();
    workbench.open(&path).unwrap();
    workbench.remove_todos(&[2]).unwrap();

    workbench.save_as(&copy).unwrap();
    assert_eq!(workbench.active_path(), Some(copy.as_path()));
    assert_eq!(workbench.display_title(), "copy.ics");
    assert_eq!(workbench.undo_log().len(), 0);

    let mut reread = common::workbench();
    let report = reread.open(&copy).unwrap();
    assert_eq!(report.records, 4);
    assert!(reread
        .rows()
        .iter()
        .all(|row| row.summary != "Draft agenda"));
}

#[test]
fn failed_open_keeps_previous_calendar() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_file(dir.path(), "good.ics", &three_records());
    let bad = write_file(
        dir.path(),
        "bad.ics",
        "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nEND:VCALENDAR\r\n",
    );
    let mut workbench = workbench();
    workbench.open(&good).unwrap();

    let err = workbench.open(&bad).unwrap_err();
    match &err {
        WorkbenchError::Codec(codec) => assert_eq!(codec.source_name(), Some("bad.ics")),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(workbench.store().unwrap().len(), 3);
    assert_eq!(workbench.active_path(), Some(good.as_path()));
    assert_eq!(workbench.previous_line_count(), 23);
}

#[test]
fn rows_and_selected_text_follow_display_positions() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "team.ics", &three_records());
    let mut workbench = workbench();
    workbench.open(&path).unwrap();

    let rows = workbench.rows();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1].kind, ComponentKind::Todo.to_string());
    assert_eq!(rows[1].summary, "Draft agenda");

    let text = workbench.show_selected(3).unwrap();
    assert!(text.contains("SUMMARY:Review\r\n"));
    assert!(!text.contains("Kickoff"));
    assert_eq!(workbench.previous_line_count(), 23);
}

#[test]
fn nothing_loaded_is_reported() {
    let mut workbench = workbench();
    assert_eq!(workbench.display_title(), "untitled");
    assert!(matches!(workbench.save(), Err(WorkbenchError::NoActiveFile)));
    assert!(matches!(
        workbench.remove_todos(&[1]),
        Err(WorkbenchError::NothingLoaded)
    ));
    assert!(workbench.undo().unwrap().is_none());
    assert!(workbench.todo_candidates().is_empty());
}

fn remove_workspace_dir(workbench: &xcal_core::Workbench) {
    std::fs::remove_dir_all(workbench.working_file().parent().unwrap()).unwrap();
}

#[test]
fn unwritable_working_file_keeps_previous_calendar_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_file(dir.path(), "a.ics", &three_records());
    let second = write_file(dir.path(), "b.ics", &five_records());
    let mut workbench = workbench();
    workbench.open(&first).unwrap();
    remove_workspace_dir(&workbench);

    match workbench.open(&second).unwrap_err() {
        WorkbenchError::Codec(xcal_core::CodecError::Write(_)) => {}
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(workbench.store().unwrap().len(), 3);
    assert_eq!(workbench.working_set().unwrap().members(), &[0, 1, 2]);
    assert_eq!(workbench.active_path(), Some(first.as_path()));
    assert_eq!(workbench.previous_line_count(), 23);
    assert_eq!(workbench.display_title(), "a.ics");
}

#[test]
fn unwritable_working_file_keeps_undo_frame() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "plan.ics", &five_records());
    let mut workbench = workbench();
    workbench.open(&path).unwrap();
    workbench.remove_todos(&[2, 4]).unwrap();
    remove_workspace_dir(&workbench);

    assert!(matches!(
        workbench.undo(),
        Err(WorkbenchError::Codec(xcal_core::CodecError::Write(_)))
    ));
    assert_eq!(workbench.undo_log().len(), 2);
    assert_eq!(workbench.working_set().unwrap().members(), &[0, 2, 4]);
    assert_eq!(workbench.previous_line_count(), 23);
}
