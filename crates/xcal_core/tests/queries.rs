mod common;

use common::{
    calendar, workbench, write_file, BOOK_ROOM, DRAFT_AGENDA, KICKOFF, ORGANIZED_TODO, REVIEW,
    SEND_NOTES,
};
use xcal_core::{open_db_in_memory, CannedQuery, QueryError, Session, SessionError};

const RETRO: &[&str] = &[
    "BEGIN:VEVENT",
    "UID:retro",
    "SUMMARY:Retro",
    "DTSTART:20160301",
    "LOCATION:Room 1",
    "ORGANIZER;CN=Alice:mailto:alice@example.com",
    "END:VEVENT",
];

fn populated_session() -> (tempfile::TempDir, Session) {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "all.ics",
        &calendar(&[
            KICKOFF,
            DRAFT_AGENDA,
            REVIEW,
            BOOK_ROOM,
            SEND_NOTES,
            ORGANIZED_TODO,
            RETRO,
        ]),
    );
    let mut session = Session::new(workbench(), open_db_in_memory().unwrap());
    session.workbench_mut().open(&path).unwrap();
    let report = session.store_all().unwrap();
    assert_eq!(report.inserted(), 7);
    (dir, session)
}

fn summaries(session: &Session, query: CannedQuery) -> Vec<String> {
    session
        .run_query(&query)
        .unwrap()
        .first_column()
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[test]
fn organizer_pattern_collects_events_and_todos() {
    let (_dir, session) = populated_session();

    assert_eq!(
        summaries(
            &session,
            CannedQuery::ItemsOfOrganizer {
                name_pattern: "A%".to_string()
            }
        ),
        vec!["Kickoff", "Retro"]
    );
    assert_eq!(
        summaries(
            &session,
            CannedQuery::ItemsOfOrganizer {
                name_pattern: "%".to_string()
            }
        ),
        vec!["Approve budget", "Kickoff", "Retro", "Review"]
    );
}

#[test]
fn location_count_and_start_date_queries() {
    let (_dir, session) = populated_session();

    assert_eq!(
        summaries(
            &session,
            CannedQuery::EventCountAtLocation {
                location: "Room 1".to_string()
            }
        ),
        vec!["2"]
    );
    assert_eq!(
        summaries(
            &session,
            CannedQuery::EventsStartingAfter {
                date: "2016 02 01".to_string()
            }
        ),
        vec!["Review", "Retro"]
    );

    match session
        .run_query(&CannedQuery::EventsStartingAfter {
            date: "2016-02-01".to_string(),
        })
        .unwrap_err()
    {
        SessionError::Query(QueryError::Validation(_)) => {}
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn priority_queries() {
    let (_dir, session) = populated_session();

    assert_eq!(
        summaries(
            &session,
            CannedQuery::TodosWithPriority {
                priority: "5".to_string()
            }
        ),
        vec!["Send notes"]
    );
    assert_eq!(
        summaries(&session, CannedQuery::TodosWithHighestPriority),
        vec!["Book room"]
    );
    assert!(matches!(
        session.run_query(&CannedQuery::TodosWithPriority {
            priority: "urgent".to_string()
        }),
        Err(SessionError::Query(QueryError::Validation(_)))
    ));
}

#[test]
fn empty_results_render_a_notice() {
    let session = Session::new(workbench(), open_db_in_memory().unwrap());
    let report = session
        .run_query(&CannedQuery::TodosWithHighestPriority)
        .unwrap();
    assert!(report.is_empty());
    assert_eq!(report.to_string(), "summary\nNo results found.\n");
}

#[test]
fn custom_queries_must_be_single_read_only_statements() {
    let (_dir, session) = populated_session();

    let report = session
        .run_custom_query("SELECT summary, priority FROM TODO ORDER BY priority;")
        .unwrap();
    assert_eq!(report.columns, vec!["summary", "priority"]);
    assert_eq!(report.rows[0], vec!["Book room", "1"]);
    assert_eq!(report.rows.len(), 4);

    for sql in ["DELETE FROM TODO;", "SELECT 1; SELECT 2;", "  ;  "] {
        match session.run_custom_query(sql).unwrap_err() {
            SessionError::Query(QueryError::Rejected { .. }) => {}
            other => panic!("unexpected error for `{sql}`: {other}"),
        }
    }
    match session.run_custom_query("SELEC summary FROM TODO").unwrap_err() {
        SessionError::Query(QueryError::Invalid { .. }) => {}
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(session.count_db().unwrap().todos, 4);
}

#[test]
fn table_descriptions_list_columns() {
    let session = Session::new(workbench(), open_db_in_memory().unwrap());
    let tables = session.describe_tables().unwrap();

    let names: Vec<&str> = tables.iter().map(|(name, _)| *name).collect();
    assert_eq!(names, vec!["ORGANIZER", "EVENT", "TODO"]);
    let event_columns = tables[1].1.first_column();
    assert_eq!(
        event_columns,
        vec!["event_id", "summary", "start_time", "location", "organizer"]
    );
}
