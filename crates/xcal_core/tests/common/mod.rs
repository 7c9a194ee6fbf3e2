#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;
use xcal_core::{PipelineAdapter, Workbench};

pub fn calendar(components: &[&[&str]]) -> String {
    let mut lines = vec!["BEGIN:VCALENDAR", "VERSION:2.0", "PRODID:-//xcal//tests//EN"];
    for component in components {
        lines.extend_from_slice(component);
    }
    lines.push("END:VCALENDAR");
    let mut text = lines.join("\r\n");
    text.push_str("\r\n");
    text
}

pub const KICKOFF: &[&str] = &[
    "BEGIN:VEVENT",
    "UID:kickoff",
    "SUMMARY:Kickoff",
    "DTSTART:20160105T100000",
    "LOCATION:Room 1",
    "ORGANIZER;CN=Alice:mailto:alice@example.com",
    "END:VEVENT",
];

pub const REVIEW: &[&str] = &[
    "BEGIN:VEVENT",
    "UID:review",
    "SUMMARY:Review",
    "DTSTART:20160210T140000",
    "LOCATION:Room 2",
    "ORGANIZER;CN=Bob:mailto:bob@example.com",
    "END:VEVENT",
];

pub const DRAFT_AGENDA: &[&str] = &[
    "BEGIN:VTODO",
    "UID:agenda",
    "SUMMARY:Draft agenda",
    "PRIORITY:2",
    "END:VTODO",
];

pub const BOOK_ROOM: &[&str] = &[
    "BEGIN:VTODO",
    "UID:room",
    "SUMMARY:Book room",
    "PRIORITY:1",
    "END:VTODO",
];

pub const SEND_NOTES: &[&str] = &[
    "BEGIN:VTODO",
    "UID:notes",
    "SUMMARY:Send notes",
    "PRIORITY:5",
    "END:VTODO",
];

pub const ORGANIZED_TODO: &[&str] = &[
    "BEGIN:VTODO",
    "UID:budget",
    "SUMMARY:Approve budget",
    "PRIORITY:3",
    "ORGANIZER;CN=Carol:mailto:carol@example.com",
    "END:VTODO",
];

/// Event, to-do, event.
pub fn three_records() -> String {
    calendar(&[KICKOFF, DRAFT_AGENDA, REVIEW])
}

/// Event, to-do, event, to-do, to-do (33 serialized lines).
pub fn five_records() -> String {
    calendar(&[KICKOFF, DRAFT_AGENDA, REVIEW, BOOK_ROOM, SEND_NOTES])
}

pub fn write_file(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

/// Writes an executable `/bin/sh` script standing in for the tool.
#[cfg(unix)]
pub fn write_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

pub fn workbench_with_tool(tool: &Path) -> Workbench {
    Workbench::new(PipelineAdapter::new(tool, Duration::from_secs(10))).unwrap()
}

pub fn workbench() -> Workbench {
    workbench_with_tool(Path::new("/nonexistent/caltool"))
}
