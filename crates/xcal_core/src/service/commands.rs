//! Command enablement.
//!
//! Which user commands are valid is a pure function of engine state, so
//! any front end can ask instead of tracking enable/disable transitions.

use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Open,
    Save,
    SaveAs,
    Info,
    Combine,
    Filter,
    ExtractEvents,
    ExtractXProperties,
    ShowSelected,
    TodoList,
    Undo,
    StoreAll,
    StoreSelected,
    ClearDatabase,
    Status,
    Query,
}

/// Engine facts that decide command availability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandState {
    pub calendar_loaded: bool,
    /// A working-set member is focused in the front end.
    pub has_selection: bool,
    pub undo_pending: bool,
    pub database_non_empty: bool,
}

/// Commands valid in `state`.
pub fn available_commands(state: &CommandState) -> BTreeSet<Command> {
    let mut commands = BTreeSet::from([Command::Open, Command::Status, Command::Query]);

    if state.calendar_loaded {
        commands.extend([
            Command::Save,
            Command::SaveAs,
            Command::Info,
            Command::Combine,
            Command::Filter,
            Command::ExtractEvents,
            Command::ExtractXProperties,
            Command::TodoList,
            Command::StoreAll,
        ]);
        if state.has_selection {
            commands.extend([Command::ShowSelected, Command::StoreSelected]);
        }
        if state.undo_pending {
            commands.insert(Command::Undo);
        }
    }
    if state.database_non_empty {
        commands.insert(Command::ClearDatabase);
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::{available_commands, Command, CommandState};

    #[test]
    fn fresh_engine_only_offers_open_status_and_query() {
        let commands = available_commands(&CommandState::default());
        assert_eq!(
            commands.into_iter().collect::<Vec<_>>(),
            vec![Command::Open, Command::Status, Command::Query]
        );
    }

    #[test]
    fn selection_and_undo_need_a_loaded_calendar() {
        let orphan = CommandState {
            calendar_loaded: false,
            has_selection: true,
            undo_pending: true,
            database_non_empty: true,
        };
        let commands = available_commands(&orphan);
        assert!(!commands.contains(&Command::StoreSelected));
        assert!(!commands.contains(&Command::Undo));
        assert!(commands.contains(&Command::ClearDatabase));

        let loaded = CommandState {
            calendar_loaded: true,
            ..orphan
        };
        let commands = available_commands(&loaded);
        assert!(commands.contains(&Command::StoreSelected));
        assert!(commands.contains(&Command::ShowSelected));
        assert!(commands.contains(&Command::Undo));
    }
}
