//! Calendar component tree and its fixed-field record projection.
//!
//! # Responsibility
//! - Hold the owned component tree produced by a codec.
//! - Project each top-level component into an eight-field `ComponentRecord`.
//!
//! # Invariants
//! - Every record field is present; missing values are empty strings.
//! - Projection never fails: unsupported components become `ComponentKind::Other`.

use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Number of fields carried by one `ComponentRecord`.
pub const RECORD_FIELD_COUNT: usize = 8;

/// One `KEY[=value]` parameter attached to a content line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub key: String,
    pub value: Option<String>,
}

/// One unfolded content line (`NAME;PARAMS:VALUE`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub params: Vec<Parameter>,
    pub value: String,
}

impl Property {
    /// Returns the value of the first parameter named `key`, if any.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|param| param.key.eq_ignore_ascii_case(key))
            .and_then(|param| param.value.as_deref())
    }
}

/// Owned calendar component with nested sub-components (e.g. `VALARM`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarComponent {
    pub name: String,
    pub properties: Vec<Property>,
    pub components: Vec<CalendarComponent>,
}

impl CalendarComponent {
    /// Returns the last property named `name`.
    ///
    /// Later occurrences win, matching how repeated single-valued properties
    /// are resolved when records are projected.
    pub fn last_property(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .rev()
            .find(|property| property.name.eq_ignore_ascii_case(name))
    }
}

/// Closed set of component kinds the engine distinguishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Event,
    Todo,
    /// Any other component; keeps the original component name for display.
    Other(String),
}

impl ComponentKind {
    pub fn from_component_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("VEVENT") {
            Self::Event
        } else if name.eq_ignore_ascii_case("VTODO") {
            Self::Todo
        } else {
            Self::Other(name.to_ascii_uppercase())
        }
    }

    /// Component name as written in calendar text.
    pub fn component_name(&self) -> &str {
        match self {
            Self::Event => "VEVENT",
            Self::Todo => "VTODO",
            Self::Other(name) => name.as_str(),
        }
    }

    pub fn is_todo(&self) -> bool {
        matches!(self, Self::Todo)
    }
}

impl Display for ComponentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.component_name())
    }
}

/// Fixed eight-field projection of one top-level component.
///
/// `date_or_priority` carries the raw `PRIORITY` value for to-dos and the raw
/// `DTSTART` value for every other kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentRecord {
    pub kind: ComponentKind,
    pub property_count: usize,
    pub subcomponent_count: usize,
    pub summary: String,
    pub organizer_name: String,
    pub organizer_contact: String,
    pub date_or_priority: String,
    pub location: String,
}

impl ComponentRecord {
    /// Projects a parsed component into its record shape.
    pub fn project(component: &CalendarComponent) -> Self {
        let kind = ComponentKind::from_component_name(&component.name);
        let value_of = |name: &str| {
            component
                .last_property(name)
                .map(|property| property.value.clone())
                .unwrap_or_default()
        };

        let organizer = component.last_property("ORGANIZER");
        let organizer_name = organizer
            .and_then(|property| property.param("CN"))
            .map(|name| name.trim_matches('"').to_string())
            .unwrap_or_default();
        let organizer_contact = organizer
            .map(|property| property.value.clone())
            .unwrap_or_default();

        let date_or_priority = if kind.is_todo() {
            value_of("PRIORITY")
        } else {
            value_of("DTSTART")
        };

        Self {
            property_count: component.properties.len(),
            subcomponent_count: component.components.len(),
            summary: value_of("SUMMARY"),
            organizer_name,
            organizer_contact,
            date_or_priority,
            location: value_of("LOCATION"),
            kind,
        }
    }

    /// Returns field `slot` (0-based, `< RECORD_FIELD_COUNT`) as display text.
    pub fn field(&self, slot: usize) -> Option<String> {
        let value = match slot {
            0 => self.kind.component_name().to_string(),
            1 => self.property_count.to_string(),
            2 => self.subcomponent_count.to_string(),
            3 => self.summary.clone(),
            4 => self.organizer_name.clone(),
            5 => self.organizer_contact.clone(),
            6 => self.date_or_priority.clone(),
            7 => self.location.clone(),
            _ => return None,
        };
        Some(value)
    }

    pub fn has_organizer(&self) -> bool {
        !self.organizer_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{CalendarComponent, ComponentKind, ComponentRecord, Parameter, Property};

    fn prop(name: &str, value: &str) -> Property {
        Property {
            name: name.to_string(),
            params: Vec::new(),
            value: value.to_string(),
        }
    }

    #[test]
    fn todo_projection_uses_priority_and_quoted_common_name() {
        let component = CalendarComponent {
            name: "VTODO".to_string(),
            properties: vec![
                prop("SUMMARY", "Buy milk"),
                prop("DTSTART", "20160101T090000"),
                prop("PRIORITY", "2"),
                Property {
                    name: "ORGANIZER".to_string(),
                    params: vec![Parameter {
                        key: "CN".to_string(),
                        value: Some("\"Alice\"".to_string()),
                    }],
                    value: "mailto:alice@x.test".to_string(),
                },
            ],
            components: Vec::new(),
        };

        let record = ComponentRecord::project(&component);
        assert_eq!(record.kind, ComponentKind::Todo);
        assert_eq!(record.property_count, 4);
        assert_eq!(record.date_or_priority, "2");
        assert_eq!(record.organizer_name, "Alice");
        assert_eq!(record.organizer_contact, "mailto:alice@x.test");
        assert_eq!(record.location, "");
    }

    #[test]
    fn unsupported_component_keeps_its_name_and_blank_fields() {
        let component = CalendarComponent {
            name: "vjournal".to_string(),
            properties: Vec::new(),
            components: Vec::new(),
        };

        let record = ComponentRecord::project(&component);
        assert_eq!(record.kind, ComponentKind::Other("VJOURNAL".to_string()));
        assert_eq!(record.field(0).as_deref(), Some("VJOURNAL"));
        assert_eq!(record.field(3).as_deref(), Some(""));
        assert!(record.field(8).is_none());
    }
}
