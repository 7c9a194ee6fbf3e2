//! iCalendar (RFC 5545) codec built on the `icalendar` parser.
//!
//! # Responsibility
//! - Unfold and parse `.ics` text into owned components.
//! - Reject calendars that lack `PRODID`/`VERSION:2.0` or hold no components.
//! - Write selected components back out with CRLF endings and 75-octet
//!   line folding, counting physical lines.

use super::{CalendarCodec, CodecError, CodecResult};
use crate::model::component::{CalendarComponent, Parameter, Property};
use crate::model::store::{ComponentStore, StoreHandle};
use icalendar::parser::{
    read_calendar, unfold, Component as ParsedComponent, Property as ParsedProperty,
};
use log::{info, warn};
use std::borrow::Cow;
use std::io::Write;
use std::time::Instant;

const SUPPORTED_VERSION: &str = "2.0";
const FOLD_OCTETS: usize = 75;

/// `.ics` text codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct IcsCodec;

impl IcsCodec {
    pub fn new() -> Self {
        Self
    }
}

impl CalendarCodec for IcsCodec {
    fn parse_str(&self, text: &str, source_name: &str) -> CodecResult<ComponentStore> {
        let started_at = Instant::now();
        let unfolded = unfold(text);
        let calendar = read_calendar(&unfolded).map_err(|err| {
            warn!(
                "event=calendar_parse module=codec status=error error_code=syntax duration_ms={}",
                started_at.elapsed().as_millis()
            );
            CodecError::Syntax {
                source_name: source_name.to_string(),
                message: err.to_string(),
            }
        })?;

        let calendar_properties: Vec<Property> =
            calendar.properties.iter().map(convert_property).collect();
        let components: Vec<CalendarComponent> =
            calendar.components.iter().map(convert_component).collect();

        let diagnostics = calendar_diagnostics(&calendar_properties, &components);
        if !diagnostics.is_empty() {
            warn!(
                "event=calendar_parse module=codec status=error error_code=invalid diagnostics={} duration_ms={}",
                diagnostics.len(),
                started_at.elapsed().as_millis()
            );
            return Err(CodecError::Invalid {
                source_name: source_name.to_string(),
                diagnostics,
            });
        }

        let store = ComponentStore::new(
            StoreHandle::new(),
            source_name,
            calendar_properties,
            components,
        );
        info!(
            "event=calendar_parse module=codec status=ok handle={} components={} duration_ms={}",
            store.handle(),
            store.len(),
            started_at.elapsed().as_millis()
        );
        Ok(store)
    }

    fn serialize(
        &self,
        store: &ComponentStore,
        indices: &[usize],
        sink: &mut dyn Write,
    ) -> CodecResult<usize> {
        if indices.is_empty() {
            return Ok(0);
        }

        let mut writer = LineWriter::new(sink);
        writer
            .write_calendar(store, indices)
            .map_err(CodecError::Write)?;
        Ok(writer.lines)
    }

    fn release(&self, handle: StoreHandle) {
        info!("event=calendar_release module=codec status=ok handle={handle}");
    }
}

fn convert_property(property: &ParsedProperty<'_>) -> Property {
    Property {
        name: property.name.to_string().to_ascii_uppercase(),
        params: property
            .params
            .iter()
            .map(|param| Parameter {
                key: param.key.to_string().to_ascii_uppercase(),
                value: param.val.as_ref().map(|value| value.to_string()),
            })
            .collect(),
        value: property.val.to_string(),
    }
}

fn convert_component(component: &ParsedComponent<'_>) -> CalendarComponent {
    CalendarComponent {
        name: component.name.to_string().to_ascii_uppercase(),
        properties: component.properties.iter().map(convert_property).collect(),
        components: component.components.iter().map(convert_component).collect(),
    }
}

fn calendar_diagnostics(properties: &[Property], components: &[CalendarComponent]) -> Vec<String> {
    let mut diagnostics = Vec::new();

    let prod_ids = properties.iter().filter(|p| p.name == "PRODID").count();
    match prod_ids {
        1 => {}
        0 => diagnostics.push("missing PRODID".to_string()),
        _ => diagnostics.push(format!("PRODID appears {prod_ids} times")),
    }

    let versions: Vec<&str> = properties
        .iter()
        .filter(|p| p.name == "VERSION")
        .map(|p| p.value.trim())
        .collect();
    match versions.as_slice() {
        [version] if *version == SUPPORTED_VERSION => {}
        [version] => diagnostics.push(format!(
            "unsupported VERSION `{version}`; expected {SUPPORTED_VERSION}"
        )),
        [] => diagnostics.push("missing VERSION".to_string()),
        many => diagnostics.push(format!("VERSION appears {} times", many.len())),
    }

    if !components.iter().any(|c| c.name.starts_with('V')) {
        diagnostics.push("no calendar components".to_string());
    }

    diagnostics
}

struct LineWriter<'a> {
    sink: &'a mut dyn Write,
    lines: usize,
}

impl<'a> LineWriter<'a> {
    fn new(sink: &'a mut dyn Write) -> Self {
        Self { sink, lines: 0 }
    }

    fn write_calendar(&mut self, store: &ComponentStore, indices: &[usize]) -> std::io::Result<()> {
        self.content_line("BEGIN:VCALENDAR")?;
        for property in store.calendar_properties() {
            self.content_line(&format_property(property))?;
        }
        for &index in indices {
            let Some(component) = store.component(index) else {
                panic!(
                    "record index {index} out of range for store of {} records",
                    store.len()
                );
            };
            self.component(component)?;
        }
        self.content_line("END:VCALENDAR")?;
        self.sink.flush()
    }

    fn component(&mut self, component: &CalendarComponent) -> std::io::Result<()> {
        self.content_line(&format!("BEGIN:{}", component.name))?;
        for property in &component.properties {
            self.content_line(&format_property(property))?;
        }
        for child in &component.components {
            self.component(child)?;
        }
        self.content_line(&format!("END:{}", component.name))
    }

    /// Writes one logical line, folding it into physical lines of at most
    /// 75 octets (continuations start with a single space).
    fn content_line(&mut self, line: &str) -> std::io::Result<()> {
        let mut rest = line;
        let mut limit = FOLD_OCTETS;
        let mut continuation = false;
        loop {
            let (head, tail) = rest.split_at(fold_point(rest, limit));
            if continuation {
                self.sink.write_all(b" ")?;
            }
            self.sink.write_all(head.as_bytes())?;
            self.sink.write_all(b"\r\n")?;
            self.lines += 1;

            if tail.is_empty() {
                return Ok(());
            }
            rest = tail;
            continuation = true;
            limit = FOLD_OCTETS - 1;
        }
    }
}

fn fold_point(text: &str, limit: usize) -> usize {
    if text.len() <= limit {
        return text.len();
    }
    let mut cut = limit;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    cut
}

fn format_property(property: &Property) -> String {
    let mut line = property.name.clone();
    for param in &property.params {
        line.push(';');
        line.push_str(&param.key);
        if let Some(value) = param.value.as_deref() {
            line.push('=');
            line.push_str(&quote_param(value));
        }
    }
    line.push(':');
    line.push_str(&property.value);
    line
}

fn quote_param(value: &str) -> Cow<'_, str> {
    let already_quoted = value.len() >= 2 && value.starts_with('"') && value.ends_with('"');
    if !already_quoted && value.contains([':', ';', ',']) {
        Cow::Owned(format!("\"{value}\""))
    } else {
        Cow::Borrowed(value)
    }
}
