//! Component store: one generation of parsed calendar components.
//!
//! # Responsibility
//! - Own the component tree and record projections of one loaded calendar.
//! - Tag every store with a process-unique generation number.
//!
//! # Invariants
//! - `records.len() == components.len()`; record `i` projects component `i`.
//! - The codec handle is never exposed as a record field.
//! - A store is released at most once (`release` consumes it).

use crate::codec::CalendarCodec;
use crate::model::component::{CalendarComponent, ComponentRecord, Property, RECORD_FIELD_COUNT};
use std::borrow::Cow;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Opaque codec-owned handle identifying one parsed calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreHandle(Uuid);

impl StoreHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StoreHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for StoreHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One slot of the flat `8*N + 1` field view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlatSlot<'a> {
    /// Slot 0: the codec handle.
    Handle(StoreHandle),
    /// Slots `1..`: record fields, eight per record.
    Field(Cow<'a, str>),
}

/// Parsed calendar held in memory.
#[derive(Debug)]
pub struct ComponentStore {
    handle: StoreHandle,
    generation: u64,
    source: String,
    calendar_properties: Vec<Property>,
    components: Vec<CalendarComponent>,
    records: Vec<ComponentRecord>,
}

impl ComponentStore {
    /// Builds a store from codec output and assigns a fresh generation.
    pub fn new(
        handle: StoreHandle,
        source: impl Into<String>,
        calendar_properties: Vec<Property>,
        components: Vec<CalendarComponent>,
    ) -> Self {
        let records = components.iter().map(ComponentRecord::project).collect();
        Self {
            handle,
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            source: source.into(),
            calendar_properties,
            components,
            records,
        }
    }

    pub fn handle(&self) -> StoreHandle {
        self.handle
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Display name of the file or stream this store was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ComponentRecord] {
        &self.records
    }

    pub fn record(&self, index: usize) -> Option<&ComponentRecord> {
        self.records.get(index)
    }

    pub fn component(&self, index: usize) -> Option<&CalendarComponent> {
        self.components.get(index)
    }

    /// `VCALENDAR`-level properties (`VERSION`, `PRODID`, ...).
    pub fn calendar_properties(&self) -> &[Property] {
        &self.calendar_properties
    }

    /// Length of the flat field view: `8*N + 1`.
    pub fn flat_len(&self) -> usize {
        RECORD_FIELD_COUNT * self.len() + 1
    }

    /// Returns one slot of the flat field view.
    pub fn flat_slot(&self, slot: usize) -> Option<FlatSlot<'_>> {
        if slot == 0 {
            return Some(FlatSlot::Handle(self.handle));
        }
        let record = self.records.get((slot - 1) / RECORD_FIELD_COUNT)?;
        let field_slot = (slot - 1) % RECORD_FIELD_COUNT;
        let value = match field_slot {
            3 => Cow::Borrowed(record.summary.as_str()),
            4 => Cow::Borrowed(record.organizer_name.as_str()),
            5 => Cow::Borrowed(record.organizer_contact.as_str()),
            6 => Cow::Borrowed(record.date_or_priority.as_str()),
            7 => Cow::Borrowed(record.location.as_str()),
            _ => Cow::Owned(record.field(field_slot)?),
        };
        Some(FlatSlot::Field(value))
    }

    /// Hands the codec handle back to its owner; the store is gone afterwards.
    pub fn release<C: CalendarCodec + ?Sized>(self, codec: &C) {
        codec.release(self.handle);
    }
}
