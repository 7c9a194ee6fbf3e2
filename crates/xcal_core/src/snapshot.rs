//! Working-set snapshots and line-count deltas.
//!
//! # Responsibility
//! - Serialize the working set through the codec into a named file.
//! - Report each write as a delta against the previously reported line count.
//!
//! # Invariants
//! - After a successful write the counter equals that write's line count.
//! - A failed write leaves both the counter and the target file untouched by
//!   this writer (the buffer is only flushed to disk after serialization).

use crate::codec::{CalendarCodec, CodecError, CodecResult};
use crate::model::store::ComponentStore;
use crate::model::working_set::WorkingSet;
use log::{debug, error};
use std::path::Path;
use std::time::Instant;

/// Monotonic accumulator of reported line counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineCounter {
    previous: i64,
}

impl LineCounter {
    /// Returns `line_count - previous` and moves the accumulator to `line_count`.
    pub fn advance(&mut self, line_count: usize) -> i64 {
        let current = i64::try_from(line_count).unwrap_or(i64::MAX);
        let delta = current - self.previous;
        self.previous += delta;
        delta
    }

    pub fn previous(&self) -> i64 {
        self.previous
    }
}

/// In-memory serialization result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub bytes: Vec<u8>,
    pub line_count: usize,
}

impl Rendered {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Writes working-set snapshots and tracks the line counter.
#[derive(Debug, Default)]
pub struct SnapshotWriter {
    counter: LineCounter,
}

impl SnapshotWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes `ws` into `path` and returns the line-count delta.
    ///
    /// # Panics
    /// - When `ws` was not derived from `store`.
    pub fn write<C: CalendarCodec + ?Sized>(
        &mut self,
        codec: &C,
        path: &Path,
        store: &ComponentStore,
        ws: &WorkingSet,
    ) -> CodecResult<i64> {
        ws.assert_matches(store);
        let started_at = Instant::now();

        let rendered = render(codec, store, ws.members())?;
        if let Err(err) = std::fs::write(path, &rendered.bytes) {
            error!(
                "event=snapshot_write module=snapshot status=error error_code=write_failed duration_ms={}",
                started_at.elapsed().as_millis()
            );
            return Err(CodecError::Write(err));
        }

        let delta = self.counter.advance(rendered.line_count);
        debug!(
            "event=snapshot_write module=snapshot status=ok members={} lines={} delta={} duration_ms={}",
            ws.len(),
            rendered.line_count,
            delta,
            started_at.elapsed().as_millis()
        );
        Ok(delta)
    }

    pub fn previous_line_count(&self) -> i64 {
        self.counter.previous()
    }
}

/// Serializes `indices` of `store` into memory without touching any counter.
pub fn render<C: CalendarCodec + ?Sized>(
    codec: &C,
    store: &ComponentStore,
    indices: &[usize],
) -> CodecResult<Rendered> {
    let mut bytes = Vec::new();
    let line_count = codec.serialize(store, indices, &mut bytes)?;
    Ok(Rendered { bytes, line_count })
}
