// sptl: estimator event log
//
// One flat text event per `sequential_run`/`measured_run` report, tagged
// with a monotonic push-time timestamp and flushed, sorted, to the path
// named by `SPTL_LOG_TEXT` at shutdown. Mirrors the original source's
// `logging::buffer` template, specialized to "always enabled" since this
// crate has no build-time feature gate for it.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Instant;

use parking_lot::Mutex;

use crate::perworker::PerWorker;

#[derive(Debug, Clone, Copy)]
pub enum EventTag {
    SequentialRun,
    MeasuredRun,
    DroppedReport,
}

#[derive(Debug, Clone)]
pub struct Event {
    pub tag: EventTag,
    pub timestamp_us: f64,
    pub name: String,
    pub size: f64,
    pub time: f64,
}

/// Per-worker append buffer plus the basetime every timestamp is relative to.
pub struct Buffer {
    basetime: Instant,
    slots: PerWorker<Mutex<Vec<Event>>>,
}

impl Buffer {
    fn new() -> Self {
        Self {
            basetime: Instant::now(),
            slots: PerWorker::new(),
        }
    }

    fn push(&self, event_without_timestamp: impl FnOnce(f64) -> Event) {
        let timestamp_us = self.basetime.elapsed().as_secs_f64() * 1_000_000.0;
        let event = event_without_timestamp(timestamp_us);
        self.slots.mine().lock().push(event);
    }

    pub fn push_sequential_run(&self, name: &str, size: f64, time: f64) {
        self.push(|timestamp_us| Event {
            tag: EventTag::SequentialRun,
            timestamp_us,
            name: name.to_string(),
            size,
            time,
        });
    }

    pub fn push_measured_run(&self, name: &str, size: f64, time: f64) {
        self.push(|timestamp_us| Event {
            tag: EventTag::MeasuredRun,
            timestamp_us,
            name: name.to_string(),
            size,
            time,
        });
    }

    /// Not part of the flushed text format (dropped reports are diagnostic
    /// only); routed to `tracing` instead of the event buffer.
    pub fn push_dropped_report(&self, name: &str, complexity: u64, elapsed_us: f64) {
        tracing::debug!(name, complexity, elapsed_us, "dropped report: exceeds kappa");
    }

    /// Collect every worker's buffer, stable-sorted by push-time timestamp.
    pub fn drain_sorted(&self) -> Vec<Event> {
        let mut out = Vec::new();
        self.slots.for_each(|slot| {
            out.extend(slot.lock().drain(..));
        });
        out.sort_by(|a, b| a.timestamp_us.partial_cmp(&b.timestamp_us).unwrap());
        out
    }

    /// Write the sorted buffer to `path` in the tab-separated text format of
    /// A no-op if `path` is `None` (mirrors `sptl_log_text` unset).
    pub fn output_text(&self, path: Option<&Path>) -> std::io::Result<()> {
        let Some(path) = path else {
            return Ok(());
        };
        let events = self.drain_sorted();
        let mut writer = BufWriter::new(File::create(path)?);
        for event in &events {
            let tag = match event.tag {
                EventTag::SequentialRun => "sequential_run",
                EventTag::MeasuredRun => "measured_run",
                EventTag::DroppedReport => continue, // not part of the persisted format
            };
            writeln!(writer, "{}\t{}\t{}\t{}", tag, event.name, event.size, event.time)?;
        }
        Ok(())
    }
}

static BUFFER: OnceLock<Buffer> = OnceLock::new();

/// The process-wide event buffer, lazily initialized on first use so unit
/// tests that never call `launch` still have somewhere to push to.
pub fn buffer() -> &'static Buffer {
    BUFFER.get_or_init(Buffer::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_sorted_by_push_timestamp() {
        let buffer = Buffer::new();
        buffer.push_sequential_run("b", 2.0, 2.0);
        buffer.push_sequential_run("a", 1.0, 1.0);
        let events = buffer.drain_sorted();
        assert_eq!(events.len(), 2);
        assert!(events[0].timestamp_us <= events[1].timestamp_us);
    }

    #[test]
    fn text_format_is_tab_separated() {
        let buffer = Buffer::new();
        buffer.push_measured_run("site", 10.0, 123.0);
        let dir = std::env::temp_dir().join(format!("sptl_log_test_{}", std::process::id()));
        buffer.output_text(Some(&dir)).unwrap();
        let contents = std::fs::read_to_string(&dir).unwrap();
        assert!(contents.starts_with("measured_run\tsite\t10\t123"));
        let _ = std::fs::remove_file(&dir);
    }
}
