//! Nullable diagnostics sinks — discard or record dispute events.

use concord_consensus::{DisputeEvent, DisputeLevel, DisputeSink};
use std::sync::Mutex;

/// A sink that drops everything and reports every level as disabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl DisputeSink for NullSink {
    fn enabled(&self, _level: DisputeLevel) -> bool {
        false
    }

    fn emit(&self, _event: &DisputeEvent<'_>) {}
}

/// One event captured by a [`RecordingSink`], rendered to its log line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedEvent {
    pub level: DisputeLevel,
    pub message: String,
}

/// A sink that keeps every event at or above `min_level` in memory.
pub struct RecordingSink {
    min_level: DisputeLevel,
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingSink {
    /// Record events of every level.
    pub fn new() -> Self {
        Self::with_min_level(DisputeLevel::Debug)
    }

    /// Record only events at `min_level` or above.
    pub fn with_min_level(min_level: DisputeLevel) -> Self {
        Self {
            min_level,
            events: Mutex::new(Vec::new()),
        }
    }

    /// Everything recorded so far, oldest first.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.lock().clone()
    }

    /// Messages of recorded events at exactly `level`.
    pub fn messages_at(&self, level: DisputeLevel) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|e| e.level == level)
            .map(|e| e.message.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RecordedEvent>> {
        // A poisoned buffer still holds usable test data.
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DisputeSink for RecordingSink {
    fn enabled(&self, level: DisputeLevel) -> bool {
        level >= self.min_level
    }

    fn emit(&self, event: &DisputeEvent<'_>) {
        let level = event.level();
        if !self.enabled(level) {
            return;
        }
        self.lock().push(RecordedEvent {
            level,
            message: event.to_string(),
        });
    }
}
