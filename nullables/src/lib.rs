//! Nullable infrastructure for deterministic testing.
//!
//! Dispute diagnostics are abstracted behind the `DisputeSink` trait. This
//! crate provides test-friendly sinks that:
//! - Never write to a terminal, file or log pipeline
//! - Can be inspected programmatically
//!
//! Usage: hand one of these to a `DisputedTx` instead of `TracingSink`.

pub mod sink;

pub use sink::{NullSink, RecordedEvent, RecordingSink};
