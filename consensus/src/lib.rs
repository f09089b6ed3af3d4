//! Consensus — per-transaction dispute resolution.
//!
//! When peers disagree about whether a transaction belongs in the next
//! ledger, the consensus engine opens a dispute for it. Each round the
//! dispute tallies peer votes and applies the avalanche rule:
//! - A proposing node weighs its own vote in at full strength.
//! - The yes-percentage needed to include the transaction rises as the
//!   round ages, so stalled disputes converge on exclusion.
//! - A non-proposing node simply follows the majority.
//!
//! ## Module overview
//!
//! - [`disputed_tx`] — Vote tally and position update for one transaction.
//! - [`diagnostics`] — Injected sink for dispute events; `tracing` by default.
//! - [`snapshot`] — Serializable view of a dispute's tally.

pub mod diagnostics;
pub mod disputed_tx;
pub mod snapshot;

pub use diagnostics::{DisputeEvent, DisputeLevel, DisputeSink, TracingSink, DISPUTE_TARGET};
pub use disputed_tx::DisputedTx;
pub use snapshot::DisputeSnapshot;
