//! Diagnostics sink, where a dispute reports what it is doing.
//!
//! The dispute tracker never logs directly. Every vote, vote change and
//! position decision is described by a [`DisputeEvent`] and handed to an
//! injected [`DisputeSink`]. Production code uses [`TracingSink`]; tests
//! can capture events in memory instead.

use std::fmt;
use std::sync::Arc;

use crate::snapshot::DisputeSnapshot;

/// Severity of a dispute event. Sinks may filter each level independently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DisputeLevel {
    /// Per-vote chatter and tally dumps.
    Debug,
    /// Round-level decisions.
    Info,
}

/// Something worth reporting about a disputed transaction.
///
/// Identities are borrowed as `&dyn Display` so that sinks do not need to
/// know the concrete transaction or node id types.
#[derive(Clone, Copy)]
pub enum DisputeEvent<'a> {
    /// A peer voted on the transaction for the first time.
    PeerVoted {
        tx: &'a dyn fmt::Display,
        peer: &'a dyn fmt::Display,
        vote_yes: bool,
    },
    /// A peer reversed its earlier vote.
    PeerChangedVote {
        tx: &'a dyn fmt::Display,
        peer: &'a dyn fmt::Display,
        vote_yes: bool,
    },
    /// A peer's vote was withdrawn. `vote_yes` is the vote that was removed.
    PeerVoteRemoved {
        tx: &'a dyn fmt::Display,
        peer: &'a dyn fmt::Display,
        vote_yes: bool,
    },
    /// A position update kept our vote as it was.
    ///
    /// `weight` is `None` when we were not proposing.
    PositionUnchanged {
        tx: &'a dyn fmt::Display,
        our_vote: bool,
        weight: Option<u32>,
        percent_time: u32,
    },
    /// A position update flipped our vote.
    PositionChanged {
        tx: &'a dyn fmt::Display,
        our_vote: bool,
        weight: Option<u32>,
        percent_time: u32,
    },
    /// Full tally after a position update.
    Snapshot {
        tx: &'a dyn fmt::Display,
        snapshot: &'a DisputeSnapshot,
    },
}

impl DisputeEvent<'_> {
    pub fn level(&self) -> DisputeLevel {
        match self {
            DisputeEvent::PositionUnchanged { .. } => DisputeLevel::Info,
            _ => DisputeLevel::Debug,
        }
    }
}

fn yes_no(vote: bool) -> &'static str {
    if vote {
        "YES"
    } else {
        "NO"
    }
}

/// Weight as shown in log lines: `-1` when not applicable.
struct DisplayWeight(Option<u32>);

impl fmt::Display for DisplayWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(w) => write!(f, "{w}"),
            None => f.write_str("-1"),
        }
    }
}

impl fmt::Display for DisputeEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DisputeEvent::PeerVoted { tx, peer, vote_yes } => {
                write!(f, "Peer {peer} votes {} on {tx}", yes_no(vote_yes))
            }
            DisputeEvent::PeerChangedVote { tx, peer, vote_yes } => {
                write!(f, "Peer {peer} now votes {} on {tx}", yes_no(vote_yes))
            }
            DisputeEvent::PeerVoteRemoved { tx, peer, vote_yes } => {
                write!(f, "Peer {peer} withdraws {} vote on {tx}", yes_no(vote_yes))
            }
            DisputeEvent::PositionUnchanged {
                our_vote,
                weight,
                percent_time,
                ..
            } => write!(
                f,
                "No change ({}) : weight {}, percent {percent_time}",
                yes_no(our_vote),
                DisplayWeight(weight)
            ),
            DisputeEvent::PositionChanged { tx, our_vote, .. } => {
                write!(f, "We now vote {} on {tx}", yes_no(our_vote))
            }
            DisputeEvent::Snapshot { snapshot, .. } => write!(f, "{snapshot}"),
        }
    }
}

impl fmt::Debug for DisputeEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DisputeEvent({:?}: {self})", self.level())
    }
}

/// Receiver of dispute diagnostics.
///
/// Emission is best-effort: a sink must not panic and has no way to report
/// failure back to the dispute.
pub trait DisputeSink {
    /// Whether events at `level` would be kept. Used to skip building
    /// snapshots nobody will read.
    fn enabled(&self, _level: DisputeLevel) -> bool {
        true
    }

    fn emit(&self, event: &DisputeEvent<'_>);
}

impl<S: DisputeSink + ?Sized> DisputeSink for &S {
    fn enabled(&self, level: DisputeLevel) -> bool {
        (**self).enabled(level)
    }

    fn emit(&self, event: &DisputeEvent<'_>) {
        (**self).emit(event)
    }
}

impl<S: DisputeSink + ?Sized> DisputeSink for Arc<S> {
    fn enabled(&self, level: DisputeLevel) -> bool {
        (**self).enabled(level)
    }

    fn emit(&self, event: &DisputeEvent<'_>) {
        (**self).emit(event)
    }
}

/// Log target used by [`TracingSink`].
pub const DISPUTE_TARGET: &str = "concord::dispute";

/// Forwards dispute events to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl DisputeSink for TracingSink {
    fn enabled(&self, level: DisputeLevel) -> bool {
        match level {
            DisputeLevel::Debug => tracing::enabled!(target: DISPUTE_TARGET, tracing::Level::DEBUG),
            DisputeLevel::Info => tracing::enabled!(target: DISPUTE_TARGET, tracing::Level::INFO),
        }
    }

    fn emit(&self, event: &DisputeEvent<'_>) {
        match *event {
            DisputeEvent::PeerVoted { tx, peer, vote_yes }
            | DisputeEvent::PeerChangedVote { tx, peer, vote_yes }
            | DisputeEvent::PeerVoteRemoved { tx, peer, vote_yes } => {
                tracing::debug!(
                    target: DISPUTE_TARGET,
                    tx = %tx,
                    peer = %peer,
                    vote = yes_no(vote_yes),
                    "{event}"
                );
            }
            DisputeEvent::PositionUnchanged {
                tx,
                our_vote,
                weight,
                percent_time,
            } => {
                tracing::info!(
                    target: DISPUTE_TARGET,
                    tx = %tx,
                    our_vote = yes_no(our_vote),
                    weight = %DisplayWeight(weight),
                    percent_time,
                    "{event}"
                );
            }
            DisputeEvent::PositionChanged {
                tx,
                our_vote,
                weight,
                percent_time,
            } => {
                tracing::debug!(
                    target: DISPUTE_TARGET,
                    tx = %tx,
                    our_vote = yes_no(our_vote),
                    weight = %DisplayWeight(weight),
                    percent_time,
                    "{event}"
                );
            }
            DisputeEvent::Snapshot { tx, snapshot } => {
                tracing::debug!(target: DISPUTE_TARGET, tx = %tx, "{snapshot}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_vote_lines() {
        let tx = "T1";
        let peer = "P1";
        let voted = DisputeEvent::PeerVoted { tx: &tx, peer: &peer, vote_yes: true };
        assert_eq!(voted.to_string(), "Peer P1 votes YES on T1");

        let changed = DisputeEvent::PeerChangedVote { tx: &tx, peer: &peer, vote_yes: false };
        assert_eq!(changed.to_string(), "Peer P1 now votes NO on T1");
    }

    #[test]
    fn non_proposing_weight_renders_as_minus_one() {
        let tx = "T1";
        let event = DisputeEvent::PositionUnchanged {
            tx: &tx,
            our_vote: false,
            weight: None,
            percent_time: 30,
        };
        assert_eq!(event.to_string(), "No change (NO) : weight -1, percent 30");
    }

    #[test]
    fn levels() {
        let tx = "T1";
        let unchanged = DisputeEvent::PositionUnchanged {
            tx: &tx,
            our_vote: true,
            weight: Some(70),
            percent_time: 10,
        };
        let changed = DisputeEvent::PositionChanged {
            tx: &tx,
            our_vote: true,
            weight: Some(70),
            percent_time: 10,
        };
        assert_eq!(unchanged.level(), DisputeLevel::Info);
        assert_eq!(changed.level(), DisputeLevel::Debug);
        assert!(DisputeLevel::Debug < DisputeLevel::Info);
    }

    #[test]
    fn tracing_sink_emits_without_subscriber() {
        let tx = "T1";
        let peer = "P1";
        let snapshot = DisputeSnapshot {
            yays: 1,
            nays: 0,
            our_vote: false,
            votes: None,
        };
        let sink = TracingSink;
        sink.emit(&DisputeEvent::PeerVoted { tx: &tx, peer: &peer, vote_yes: true });
        sink.emit(&DisputeEvent::Snapshot { tx: &tx, snapshot: &snapshot });
    }
}
