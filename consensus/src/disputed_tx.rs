//! Disputed transaction: tracks peer votes on one contested transaction and
//! decides, once per round, whether our own vote should flip.
//!
//! A `DisputedTx` exists only while participants disagree about including a
//! transaction; undisputed transactions never get one. The outer consensus
//! engine owns every instance, feeds it peer positions as proposals arrive,
//! and calls [`DisputedTx::update_position`] once the round is far enough
//! along.
//!
//! Position updates follow the avalanche schedule in [`AvalancheParams`]: a
//! proposing node counts itself with full weight and needs its yes-percentage
//! to beat a threshold that rises as the round ages, so disputes that do not
//! settle quickly resolve toward excluding the transaction.

use concord_types::{AvalancheParams, Transaction};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;

use crate::diagnostics::{DisputeEvent, DisputeLevel, DisputeSink, TracingSink};
use crate::snapshot::DisputeSnapshot;

/// A transaction on which consensus participants currently disagree.
///
/// `N` is the peer identity type. Tally state is private: only
/// [`register_vote`](Self::register_vote) and
/// [`remove_vote`](Self::remove_vote) can change it, which keeps `yays` and
/// `nays` equal to the number of yes and no entries in the vote map.
pub struct DisputedTx<Tx, N, S = TracingSink>
where
    Tx: Transaction,
{
    id: Tx::Id,
    yays: usize,
    nays: usize,
    our_vote: bool,
    transaction: Tx,
    votes: HashMap<N, bool>,
    params: AvalancheParams,
    sink: S,
}

impl<Tx, N, S> DisputedTx<Tx, N, S>
where
    Tx: Transaction,
    N: Eq + Hash + fmt::Display,
    S: DisputeSink,
{
    /// Start tracking a dispute with the network's default avalanche
    /// parameters. `our_vote` is our stance before any disagreement was seen.
    pub fn new(tx: Tx, our_vote: bool, sink: S) -> Self {
        Self::with_params(tx, our_vote, AvalancheParams::default(), sink)
    }

    /// Start tracking a dispute with explicit avalanche parameters.
    ///
    /// Callers are expected to have checked `params` with
    /// [`AvalancheParams::validate`] (loading from TOML does this); debug
    /// builds assert it.
    pub fn with_params(tx: Tx, our_vote: bool, params: AvalancheParams, sink: S) -> Self {
        debug_assert!(
            params.validate().is_ok(),
            "invalid avalanche parameters: {params:?}"
        );
        Self {
            id: tx.id(),
            yays: 0,
            nays: 0,
            our_vote,
            transaction: tx,
            votes: HashMap::new(),
            params,
            sink,
        }
    }

    pub fn id(&self) -> &Tx::Id {
        &self.id
    }

    pub fn our_vote(&self) -> bool {
        self.our_vote
    }

    pub fn transaction(&self) -> &Tx {
        &self.transaction
    }

    /// Number of peers currently voting yes.
    pub fn yays(&self) -> usize {
        self.yays
    }

    /// Number of peers currently voting no.
    pub fn nays(&self) -> usize {
        self.nays
    }

    /// Number of peers with a recorded vote.
    pub fn voter_count(&self) -> usize {
        self.votes.len()
    }

    /// The recorded vote of `peer`, if any.
    pub fn vote_of(&self, peer: &N) -> Option<bool> {
        self.votes.get(peer).copied()
    }

    pub fn params(&self) -> &AvalancheParams {
        &self.params
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Record `peer`'s current position on this transaction.
    ///
    /// A repeat of the peer's recorded vote is a no-op; a different vote
    /// replaces it, moving one count from one side of the tally to the other.
    pub fn register_vote(&mut self, peer: N, vote_yes: bool) {
        match self.votes.entry(peer) {
            Entry::Vacant(entry) => {
                self.sink.emit(&DisputeEvent::PeerVoted {
                    tx: &self.id,
                    peer: entry.key(),
                    vote_yes,
                });
                if vote_yes {
                    self.yays += 1;
                } else {
                    self.nays += 1;
                }
                entry.insert(vote_yes);
            }
            Entry::Occupied(mut entry) => {
                if *entry.get() == vote_yes {
                    return;
                }
                self.sink.emit(&DisputeEvent::PeerChangedVote {
                    tx: &self.id,
                    peer: entry.key(),
                    vote_yes,
                });
                if vote_yes {
                    self.nays -= 1;
                    self.yays += 1;
                } else {
                    self.yays -= 1;
                    self.nays += 1;
                }
                entry.insert(vote_yes);
            }
        }
        self.debug_check_tally();
    }

    /// Withdraw `peer`'s vote. Unknown peers are ignored.
    pub fn remove_vote(&mut self, peer: &N) {
        let Some((peer, vote_yes)) = self.votes.remove_entry(peer) else {
            return;
        };
        if vote_yes {
            self.yays -= 1;
        } else {
            self.nays -= 1;
        }
        self.sink.emit(&DisputeEvent::PeerVoteRemoved {
            tx: &self.id,
            peer: &peer,
            vote_yes,
        });
        self.debug_check_tally();
    }

    /// Decide whether our vote should change, given how far through the
    /// round we are (`percent_time_elapsed`, as a percentage of the expected
    /// round duration) and whether we are proposing this round.
    ///
    /// Returns `true` if our vote flipped.
    pub fn update_position(&mut self, percent_time_elapsed: u32, is_proposing: bool) -> bool {
        // Nobody disagrees with us.
        if self.our_vote && self.nays == 0 {
            return false;
        }
        if !self.our_vote && self.yays == 0 {
            return false;
        }

        let (weight, new_position) = if is_proposing {
            // Percentage of nodes voting yes, counting ourselves at full weight.
            let ours = if self.our_vote { 100 } else { 0 };
            let weight = (self.yays * 100 + ours) / (self.nays + self.yays + 1);
            let weight = u32::try_from(weight).unwrap_or(u32::MAX);
            let threshold = self.params.threshold_for(percent_time_elapsed);
            (Some(weight), weight > threshold)
        } else {
            // Not proposing: recognise the majority, never outweigh proposers.
            (None, self.yays > self.nays)
        };

        if new_position == self.our_vote {
            self.sink.emit(&DisputeEvent::PositionUnchanged {
                tx: &self.id,
                our_vote: self.our_vote,
                weight,
                percent_time: percent_time_elapsed,
            });
            self.emit_snapshot();
            return false;
        }

        self.our_vote = new_position;
        self.sink.emit(&DisputeEvent::PositionChanged {
            tx: &self.id,
            our_vote: self.our_vote,
            weight,
            percent_time: percent_time_elapsed,
        });
        self.emit_snapshot();
        true
    }

    /// Current tally as a diagnostic snapshot.
    pub fn snapshot(&self) -> DisputeSnapshot {
        let votes = if self.votes.is_empty() {
            None
        } else {
            Some(
                self.votes
                    .iter()
                    .map(|(peer, vote)| (peer.to_string(), *vote))
                    .collect::<BTreeMap<_, _>>(),
            )
        };
        DisputeSnapshot {
            yays: self.yays,
            nays: self.nays,
            our_vote: self.our_vote,
            votes,
        }
    }

    fn emit_snapshot(&self) {
        if !self.sink.enabled(DisputeLevel::Debug) {
            return;
        }
        let snapshot = self.snapshot();
        self.sink.emit(&DisputeEvent::Snapshot {
            tx: &self.id,
            snapshot: &snapshot,
        });
    }

    fn debug_check_tally(&self) {
        debug_assert_eq!(
            self.yays,
            self.votes.values().filter(|v| **v).count(),
            "yes tally diverged from recorded votes"
        );
        debug_assert_eq!(
            self.yays + self.nays,
            self.votes.len(),
            "tally diverged from recorded votes"
        );
    }
}

impl<Tx, N, S> fmt::Debug for DisputedTx<Tx, N, S>
where
    Tx: Transaction,
    Tx::Id: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisputedTx")
            .field("id", &self.id)
            .field("yays", &self.yays)
            .field("nays", &self.nays)
            .field("our_vote", &self.our_vote)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_types::{NodeId, RawTransaction, TxId};
    use std::cell::RefCell;

    /// Captures rendered events, optionally ignoring debug-level ones.
    #[derive(Default)]
    struct Capture {
        debug_enabled: bool,
        lines: RefCell<Vec<(DisputeLevel, String)>>,
    }

    impl Capture {
        fn verbose() -> Self {
            Self {
                debug_enabled: true,
                ..Self::default()
            }
        }

        fn lines(&self) -> Vec<(DisputeLevel, String)> {
            self.lines.borrow().clone()
        }
    }

    impl DisputeSink for Capture {
        fn enabled(&self, level: DisputeLevel) -> bool {
            level == DisputeLevel::Info || self.debug_enabled
        }

        fn emit(&self, event: &DisputeEvent<'_>) {
            if self.enabled(event.level()) {
                self.lines
                    .borrow_mut()
                    .push((event.level(), event.to_string()));
            }
        }
    }

    fn make_tx(byte: u8) -> RawTransaction {
        RawTransaction::new(TxId::new([byte; 32]), vec![byte])
    }

    fn make_peer(byte: u8) -> NodeId {
        NodeId::new([byte; 32])
    }

    fn dispute(our_vote: bool) -> DisputedTx<RawTransaction, NodeId, Capture> {
        DisputedTx::new(make_tx(1), our_vote, Capture::verbose())
    }

    #[test]
    fn new_dispute_is_empty() {
        let d = dispute(true);
        assert_eq!(*d.id(), TxId::new([1; 32]));
        assert!(d.our_vote());
        assert_eq!(d.transaction().blob(), &[1]);
        assert_eq!(d.yays(), 0);
        assert_eq!(d.nays(), 0);
        assert_eq!(d.voter_count(), 0);
        assert_eq!(*d.params(), AvalancheParams::default());
    }

    #[test]
    fn new_votes_are_counted() {
        let mut d = dispute(false);
        d.register_vote(make_peer(1), true);
        d.register_vote(make_peer(2), false);
        d.register_vote(make_peer(3), true);

        assert_eq!(d.yays(), 2);
        assert_eq!(d.nays(), 1);
        assert_eq!(d.vote_of(&make_peer(2)), Some(false));
        assert_eq!(d.vote_of(&make_peer(9)), None);
    }

    #[test]
    fn repeated_vote_is_idempotent() {
        let mut d = dispute(false);
        d.register_vote(make_peer(1), true);
        let emitted = d.sink().lines().len();

        d.register_vote(make_peer(1), true);
        assert_eq!(d.yays(), 1);
        assert_eq!(d.nays(), 0);
        assert_eq!(d.sink().lines().len(), emitted);
    }

    #[test]
    fn changed_vote_moves_between_counts() {
        let mut d = dispute(false);
        d.register_vote(make_peer(1), true);
        d.register_vote(make_peer(1), false);
        assert_eq!(d.yays(), 0);
        assert_eq!(d.nays(), 1);

        d.register_vote(make_peer(1), true);
        assert_eq!(d.yays(), 1);
        assert_eq!(d.nays(), 0);

        let lines = d.sink().lines();
        let peer = make_peer(1);
        assert_eq!(
            lines[1],
            (
                DisputeLevel::Debug,
                format!("Peer {peer} now votes NO on {}", d.id())
            )
        );
    }

    #[test]
    fn remove_vote_restores_counts() {
        let mut d = dispute(false);
        d.register_vote(make_peer(1), true);
        d.register_vote(make_peer(2), false);

        d.remove_vote(&make_peer(1));
        assert_eq!(d.yays(), 0);
        assert_eq!(d.nays(), 1);
        assert_eq!(d.vote_of(&make_peer(1)), None);

        d.remove_vote(&make_peer(2));
        assert_eq!(d.nays(), 0);
        assert_eq!(d.voter_count(), 0);
    }

    #[test]
    fn remove_unknown_vote_is_noop() {
        let mut d = dispute(true);
        d.register_vote(make_peer(1), false);
        let emitted = d.sink().lines().len();

        d.remove_vote(&make_peer(7));
        assert_eq!(d.nays(), 1);
        assert_eq!(d.sink().lines().len(), emitted);
    }

    #[test]
    fn unopposed_yes_does_not_move() {
        let mut d = dispute(true);
        assert!(!d.update_position(0, true));
        assert!(!d.update_position(500, false));

        d.register_vote(make_peer(1), true);
        assert!(!d.update_position(250, true));
        assert!(d.our_vote());
        // Fast exit emits nothing.
        assert_eq!(d.sink().lines().len(), 1);
    }

    #[test]
    fn unopposed_no_does_not_move() {
        let mut d = dispute(false);
        d.register_vote(make_peer(1), false);
        assert!(!d.update_position(0, true));
        assert!(!d.update_position(0, false));
        assert!(!d.our_vote());
    }

    #[test]
    fn proposing_flips_to_yes_early_in_round() {
        let mut d = dispute(false);
        for p in 1..=3 {
            d.register_vote(make_peer(p), true);
        }
        d.register_vote(make_peer(4), false);

        // weight = 300 / 5 = 60 > 50
        assert!(d.update_position(10, true));
        assert!(d.our_vote());
    }

    #[test]
    fn proposing_holds_no_once_threshold_rises() {
        let mut d = dispute(false);
        for p in 1..=3 {
            d.register_vote(make_peer(p), true);
        }
        d.register_vote(make_peer(4), false);

        // weight 60 does not exceed the mid threshold of 65
        assert!(!d.update_position(60, true));
        assert!(!d.our_vote());

        let lines = d.sink().lines();
        let unchanged = lines
            .iter()
            .find(|(level, _)| *level == DisputeLevel::Info)
            .expect("unchanged position is reported at info");
        assert_eq!(unchanged.1, "No change (NO) : weight 60, percent 60");
    }

    #[test]
    fn our_yes_vote_counts_with_full_weight() {
        let mut d = dispute(true);
        d.register_vote(make_peer(1), true);
        d.register_vote(make_peer(2), false);
        d.register_vote(make_peer(3), false);

        // weight = (100 + 100) / 4 = 50, not above 50
        assert!(d.update_position(0, true));
        assert!(!d.our_vote());
    }

    #[test]
    fn stuck_round_requires_supermajority() {
        let mut d = dispute(true);
        for p in 1..=8 {
            d.register_vote(make_peer(p), true);
        }
        d.register_vote(make_peer(9), false);

        // weight = (800 + 100) / 10 = 90
        assert!(!d.update_position(199, true));
        assert!(d.update_position(200, true));
        assert!(!d.our_vote());
    }

    #[test]
    fn weight_equal_to_threshold_is_not_enough() {
        let mut d = dispute(false);
        d.register_vote(make_peer(1), true);

        // weight = 100 / 2 = 50
        assert!(!d.update_position(0, true));
        assert!(!d.our_vote());
    }

    #[test]
    fn non_proposing_follows_plain_majority() {
        let mut d = dispute(false);
        d.register_vote(make_peer(1), true);
        d.register_vote(make_peer(2), false);
        assert!(!d.update_position(0, false));

        d.register_vote(make_peer(3), true);
        assert!(d.update_position(0, false));
        assert!(d.our_vote());

        let unchanged = d
            .sink()
            .lines()
            .into_iter()
            .find(|(level, _)| *level == DisputeLevel::Info)
            .unwrap();
        assert_eq!(unchanged.1, "No change (NO) : weight -1, percent 0");
    }

    #[test]
    fn overridden_thresholds_are_used() {
        let params = AvalancheParams {
            init_consensus_pct: 80,
            mid_consensus_pct: 50,
            ..AvalancheParams::default()
        };
        let mut d: DisputedTx<RawTransaction, NodeId, Capture> =
            DisputedTx::with_params(make_tx(2), false, params, Capture::verbose());
        for p in 1..=3 {
            d.register_vote(make_peer(p), true);
        }
        d.register_vote(make_peer(4), false);

        assert!(!d.update_position(10, true));
        assert!(!d.our_vote());
        assert!(d.update_position(60, true));
        assert!(d.our_vote());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "invalid avalanche parameters")]
    fn unvalidated_params_rejected_in_debug() {
        let params = AvalancheParams {
            late_consensus_time: 20,
            ..AvalancheParams::default()
        };
        let _d: DisputedTx<RawTransaction, NodeId, Capture> =
            DisputedTx::with_params(make_tx(5), false, params, Capture::verbose());
    }

    #[test]
    fn heavy_tally_weight_stays_in_range() {
        let mut d = dispute(false);
        for p in 0..=200u8 {
            d.register_vote(make_peer(p), true);
        }
        d.register_vote(NodeId::new([0xff; 32]), false);
        d.sink().lines.borrow_mut().clear();

        // weight = 20100 / 203 = 99
        assert!(d.update_position(300, true));
        assert!(d.our_vote());
        assert!(d
            .sink()
            .lines()
            .iter()
            .all(|(_, line)| !line.contains("No change")));
    }

    #[test]
    fn flip_is_reported_with_snapshot() {
        let mut d = dispute(false);
        d.register_vote(make_peer(1), true);
        assert!(d.update_position(0, false));

        let lines = d.sink().lines();
        let n = lines.len();
        assert_eq!(lines[n - 2].1, format!("We now vote YES on {}", d.id()));
        assert_eq!(lines[n - 1].1, d.snapshot().to_string());
    }

    #[test]
    fn snapshot_skipped_when_debug_disabled() {
        let mut d: DisputedTx<RawTransaction, NodeId, Capture> =
            DisputedTx::new(make_tx(3), false, Capture::default());
        d.register_vote(make_peer(1), true);
        d.register_vote(make_peer(2), false);
        d.register_vote(make_peer(3), false);
        assert!(!d.update_position(0, true));

        let lines = d.sink().lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, DisputeLevel::Info);
    }

    #[test]
    fn snapshot_lists_votes_by_peer() {
        let mut d = dispute(true);
        assert_eq!(d.snapshot().votes, None);

        d.register_vote(make_peer(1), true);
        d.register_vote(make_peer(2), false);
        let snap = d.snapshot();
        assert_eq!(snap.yays, 1);
        assert_eq!(snap.nays, 1);
        assert!(snap.our_vote);
        let votes = snap.votes.expect("votes present");
        assert_eq!(votes.get(&make_peer(1).to_string()), Some(&true));
        assert_eq!(votes.get(&make_peer(2).to_string()), Some(&false));
    }

    #[test]
    fn works_with_string_peers_and_default_sink() {
        let mut d: DisputedTx<RawTransaction, String> =
            DisputedTx::new(make_tx(4), true, TracingSink);
        d.register_vote("alice".to_string(), false);
        d.register_vote("bob".to_string(), false);
        assert!(d.update_position(0, true));
        assert!(!d.our_vote());
    }

    #[test]
    fn dispute_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<DisputedTx<RawTransaction, NodeId>>();
    }
}
