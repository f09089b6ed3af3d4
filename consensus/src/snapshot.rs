//! Point-in-time view of a dispute's tally, for observability tooling.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Read-only copy of a dispute's vote tally.
///
/// Serializes to `{"yays", "nays", "our_vote", "votes"}`; `votes` is left
/// out entirely when no peer has voted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeSnapshot {
    pub yays: usize,
    pub nays: usize,
    pub our_vote: bool,
    /// Per-peer votes keyed by the peer's display form.
    #[serde(default, skip_serializing_if = "no_votes")]
    pub votes: Option<BTreeMap<String, bool>>,
}

fn no_votes(votes: &Option<BTreeMap<String, bool>>) -> bool {
    votes.as_ref().map_or(true, BTreeMap::is_empty)
}

impl DisputeSnapshot {
    pub fn to_json(&self) -> Value {
        let mut ret = json!({
            "yays": self.yays,
            "nays": self.nays,
            "our_vote": self.our_vote,
        });
        if let Some(votes) = self.votes.as_ref().filter(|v| !v.is_empty()) {
            ret["votes"] = json!(votes);
        }
        ret
    }
}

impl fmt::Display for DisputeSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn votes_omitted_when_absent() {
        let snap = DisputeSnapshot {
            yays: 0,
            nays: 0,
            our_vote: true,
            votes: None,
        };
        let json = snap.to_json();
        assert_eq!(json, json!({"yays": 0, "nays": 0, "our_vote": true}));
        assert!(json.get("votes").is_none());
    }

    #[test]
    fn empty_votes_map_is_omitted() {
        let snap = DisputeSnapshot {
            yays: 0,
            nays: 0,
            our_vote: false,
            votes: Some(BTreeMap::new()),
        };
        assert_eq!(snap.to_json(), json!({"yays": 0, "nays": 0, "our_vote": false}));
        let serialized = serde_json::to_value(&snap).unwrap();
        assert!(serialized.get("votes").is_none());
        assert_eq!(snap.to_string(), r#"{"nays":0,"our_vote":false,"yays":0}"#);
    }

    #[test]
    fn votes_keyed_by_peer_string() {
        let mut votes = BTreeMap::new();
        votes.insert("alice".to_string(), true);
        votes.insert("bob".to_string(), false);
        let snap = DisputeSnapshot {
            yays: 1,
            nays: 1,
            our_vote: false,
            votes: Some(votes),
        };
        assert_eq!(
            snap.to_json(),
            json!({
                "yays": 1,
                "nays": 1,
                "our_vote": false,
                "votes": {"alice": true, "bob": false},
            })
        );
    }

    #[test]
    fn serde_matches_to_json() {
        let snap = DisputeSnapshot {
            yays: 2,
            nays: 0,
            our_vote: true,
            votes: None,
        };
        assert_eq!(serde_json::to_value(&snap).unwrap(), snap.to_json());
        let parsed: DisputeSnapshot = serde_json::from_str(&snap.to_string()).unwrap();
        assert_eq!(parsed, snap);
    }
}
