//! Transaction capability used by the dispute tracker.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

use crate::hash::TxId;

/// A transaction payload that carries its own identity.
///
/// This is all consensus needs to know about a transaction: content and
/// validity rules belong to the ledger.
pub trait Transaction {
    /// Unique, comparable identifier of the transaction.
    type Id: Clone + Eq + Hash + fmt::Display;

    fn id(&self) -> Self::Id;
}

/// An opaque serialized transaction together with its identifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    id: TxId,
    blob: Vec<u8>,
}

impl RawTransaction {
    pub fn new(id: TxId, blob: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            blob: blob.into(),
        }
    }

    /// The serialized transaction bytes.
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }
}

impl Transaction for RawTransaction {
    type Id = TxId;

    fn id(&self) -> TxId {
        self.id
    }
}
